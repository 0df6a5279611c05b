//! Runtime values.
//!
//! `Struct` carries reference semantics (a shared, interior-mutable field
//! map) even though no operation in this language mutates a field after
//! construction — per spec, identity-style sharing must still be observable.
//! `Function` holds a reference-counted pointer to the function it names
//! rather than the non-owning pointer the spec describes as ideal, since
//! Rust cannot express "the module outlives every value" without unsafe
//! lifetime extension or an arena; `Rc` is the documented fallback.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::Function;
use crate::error::RuntimeError;

pub type BuiltinFn = Rc<dyn Fn(&[Value]) -> Result<Value, RuntimeError>>;

#[derive(Clone)]
pub enum Value {
    Nil,
    Int(i64),
    Double(f64),
    Bool(bool),
    String(String),
    Function(Rc<Function>),
    Builtin(BuiltinFn),
    Struct(String, Rc<RefCell<HashMap<String, Value>>>),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Double(d) => write!(f, "Double({d})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Function(func) => write!(f, "Function({})", func.name),
            Value::Builtin(_) => write!(f, "Builtin"),
            Value::Struct(name, _) => write!(f, "Struct({name})"),
        }
    }
}

impl Value {
    /// The tag name returned by the `type` builtin. The enumeration in the
    /// contract has no `"struct"` entry, so struct values fall back to
    /// `"unknown"` rather than inventing a tag the spec never names.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin",
            Value::Struct(..) => "unknown",
        }
    }

    /// `Nil -> false; Bool -> itself; Int -> i != 0; Double -> d != 0.0;
    /// String -> non-empty; functions and structs -> true`.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Double(d) => *d != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Function(_) | Value::Builtin(_) | Value::Struct(..) => true,
        }
    }

    pub fn to_double(&self) -> f64 {
        match self {
            Value::Int(i) => *i as f64,
            Value::Double(d) => *d,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }

    pub fn to_int(&self) -> i64 {
        match self {
            Value::Int(i) => *i,
            Value::Double(d) => *d as i64,
            Value::Bool(b) => i64::from(*b),
            _ => 0,
        }
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    /// Display form used by `print`/`io.print`, string concatenation, and
    /// the debugger's `name = value` dump.
    pub fn display(&self) -> String {
        match self {
            Value::Nil => "nil".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Double(d) => d.to_string(),
            Value::String(s) => s.clone(),
            Value::Function(_) => "<function>".to_string(),
            Value::Builtin(_) => "<builtin>".to_string(),
            Value::Struct(name, fields) => {
                let fields = fields.borrow();
                let mut parts: Vec<String> = fields
                    .iter()
                    .map(|(k, v)| format!("{k}: {}", v.display()))
                    .collect();
                parts.sort();
                format!("{name} {{ {} }}", parts.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_contract() {
        assert!(!Value::Nil.truthy());
        assert!(!Value::Int(0).truthy());
        assert!(Value::Int(1).truthy());
        assert!(!Value::Double(0.0).truthy());
        assert!(!Value::String(String::new()).truthy());
        assert!(Value::String("x".into()).truthy());
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Nil.display(), "nil");
        assert_eq!(Value::Bool(true).display(), "true");
        assert_eq!(Value::Int(5).display(), "5");
        assert_eq!(Value::String("hi".into()).display(), "hi");
    }

    #[test]
    fn type_tags_match_contract_enumeration() {
        assert_eq!(Value::Nil.type_tag(), "nil");
        assert_eq!(Value::Int(1).type_tag(), "int");
        assert_eq!(Value::Double(1.0).type_tag(), "double");
        assert_eq!(Value::Bool(true).type_tag(), "bool");
        assert_eq!(Value::String("".into()).type_tag(), "string");
    }
}
