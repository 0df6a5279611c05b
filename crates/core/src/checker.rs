//! Two-pass static type checker.
//!
//! Pass 1 registers every top-level function signature and struct
//! definition in the global type environment before any body is checked,
//! so forward references and mutual recursion resolve. Pass 2 checks each
//! function body in a fresh child scope. Nothing is written back onto the
//! tree; the only output is an ordered list of [`TypeError`].

use crate::ast::{self, BinaryOp, Function, Module, Node, TypeAnnotation, UnaryOp};
use crate::env::Env;
use crate::types::{assignable, numeric_promotion, Type};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeError {
    pub message: String,
}

impl TypeError {
    fn new(message: impl Into<String>) -> Self {
        TypeError {
            message: message.into(),
        }
    }
}

/// Built-ins skip argument checking entirely (variadic / any-type).
const BUILTIN_NAMES: &[&str] = &["print", "io.print", "exit", "len", "type"];

pub struct TypeChecker {
    errors: Vec<TypeError>,
    structs: Vec<(String, Type)>,
    current_return_type: Type,
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeChecker {
    pub fn new() -> Self {
        TypeChecker {
            errors: Vec::new(),
            structs: Vec::new(),
            current_return_type: Type::Void,
        }
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(TypeError::new(message));
    }

    fn resolve_annotation(&mut self, ann: &TypeAnnotation) -> Type {
        match Type::from_annotation_name(&ann.name, ann.is_array, &self.structs) {
            Some(ty) => ty,
            None => {
                self.error(format!("Unknown type name: '{}'", ann.name));
                Type::Unknown
            }
        }
    }

    /// Runs both passes. Returns `true` iff the module passes (no errors).
    pub fn check(&mut self, module: &Module) -> bool {
        let global = Env::root();
        self.register_builtins(&global);
        self.pass1(module, &global);
        self.pass2(module, &global);
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[TypeError] {
        &self.errors
    }

    fn register_builtins(&mut self, global: &Env<Type>) {
        global.define("print", Type::function(vec![], Type::Void));
        global.define("io.print", Type::function(vec![], Type::Void));
        global.define("exit", Type::function(vec![], Type::Void));
        global.define("len", Type::function(vec![], Type::Int));
        global.define("type", Type::function(vec![], Type::String));
    }

    fn pass1(&mut self, module: &Module, global: &Env<Type>) {
        for def in &module.struct_defs {
            let fields: Vec<(String, Type)> = def
                .fields
                .iter()
                .map(|(name, ann)| (name.clone(), self.resolve_annotation(ann)))
                .collect();
            self.structs.push((def.name.clone(), Type::Struct(def.name.clone(), fields)));
        }

        for func in &module.functions {
            let param_types: Vec<Type> = func
                .params
                .iter()
                .map(|p| self.resolve_annotation(&p.type_annotation))
                .collect();
            let ret_type = match &func.return_type {
                Some(ann) => self.resolve_annotation(ann),
                None => Type::Void,
            };
            global.define(func.name.clone(), Type::function(param_types, ret_type));
        }
    }

    fn pass2(&mut self, module: &Module, global: &Env<Type>) {
        for func in &module.functions {
            self.check_function(func, global);
        }
    }

    fn check_function(&mut self, func: &Function, global: &Env<Type>) {
        let scope = Env::child(global);
        for param in &func.params {
            let ty = self.resolve_annotation(&param.type_annotation);
            scope.define(param.name.clone(), ty);
        }
        let ret_type = match &func.return_type {
            Some(ann) => self.resolve_annotation(ann),
            None => Type::Void,
        };
        let saved_return = std::mem::replace(&mut self.current_return_type, ret_type);
        for stmt in &func.body {
            self.check_node(stmt, &scope);
        }
        self.current_return_type = saved_return;
    }

    fn find_struct(&self, name: &str) -> Option<&Type> {
        self.structs.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    fn check_node(&mut self, node: &Node, env: &Env<Type>) -> Type {
        match node {
            Node::Int(_) => Type::Int,
            Node::Double(_) => Type::Double,
            Node::String(_) => Type::String,
            Node::Identifier(name) => match env.get(name) {
                Some(ty) => ty,
                None => {
                    self.error(format!("Undefined variable '{name}'"));
                    Type::Unknown
                }
            },
            Node::Let(l) => self.check_let(l, env),
            Node::Assign(a) => self.check_assign(a, env),
            Node::Return(r) => self.check_return(r, env),
            Node::If(i) => self.check_if(i, env),
            Node::Block(b) => self.check_block(b, env),
            Node::BinaryOp(b) => self.check_binary_op(b, env),
            Node::UnaryOp(u) => self.check_unary_op(u, env),
            Node::FunctionCall(call) => self.check_function_call(call, env),
            Node::StructLiteral(s) => self.check_struct_literal(s, env),
            Node::FieldAccess(f) => self.check_field_access(f, env),
            Node::Import(_)
            | Node::TypeAnnotation(_)
            | Node::StructDef(_)
            | Node::Function(_)
            | Node::Closure(_) => Type::Void,
        }
    }

    fn check_let(&mut self, l: &ast::Let, env: &Env<Type>) -> Type {
        match &l.type_annotation {
            Some(ann) => {
                let expected = self.resolve_annotation(ann);
                if let Some(init) = &l.initializer {
                    let actual = self.check_node(init, env);
                    if !assignable(&actual, &expected) {
                        self.error(format!(
                            "Cannot initialise '{}' (declared {}) with a value of type {}",
                            l.var_name, expected, actual
                        ));
                    }
                }
                env.define(l.var_name.clone(), expected.clone());
                expected
            }
            None => {
                let inferred = match &l.initializer {
                    Some(init) => self.check_node(init, env),
                    None => Type::Unknown,
                };
                if inferred.is_unknown() {
                    self.error(format!(
                        "Cannot infer type of '{}': initialiser has unknown type",
                        l.var_name
                    ));
                }
                env.define(l.var_name.clone(), inferred.clone());
                inferred
            }
        }
    }

    fn check_assign(&mut self, a: &ast::Assign, env: &Env<Type>) -> Type {
        let name = match a.target.as_ref() {
            Node::Identifier(name) => name,
            _ => {
                self.error("Invalid assignment target");
                return Type::Unknown;
            }
        };
        let actual = self.check_node(&a.value, env);
        match env.get(name) {
            Some(expected) => {
                if !assignable(&actual, &expected) {
                    self.error(format!(
                        "Cannot assign {actual} to variable '{name}' of type {expected}"
                    ));
                }
                expected
            }
            None => {
                self.error(format!("Undefined variable '{name}'"));
                Type::Unknown
            }
        }
    }

    fn check_return(&mut self, r: &ast::Return, env: &Env<Type>) -> Type {
        let actual = match &r.expr {
            Some(expr) => self.check_node(expr, env),
            None => Type::Void,
        };
        if !assignable(&actual, &self.current_return_type) {
            self.error(format!(
                "Return type mismatch: expected {}, got {}",
                self.current_return_type, actual
            ));
        }
        Type::Void
    }

    fn check_if(&mut self, i: &ast::If, env: &Env<Type>) -> Type {
        let cond = self.check_node(&i.condition, env);
        if cond != Type::Bool && !cond.is_unknown() {
            self.error(format!("If condition must be bool, got {cond}"));
        }
        self.check_node(&i.then_block, env);
        if let Some(else_branch) = &i.else_branch {
            self.check_node(else_branch, env);
        }
        Type::Void
    }

    fn check_block(&mut self, b: &ast::Block, env: &Env<Type>) -> Type {
        let scope = Env::child(env);
        for stmt in &b.statements {
            self.check_node(stmt, &scope);
        }
        Type::Void
    }

    fn check_binary_op(&mut self, b: &ast::BinaryOpNode, env: &Env<Type>) -> Type {
        match b.op {
            BinaryOp::And | BinaryOp::Or => {
                let symbol = if b.op == BinaryOp::And { "&&" } else { "||" };
                let lhs = self.check_node(&b.lhs, env);
                let rhs = self.check_node(&b.rhs, env);
                if lhs != Type::Bool && !lhs.is_unknown() {
                    self.error(format!("Left operand of {symbol} must be bool, got {lhs}"));
                }
                if rhs != Type::Bool && !rhs.is_unknown() {
                    self.error(format!("Right operand of {symbol} must be bool, got {rhs}"));
                }
                Type::Bool
            }
            BinaryOp::AddAssign | BinaryOp::SubAssign => self.check_compound_assign(b, env),
            BinaryOp::Add => {
                let lhs = self.check_node(&b.lhs, env);
                let rhs = self.check_node(&b.rhs, env);
                if lhs == Type::String && rhs == Type::String {
                    Type::String
                } else if let Some(t) = numeric_promotion(&lhs, &rhs) {
                    t
                } else if lhs.is_unknown() || rhs.is_unknown() {
                    Type::Unknown
                } else {
                    self.error(format!(
                        "Operator '+' requires two numeric or two string operands, got {lhs} and {rhs}"
                    ));
                    Type::Unknown
                }
            }
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                let symbol = match b.op {
                    BinaryOp::Sub => "-",
                    BinaryOp::Mul => "*",
                    _ => "/",
                };
                let lhs = self.check_node(&b.lhs, env);
                let rhs = self.check_node(&b.rhs, env);
                match numeric_promotion(&lhs, &rhs) {
                    Some(t) => t,
                    None if lhs.is_unknown() || rhs.is_unknown() => Type::Unknown,
                    None => {
                        self.error(format!(
                            "Operator '{symbol}' requires numeric operands, got {lhs} and {rhs}"
                        ));
                        Type::Unknown
                    }
                }
            }
            BinaryOp::Mod => {
                let lhs = self.check_node(&b.lhs, env);
                let rhs = self.check_node(&b.rhs, env);
                let mut ok = true;
                if lhs != Type::Int && !lhs.is_unknown() {
                    self.error(format!("Operator '%' requires int operands, got {lhs}"));
                    ok = false;
                }
                if rhs != Type::Int && !rhs.is_unknown() {
                    self.error(format!("Operator '%' requires int operands, got {rhs}"));
                    ok = false;
                }
                if ok {
                    Type::Int
                } else {
                    Type::Unknown
                }
            }
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
                let lhs = self.check_node(&b.lhs, env);
                let rhs = self.check_node(&b.rhs, env);
                if !lhs.is_numeric() && !lhs.is_unknown() || !rhs.is_numeric() && !rhs.is_unknown() {
                    self.error(format!(
                        "Comparison operator requires numeric operands, got {lhs} and {rhs}"
                    ));
                }
                Type::Bool
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                let lhs = self.check_node(&b.lhs, env);
                let rhs = self.check_node(&b.rhs, env);
                let ok = lhs == rhs || (lhs.is_numeric() && rhs.is_numeric()) || lhs.is_unknown() || rhs.is_unknown();
                if !ok {
                    self.error(format!("Cannot compare {lhs} and {rhs} for equality"));
                }
                Type::Bool
            }
            BinaryOp::Assign => self.check_node(&b.rhs, env),
            BinaryOp::Dot => Type::Unknown,
        }
    }

    fn check_compound_assign(&mut self, b: &ast::BinaryOpNode, env: &Env<Type>) -> Type {
        let symbol = if b.op == BinaryOp::AddAssign { "+=" } else { "-=" };
        let name = match b.lhs.as_ref() {
            Node::Identifier(name) => name,
            _ => {
                self.error("Invalid assignment target");
                let _ = self.check_node(&b.rhs, env);
                return Type::Unknown;
            }
        };
        let rhs = self.check_node(&b.rhs, env);
        match env.get(name) {
            Some(lhs_ty) => {
                if !lhs_ty.is_numeric() && !lhs_ty.is_unknown() {
                    self.error(format!(
                        "Compound assignment requires a numeric variable, but '{name}' is {lhs_ty}"
                    ));
                    return Type::Unknown;
                }
                if !assignable(&rhs, &lhs_ty) {
                    self.error(format!(
                        "Cannot {symbol} a value of type {rhs} to variable '{name}' of type {lhs_ty}"
                    ));
                }
                lhs_ty
            }
            None => {
                self.error(format!("Undefined variable '{name}'"));
                Type::Unknown
            }
        }
    }

    fn check_unary_op(&mut self, u: &ast::UnaryOpNode, env: &Env<Type>) -> Type {
        let operand = self.check_node(&u.expr, env);
        match u.op {
            UnaryOp::Neg => {
                if operand.is_numeric() || operand.is_unknown() {
                    operand
                } else {
                    self.error(format!("Unary '-' requires a numeric operand, got {operand}"));
                    Type::Unknown
                }
            }
            UnaryOp::Not => {
                if operand != Type::Bool && !operand.is_unknown() {
                    self.error(format!("Unary '!' requires a bool operand, got {operand}"));
                }
                Type::Bool
            }
            UnaryOp::Inc | UnaryOp::Dec => {
                let symbol = if u.op == UnaryOp::Inc { "++" } else { "--" };
                if operand == Type::Int || operand.is_unknown() {
                    Type::Int
                } else {
                    self.error(format!("'{symbol}' requires an int operand, got {operand}"));
                    Type::Unknown
                }
            }
        }
    }

    fn check_function_call(&mut self, call: &ast::FunctionCall, env: &Env<Type>) -> Type {
        let arg_types: Vec<Type> = call.arguments.iter().map(|a| self.check_node(a, env)).collect();

        if BUILTIN_NAMES.contains(&call.callee_name.as_str()) {
            return match env.get(&call.callee_name) {
                Some(Type::Function(_, ret)) => *ret,
                _ => Type::Unknown,
            };
        }

        match env.get(&call.callee_name) {
            Some(Type::Function(params, ret)) => {
                if params.len() != arg_types.len() {
                    self.error(format!(
                        "Function '{}' expects {} argument(s), got {}",
                        call.callee_name,
                        params.len(),
                        arg_types.len()
                    ));
                    return Type::Unknown;
                }
                for (i, (actual, expected)) in arg_types.iter().zip(params.iter()).enumerate() {
                    if !assignable(actual, expected) {
                        self.error(format!(
                            "Argument {} of '{}': expected {}, got {}",
                            i + 1,
                            call.callee_name,
                            expected,
                            actual
                        ));
                    }
                }
                *ret
            }
            Some(_) => {
                self.error(format!("'{}' is not a function", call.callee_name));
                Type::Unknown
            }
            None => {
                self.error(format!("Undefined function '{}'", call.callee_name));
                Type::Unknown
            }
        }
    }

    fn check_struct_literal(&mut self, s: &ast::StructLiteral, env: &Env<Type>) -> Type {
        let struct_type = self.find_struct(&s.struct_name).cloned();
        let Some(Type::Struct(name, declared_fields)) = struct_type else {
            self.error(format!("Unknown struct: {}", s.struct_name));
            for (_, value) in &s.fields {
                self.check_node(value, env);
            }
            return Type::Unknown;
        };

        let mut provided = Vec::new();
        for (field_name, value_node) in &s.fields {
            let actual = self.check_node(value_node, env);
            match declared_fields.iter().find(|(n, _)| n == field_name) {
                Some((_, expected)) => {
                    if !assignable(&actual, expected) {
                        self.error(format!(
                            "Field '{field_name}' expects {expected}, got {actual}"
                        ));
                    }
                }
                None => {
                    self.error(format!("Struct '{name}' has no field '{field_name}'"));
                }
            }
            provided.push(field_name.clone());
        }
        for (declared_name, _) in &declared_fields {
            if !provided.contains(declared_name) {
                self.error(format!(
                    "Missing field '{declared_name}' (struct '{name}' has no value for it)"
                ));
            }
        }
        Type::Struct(name, declared_fields)
    }

    fn check_field_access(&mut self, f: &ast::FieldAccess, env: &Env<Type>) -> Type {
        let object = self.check_node(&f.object, env);
        match object {
            Type::Struct(name, fields) => match fields.iter().find(|(n, _)| *n == f.field_name) {
                Some((_, ty)) => ty.clone(),
                None => {
                    self.error(format!("Struct '{name}' has no field '{}'", f.field_name));
                    Type::Unknown
                }
            },
            Type::Unknown => Type::Unknown,
            other => {
                self.error(format!("Field access on a non-struct value of type {other}"));
                Type::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;

    fn main_with_body(body: Vec<Node>) -> Module {
        let mut module = Module::new("test");
        module.functions.push(Function {
            name: "main".to_string(),
            visibility: Visibility::Private,
            params: vec![],
            return_type: Some(TypeAnnotation::new("int", false)),
            body,
        });
        module
    }

    #[test]
    fn let_with_mismatched_annotation_fails() {
        let module = main_with_body(vec![make_let(
            "x",
            Some(TypeAnnotation::new("int", false)),
            Some(make_string("hello")),
        )]);
        let mut checker = TypeChecker::new();
        assert!(!checker.check(&module));
        assert!(checker.errors().iter().any(|e| e.message.contains("initialise")));
    }

    #[test]
    fn forward_reference_between_functions_resolves() {
        let mut module = Module::new("test");
        module.functions.push(Function {
            name: "main".to_string(),
            visibility: Visibility::Private,
            params: vec![],
            return_type: Some(TypeAnnotation::new("int", false)),
            body: vec![make_return(Some(make_function_call("helper", vec![])))],
        });
        module.functions.push(Function {
            name: "helper".to_string(),
            visibility: Visibility::Private,
            params: vec![],
            return_type: Some(TypeAnnotation::new("int", false)),
            body: vec![make_return(Some(make_int(1)))],
        });
        let mut checker = TypeChecker::new();
        assert!(checker.check(&module));
    }

    #[test]
    fn arity_mismatch_reports_expects() {
        let mut module = Module::new("test");
        module.functions.push(Function {
            name: "add".to_string(),
            visibility: Visibility::Private,
            params: vec![
                Param {
                    name: "x".to_string(),
                    type_annotation: TypeAnnotation::new("int", false),
                },
                Param {
                    name: "y".to_string(),
                    type_annotation: TypeAnnotation::new("int", false),
                },
            ],
            return_type: Some(TypeAnnotation::new("int", false)),
            body: vec![make_return(Some(make_identifier("x")))],
        });
        module.functions.push(Function {
            name: "main".to_string(),
            visibility: Visibility::Private,
            params: vec![],
            return_type: Some(TypeAnnotation::new("int", false)),
            body: vec![make_return(Some(make_function_call("add", vec![make_int(1)])))],
        });
        let mut checker = TypeChecker::new();
        assert!(!checker.check(&module));
        assert!(checker.errors().iter().any(|e| e.message.contains("expects")));
    }

    #[test]
    fn struct_field_type_mismatch_is_reported() {
        let mut module = Module::new("test");
        module.struct_defs.push(StructDef {
            name: "Point".to_string(),
            fields: vec![
                ("x".to_string(), TypeAnnotation::new("int", false)),
                ("y".to_string(), TypeAnnotation::new("int", false)),
            ],
        });
        module.functions.push(Function {
            name: "main".to_string(),
            visibility: Visibility::Private,
            params: vec![],
            return_type: Some(TypeAnnotation::new("int", false)),
            body: vec![
                make_let(
                    "p",
                    Some(TypeAnnotation::new("Point", false)),
                    Some(make_struct_literal(
                        "Point",
                        vec![("x".to_string(), make_string("nope")), ("y".to_string(), make_int(4))],
                    )),
                ),
                make_return(Some(make_int(0))),
            ],
        });
        let mut checker = TypeChecker::new();
        assert!(!checker.check(&module));
        assert!(checker
            .errors()
            .iter()
            .any(|e| e.message.contains("Field 'x'") && e.message.contains("expects")));
    }

    #[test]
    fn struct_field_access_resolves_declared_type() {
        let mut module = Module::new("test");
        module.struct_defs.push(StructDef {
            name: "Point".to_string(),
            fields: vec![
                ("x".to_string(), TypeAnnotation::new("int", false)),
                ("y".to_string(), TypeAnnotation::new("int", false)),
            ],
        });
        module.functions.push(Function {
            name: "main".to_string(),
            visibility: Visibility::Private,
            params: vec![],
            return_type: Some(TypeAnnotation::new("int", false)),
            body: vec![
                make_let(
                    "p",
                    Some(TypeAnnotation::new("Point", false)),
                    Some(make_struct_literal(
                        "Point",
                        vec![("x".to_string(), make_int(3)), ("y".to_string(), make_int(4))],
                    )),
                ),
                make_return(Some(make_binary_op(
                    BinaryOp::Add,
                    make_field_access(make_identifier("p"), "x"),
                    make_field_access(make_identifier("p"), "y"),
                ))),
            ],
        });
        let mut checker = TypeChecker::new();
        assert!(checker.check(&module));
    }
}
