//! Tree-walking evaluator.
//!
//! Threads a `result` value and a current environment through the AST. A
//! function call opens a fresh environment parented at the **global** scope
//! (lexical-from-module, not dynamic-from-caller), binds parameters
//! positionally, and catches the non-local return raised by `Return`.
//!
//! Non-local return is modelled as `Flow::Return(Value)` rather than a
//! native unwind: `eval_statement` propagates it unchanged through blocks
//! and `If`, and `call_function` intercepts it at the boundary. This keeps
//! scope restoration exception-safe by construction — there is no code path
//! where a block's child scope is installed but never discarded, unlike the
//! reference implementation this behaviour is ported from, which only
//! restored the caller's environment inside the non-local-return catch
//! block and skipped that restoration on any other kind of error.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use crate::ast::{self, BinaryOp, Module, Node, UnaryOp};
use crate::debugger::Debugger;
use crate::env::Env;
use crate::error::RuntimeError;
use crate::value::{BuiltinFn, Value};

/// Shared sink for `print`/`io.print`. Boxed behind `Rc<RefCell<_>>` rather
/// than hard-wired to real stdout, the same small-generic-boundary approach
/// `debugger.rs` uses for its command stream, so tests can assert on
/// captured output instead of racing real process stdout.
type Output = Rc<RefCell<dyn Write>>;

fn stdout_sink() -> Output {
    Rc::new(RefCell::new(io::stdout()))
}

/// Outcome of evaluating one statement: either a plain value (most
/// statements evaluate to `Nil`) or an in-flight non-local return.
enum Flow {
    Value(Value),
    Return(Value),
}

pub struct Evaluator {
    global: Env<Value>,
    debugger: Option<Debugger>,
    output: Output,
    step: u64,
    depth: u64,
}

impl Evaluator {
    pub fn new() -> Self {
        Evaluator {
            global: Env::root(),
            debugger: None,
            output: stdout_sink(),
            step: 0,
            depth: 0,
        }
    }

    pub fn with_debugger(debugger: Debugger) -> Self {
        Evaluator {
            global: Env::root(),
            debugger: Some(debugger),
            output: stdout_sink(),
            step: 0,
            depth: 0,
        }
    }

    /// Redirects `print`/`io.print` to `sink` instead of real stdout, for
    /// tests that need to assert on program output without racing the test
    /// harness's own stdout.
    pub fn with_output(sink: Rc<RefCell<dyn Write>>) -> Self {
        Evaluator {
            global: Env::root(),
            debugger: None,
            output: sink,
            step: 0,
            depth: 0,
        }
    }

    fn register_builtins(&mut self) {
        let sink = Rc::clone(&self.output);
        let print_fn: BuiltinFn = Rc::new(move |args: &[Value]| print_builtin(&sink, args));
        self.global.define("print", Value::Builtin(Rc::clone(&print_fn)));
        self.global.define("io.print", Value::Builtin(print_fn));
        define_builtin(&self.global, "exit", exit_builtin);
        define_builtin(&self.global, "len", len_builtin);
        define_builtin(&self.global, "type", type_builtin);
    }

    /// Registers every top-level function, then calls `main` with zero
    /// arguments. `main`'s return value propagates to the driver unchanged.
    pub fn run(&mut self, module: &Module) -> Result<Value, RuntimeError> {
        self.register_builtins();
        for func in &module.functions {
            self.global
                .define(func.name.clone(), Value::Function(Rc::new(func.clone())));
        }
        let main = module
            .find_function("main")
            .ok_or_else(|| RuntimeError::UndefinedFunction("main".to_string()))?;
        tracing::debug!(function = "main", "starting evaluation");
        self.call_function(&Rc::new(main.clone()), &[])
    }

    fn call_function(&mut self, func: &Rc<ast::Function>, args: &[Value]) -> Result<Value, RuntimeError> {
        let scope = Env::child(&self.global);
        for (param, arg) in func.params.iter().zip(args.iter()) {
            scope.define(param.name.clone(), arg.clone());
        }
        self.depth += 1;
        let result = self.eval_block_statements(&func.body, &scope);
        self.depth -= 1;
        match result? {
            Flow::Return(v) | Flow::Value(v) => Ok(v),
        }
    }

    fn eval_block_statements(&mut self, statements: &[Node], env: &Env<Value>) -> Result<Flow, RuntimeError> {
        let mut last = Value::Nil;
        for stmt in statements {
            match self.eval_node(stmt, env)? {
                Flow::Return(v) => return Ok(Flow::Return(v)),
                Flow::Value(v) => last = v,
            }
        }
        Ok(Flow::Value(last))
    }

    fn debug_before(&mut self, node: &Node, env: &Env<Value>) -> Result<(), RuntimeError> {
        if let Some(debugger) = &mut self.debugger {
            self.step += 1;
            debugger.before_node(self.step, self.depth, node, env)?;
        }
        Ok(())
    }

    fn eval_node(&mut self, node: &Node, env: &Env<Value>) -> Result<Flow, RuntimeError> {
        self.debug_before(node, env)?;
        match node {
            Node::Int(v) => Ok(Flow::Value(Value::Int(*v))),
            Node::Double(v) => Ok(Flow::Value(Value::Double(*v))),
            Node::String(s) => Ok(Flow::Value(Value::String(s.clone()))),
            Node::Identifier(name) => {
                let value = env
                    .get(name)
                    .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone()))?;
                Ok(Flow::Value(value))
            }
            Node::Let(l) => self.eval_let(l, env),
            Node::Assign(a) => self.eval_assign(a, env),
            Node::Return(r) => {
                let value = match &r.expr {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }
            Node::If(i) => self.eval_if(i, env),
            Node::Block(b) => {
                let child = Env::child(env);
                self.eval_block_statements(&b.statements, &child)
            }
            Node::BinaryOp(b) => self.eval_binary_op(b, env).map(Flow::Value),
            Node::UnaryOp(u) => self.eval_unary_op(u, env).map(Flow::Value),
            Node::FunctionCall(call) => self.eval_function_call(call, env).map(Flow::Value),
            Node::StructLiteral(s) => self.eval_struct_literal(s, env).map(Flow::Value),
            Node::FieldAccess(f) => self.eval_field_access(f, env).map(Flow::Value),
            Node::Import(_) | Node::TypeAnnotation(_) | Node::StructDef(_) | Node::Function(_) | Node::Closure(_) => {
                Ok(Flow::Value(Value::Nil))
            }
        }
    }

    /// Evaluates a node known to be in expression position, unwrapping the
    /// `Flow` (expressions cannot themselves raise a non-local return).
    fn eval_expr(&mut self, node: &Node, env: &Env<Value>) -> Result<Value, RuntimeError> {
        match self.eval_node(node, env)? {
            Flow::Value(v) => Ok(v),
            Flow::Return(v) => Ok(v),
        }
    }

    fn eval_let(&mut self, l: &ast::Let, env: &Env<Value>) -> Result<Flow, RuntimeError> {
        let value = match &l.initializer {
            Some(init) => self.eval_expr(init, env)?,
            None => Value::Nil,
        };
        env.define(l.var_name.clone(), value);
        Ok(Flow::Value(Value::Nil))
    }

    fn eval_assign(&mut self, a: &ast::Assign, env: &Env<Value>) -> Result<Flow, RuntimeError> {
        let name = match a.target.as_ref() {
            Node::Identifier(name) => name.clone(),
            _ => return Err(RuntimeError::InvalidAssignTarget),
        };
        let value = self.eval_expr(&a.value, env)?;
        if !env.set(&name, value.clone()) {
            return Err(RuntimeError::UndefinedVariable(name));
        }
        Ok(Flow::Value(value))
    }

    fn eval_if(&mut self, i: &ast::If, env: &Env<Value>) -> Result<Flow, RuntimeError> {
        let cond = self.eval_expr(&i.condition, env)?;
        if cond.truthy() {
            self.eval_node(&i.then_block, env)
        } else if let Some(else_branch) = &i.else_branch {
            self.eval_node(else_branch, env)
        } else {
            Ok(Flow::Value(Value::Nil))
        }
    }

    fn eval_binary_op(&mut self, b: &ast::BinaryOpNode, env: &Env<Value>) -> Result<Value, RuntimeError> {
        match b.op {
            BinaryOp::And => {
                let lhs = self.eval_expr(&b.lhs, env)?;
                if !lhs.truthy() {
                    return Ok(Value::Bool(false));
                }
                let rhs = self.eval_expr(&b.rhs, env)?;
                Ok(Value::Bool(rhs.truthy()))
            }
            BinaryOp::Or => {
                let lhs = self.eval_expr(&b.lhs, env)?;
                if lhs.truthy() {
                    return Ok(Value::Bool(true));
                }
                let rhs = self.eval_expr(&b.rhs, env)?;
                Ok(Value::Bool(rhs.truthy()))
            }
            BinaryOp::AddAssign | BinaryOp::SubAssign => self.eval_compound_assign(b, env),
            BinaryOp::Add => {
                let lhs = self.eval_expr(&b.lhs, env)?;
                let rhs = self.eval_expr(&b.rhs, env)?;
                if matches!(lhs, Value::String(_)) || matches!(rhs, Value::String(_)) {
                    Ok(Value::String(format!("{}{}", lhs.display(), rhs.display())))
                } else if lhs.is_int() && rhs.is_int() {
                    Ok(Value::Int(lhs.to_int() + rhs.to_int()))
                } else {
                    Ok(Value::Double(lhs.to_double() + rhs.to_double()))
                }
            }
            BinaryOp::Sub => {
                let lhs = self.eval_expr(&b.lhs, env)?;
                let rhs = self.eval_expr(&b.rhs, env)?;
                if lhs.is_int() && rhs.is_int() {
                    Ok(Value::Int(lhs.to_int() - rhs.to_int()))
                } else {
                    Ok(Value::Double(lhs.to_double() - rhs.to_double()))
                }
            }
            BinaryOp::Mul => {
                let lhs = self.eval_expr(&b.lhs, env)?;
                let rhs = self.eval_expr(&b.rhs, env)?;
                if lhs.is_int() && rhs.is_int() {
                    Ok(Value::Int(lhs.to_int() * rhs.to_int()))
                } else {
                    Ok(Value::Double(lhs.to_double() * rhs.to_double()))
                }
            }
            BinaryOp::Div => {
                let lhs = self.eval_expr(&b.lhs, env)?;
                let rhs = self.eval_expr(&b.rhs, env)?;
                if rhs.to_double() == 0.0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                if lhs.is_int() && rhs.is_int() {
                    Ok(Value::Int(lhs.to_int() / rhs.to_int()))
                } else {
                    Ok(Value::Double(lhs.to_double() / rhs.to_double()))
                }
            }
            BinaryOp::Mod => {
                let lhs = self.eval_expr(&b.lhs, env)?;
                let rhs = self.eval_expr(&b.rhs, env)?;
                if rhs.to_int() == 0 {
                    return Err(RuntimeError::ModuloByZero);
                }
                Ok(Value::Int(lhs.to_int() % rhs.to_int()))
            }
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
                let lhs = self.eval_expr(&b.lhs, env)?;
                let rhs = self.eval_expr(&b.rhs, env)?;
                let ord = if let (Value::String(l), Value::String(r)) = (&lhs, &rhs) {
                    l.cmp(r)
                } else {
                    lhs.to_double().partial_cmp(&rhs.to_double()).unwrap_or(std::cmp::Ordering::Equal)
                };
                let result = match b.op {
                    BinaryOp::Lt => ord.is_lt(),
                    BinaryOp::Gt => ord.is_gt(),
                    BinaryOp::Le => ord.is_le(),
                    _ => ord.is_ge(),
                };
                Ok(Value::Bool(result))
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                let lhs = self.eval_expr(&b.lhs, env)?;
                let rhs = self.eval_expr(&b.rhs, env)?;
                let equal = values_equal(&lhs, &rhs);
                Ok(Value::Bool(if b.op == BinaryOp::Eq { equal } else { !equal }))
            }
            BinaryOp::Assign => self.eval_expr(&b.rhs, env),
            BinaryOp::Dot => Ok(Value::Nil),
        }
    }

    fn eval_compound_assign(&mut self, b: &ast::BinaryOpNode, env: &Env<Value>) -> Result<Value, RuntimeError> {
        let name = match b.lhs.as_ref() {
            Node::Identifier(name) => name.clone(),
            _ => return Err(RuntimeError::InvalidAssignTarget),
        };
        let current = env
            .get(&name)
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone()))?;
        let rhs = self.eval_expr(&b.rhs, env)?;
        let updated = if current.is_int() && rhs.is_int() {
            let delta = rhs.to_int();
            Value::Int(if b.op == BinaryOp::AddAssign {
                current.to_int() + delta
            } else {
                current.to_int() - delta
            })
        } else {
            let delta = rhs.to_double();
            Value::Double(if b.op == BinaryOp::AddAssign {
                current.to_double() + delta
            } else {
                current.to_double() - delta
            })
        };
        env.set(&name, updated.clone());
        Ok(updated)
    }

    fn eval_unary_op(&mut self, u: &ast::UnaryOpNode, env: &Env<Value>) -> Result<Value, RuntimeError> {
        let operand = self.eval_expr(&u.expr, env)?;
        match u.op {
            UnaryOp::Neg => {
                if operand.is_int() {
                    Ok(Value::Int(-operand.to_int()))
                } else {
                    Ok(Value::Double(-operand.to_double()))
                }
            }
            UnaryOp::Not => Ok(Value::Bool(!operand.truthy())),
            // Documented open question: the source leaves Inc/Dec as TODO
            // no-ops returning the operand unchanged.
            UnaryOp::Inc | UnaryOp::Dec => Ok(operand),
        }
    }

    fn eval_function_call(&mut self, call: &ast::FunctionCall, env: &Env<Value>) -> Result<Value, RuntimeError> {
        let mut args = Vec::with_capacity(call.arguments.len());
        for arg in &call.arguments {
            args.push(self.eval_expr(arg, env)?);
        }

        let callee = env
            .get(&call.callee_name)
            .or_else(|| self.global.get(&call.callee_name))
            .ok_or_else(|| RuntimeError::UndefinedFunction(call.callee_name.clone()))?;

        match callee {
            Value::Function(func) => self.call_function(&func, &args),
            Value::Builtin(builtin) => builtin(&args),
            _ => Err(RuntimeError::NotCallable(call.callee_name.clone())),
        }
    }

    fn eval_struct_literal(&mut self, s: &ast::StructLiteral, env: &Env<Value>) -> Result<Value, RuntimeError> {
        let mut fields = std::collections::HashMap::new();
        for (name, value_node) in &s.fields {
            let value = self.eval_expr(value_node, env)?;
            fields.insert(name.clone(), value);
        }
        Ok(Value::Struct(
            s.struct_name.clone(),
            Rc::new(std::cell::RefCell::new(fields)),
        ))
    }

    fn eval_field_access(&mut self, f: &ast::FieldAccess, env: &Env<Value>) -> Result<Value, RuntimeError> {
        let object = self.eval_expr(&f.object, env)?;
        match object {
            Value::Struct(_, fields) => fields
                .borrow()
                .get(&f.field_name)
                .cloned()
                .ok_or_else(|| RuntimeError::MissingStructField(f.field_name.clone())),
            _ => Err(RuntimeError::FieldAccessOnNonStruct),
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// `Eq`/`Ne` structural-or-numeric comparison, tightened relative to the
/// reference implementation's truthiness fallback per the open question in
/// the design notes — cross-type comparisons other than numeric widening
/// are simply unequal rather than compared by truthiness.
fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Int(_) | Value::Double(_), Value::Int(_) | Value::Double(_)) => lhs.to_double() == rhs.to_double(),
        (Value::Struct(name_a, a), Value::Struct(name_b, b)) => name_a == name_b && Rc::ptr_eq(a, b),
        _ => false,
    }
}

fn define_builtin(env: &Env<Value>, name: &str, f: fn(&[Value]) -> Result<Value, RuntimeError>) {
    let builtin: BuiltinFn = Rc::new(f);
    env.define(name, Value::Builtin(builtin));
}

fn print_builtin(sink: &Output, args: &[Value]) -> Result<Value, RuntimeError> {
    let rendered: Vec<String> = args.iter().map(Value::display).collect();
    let _ = writeln!(sink.borrow_mut(), "{}", rendered.join(" "));
    Ok(Value::Nil)
}

fn exit_builtin(args: &[Value]) -> Result<Value, RuntimeError> {
    let code = args.first().map(Value::to_int).unwrap_or(0);
    std::process::exit(code as i32);
}

fn len_builtin(args: &[Value]) -> Result<Value, RuntimeError> {
    let len = match args.first() {
        Some(Value::String(s)) => s.len() as i64,
        _ => 0,
    };
    Ok(Value::Int(len))
}

fn type_builtin(args: &[Value]) -> Result<Value, RuntimeError> {
    let tag = args.first().map(Value::type_tag).unwrap_or("nil");
    Ok(Value::String(tag.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;

    fn module_with_main(body: Vec<Node>) -> Module {
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
    fn compound_assign_widens_to_double_when_rhs_is_double() {
        let module = module_with_main(vec![
            make_let("a", Some(TypeAnnotation::new("int", false)), Some(make_int(1))),
            make_assign(
                make_identifier("a"),
                make_binary_op(BinaryOp::AddAssign, make_identifier("a"), make_double(2.5)),
            ),
            make_return(Some(make_identifier("a"))),
        ]);
        let mut eval = Evaluator::new();
        let result = eval.run(&module).unwrap();
        assert_eq!(result.to_double(), 3.5);
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let module = module_with_main(vec![make_return(Some(make_binary_op(
            BinaryOp::Div,
            make_int(1),
            make_int(0),
        )))]);
        let mut eval = Evaluator::new();
        assert_eq!(eval.run(&module), Err(RuntimeError::DivisionByZero));
    }

    #[test]
    fn if_evaluates_exactly_one_branch() {
        let module = module_with_main(vec![make_if(
            make_binary_op(BinaryOp::Lt, make_int(1), make_int(2)),
            make_block(vec![make_return(Some(make_int(7)))]),
            Some(make_block(vec![make_return(Some(make_int(9)))])),
        )]);
        let mut eval = Evaluator::new();
        assert_eq!(eval.run(&module).unwrap().to_int(), 7);
    }

    #[test]
    fn struct_field_access_reads_constructed_value() {
        let module = module_with_main(vec![
            make_let(
                "p",
                None,
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
        ]);
        let mut eval = Evaluator::new();
        assert_eq!(eval.run(&module).unwrap().to_int(), 7);
    }

    #[test]
    fn string_concatenation_coerces_numeric_operand() {
        let module = module_with_main(vec![make_return(Some(make_binary_op(
            BinaryOp::Add,
            make_string("hi "),
            make_int(5),
        )))]);
        let mut eval = Evaluator::new();
        assert_eq!(eval.run(&module).unwrap().display(), "hi 5");
    }

    #[test]
    fn print_writes_through_the_injected_sink_not_real_stdout() {
        let module = module_with_main(vec![
            make_let(
                "s".to_string(),
                Some(TypeAnnotation::new("string", false)),
                Some(make_binary_op(BinaryOp::Add, make_string("hi "), make_int(5))),
            ),
            make_function_call("print", vec![make_identifier("s")]),
            make_return(Some(make_int(0))),
        ]);
        let captured: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let sink: Rc<RefCell<dyn Write>> = captured.clone();
        let mut eval = Evaluator::with_output(sink);
        assert_eq!(eval.run(&module).unwrap().to_int(), 0);
        let text = String::from_utf8(captured.borrow().clone()).unwrap();
        assert_eq!(text, "hi 5\n");
    }

    #[test]
    fn function_call_is_lexical_from_module_not_dynamic_from_caller() {
        let mut module = Module::new("test");
        module.functions.push(Function {
            name: "helper".to_string(),
            visibility: Visibility::Private,
            params: vec![],
            return_type: Some(TypeAnnotation::new("int", false)),
            // `x` is not in scope here even though callers may define one;
            // referencing it must fail rather than see the caller's value.
            body: vec![make_return(Some(make_identifier("x")))],
        });
        module.functions.push(Function {
            name: "main".to_string(),
            visibility: Visibility::Private,
            params: vec![],
            return_type: Some(TypeAnnotation::new("int", false)),
            body: vec![
                make_let("x", Some(TypeAnnotation::new("int", false)), Some(make_int(99))),
                make_return(Some(make_function_call("helper", vec![]))),
            ],
        });
        let mut eval = Evaluator::new();
        assert_eq!(
            eval.run(&module),
            Err(RuntimeError::UndefinedVariable("x".to_string()))
        );
    }
}
