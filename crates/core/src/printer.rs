//! Pure pretty printer.
//!
//! A deterministic textual rendering of the AST, used by `--print` and by
//! the debugger to describe the node about to be visited. Binary and unary
//! expressions are always parenthesised around the operator by design, so
//! the output round-trips unambiguously even though the surface grammar has
//! precedence. The printer has no error paths: any AST valid by the
//! invariants in `ast.rs` produces output.

use crate::ast::{BinaryOp, Module, Node, TypeAnnotation, UnaryOp, Visibility};

struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn new() -> Self {
        Printer {
            out: String::new(),
            indent: 0,
        }
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
    }

    fn line(&mut self, text: &str) {
        self.write_indent();
        self.out.push_str(text);
        self.out.push('\n');
    }
}

fn binary_op_str(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Lt => "<",
        BinaryOp::Gt => ">",
        BinaryOp::Le => "<=",
        BinaryOp::Ge => ">=",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
        BinaryOp::Assign => "=",
        BinaryOp::AddAssign => "+=",
        BinaryOp::SubAssign => "-=",
        BinaryOp::Dot => ".",
    }
}

fn unary_op_str(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "-",
        UnaryOp::Not => "!",
        UnaryOp::Inc => "++",
        UnaryOp::Dec => "--",
    }
}

fn type_annotation_str(ty: &TypeAnnotation) -> String {
    if ty.is_array {
        format!("{}[]", ty.name)
    } else {
        ty.name.clone()
    }
}

fn params_str(params: &[crate::ast::Param]) -> String {
    params
        .iter()
        .map(|p| format!("{}: {}", p.name, type_annotation_str(&p.type_annotation)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One-line rendering of an expression node; used both standalone and
/// nested inside statement rendering.
fn expr_to_string(node: &Node) -> String {
    match node {
        Node::Int(v) => v.to_string(),
        Node::Double(v) => v.to_string(),
        Node::String(s) => format!("\"{s}\""),
        Node::Identifier(name) => name.clone(),
        Node::BinaryOp(b) => format!(
            "({} {} {})",
            expr_to_string(&b.lhs),
            binary_op_str(b.op),
            expr_to_string(&b.rhs)
        ),
        Node::UnaryOp(u) => format!("({}{})", unary_op_str(u.op), expr_to_string(&u.expr)),
        Node::FunctionCall(call) => format!(
            "{}({})",
            call.callee_name,
            call.arguments.iter().map(expr_to_string).collect::<Vec<_>>().join(", ")
        ),
        Node::StructLiteral(s) => format!(
            "{} {{ {} }}",
            s.struct_name,
            s.fields
                .iter()
                .map(|(name, v)| format!("{name}: {}", expr_to_string(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Node::FieldAccess(f) => format!("{}.{}", expr_to_string(&f.object), f.field_name),
        Node::Closure(c) => {
            let ret = match &c.return_type {
                Some(t) => format!(" : {}", type_annotation_str(t)),
                None => String::new(),
            };
            format!("fn ({}){ret} {{ ... }}", params_str(&c.params))
        }
        // Remaining variants are statement-only; rendering one here would
        // indicate a malformed tree, but the printer has no error path.
        other => format!("{other:?}"),
    }
}

impl Printer {
    fn statement(&mut self, node: &Node) {
        match node {
            Node::Let(l) => {
                let ty = l
                    .type_annotation
                    .as_ref()
                    .map(|t| format!(": {}", type_annotation_str(t)))
                    .unwrap_or_default();
                let init = l
                    .initializer
                    .as_ref()
                    .map(|v| format!(" = {}", expr_to_string(v)))
                    .unwrap_or_default();
                self.line(&format!("let {}{ty}{init}", l.var_name));
            }
            Node::Assign(a) => {
                self.line(&format!(
                    "{} = {}",
                    expr_to_string(&a.target),
                    expr_to_string(&a.value)
                ));
            }
            Node::Return(r) => {
                let expr = r
                    .expr
                    .as_ref()
                    .map(|e| format!(" {}", expr_to_string(e)))
                    .unwrap_or_default();
                self.line(&format!("return{expr}"));
            }
            Node::If(i) => {
                self.write_indent();
                self.if_stmt(i);
            }
            Node::Block(b) => {
                for stmt in &b.statements {
                    self.statement(stmt);
                }
            }
            // Expression used in statement position (e.g. a bare call).
            other => self.line(&expr_to_string(other)),
        }
    }

    /// Writes `if (...) { ... } [else ...]` without emitting a leading
    /// indent — the caller has already positioned the cursor, whether at
    /// statement-start or right after an `else `.
    fn if_stmt(&mut self, i: &crate::ast::If) {
        self.out.push_str(&format!("if ({}) {{\n", expr_to_string(&i.condition)));
        self.indent += 1;
        self.statement(&i.then_block);
        self.indent -= 1;
        self.write_indent();
        self.out.push('}');
        match &i.else_branch {
            Some(else_branch) => {
                self.out.push_str(" else ");
                match else_branch.as_ref() {
                    Node::If(inner) => self.if_stmt(inner),
                    _ => {
                        self.out.push_str("{\n");
                        self.indent += 1;
                        self.statement(else_branch);
                        self.indent -= 1;
                        self.write_indent();
                        self.out.push_str("}\n");
                    }
                }
            }
            None => self.out.push('\n'),
        }
    }

    fn function(&mut self, func: &crate::ast::Function) {
        let vis = if func.visibility == Visibility::Public {
            "public "
        } else {
            ""
        };
        let ret = func
            .return_type
            .as_ref()
            .map(|t| format!(" : {}", type_annotation_str(t)))
            .unwrap_or_default();
        self.line(&format!("{vis}fn {}({}){ret} {{", func.name, params_str(&func.params)));
        self.indent += 1;
        for stmt in &func.body {
            self.statement(stmt);
        }
        self.indent -= 1;
        self.line("}");
    }

    fn module(&mut self, module: &Module) {
        self.line(&format!("module {}", module.name));
        self.out.push('\n');
        for import in &module.imports {
            let vis = if import.visibility == Visibility::Public {
                "public "
            } else {
                ""
            };
            let all = if import.import_all { ".*" } else { "" };
            self.line(&format!("{vis}import {}{all}", import.module_name));
        }
        for def in &module.struct_defs {
            let fields = def
                .fields
                .iter()
                .map(|(name, ty)| format!("{name}: {}", type_annotation_str(ty)))
                .collect::<Vec<_>>()
                .join(", ");
            self.line(&format!("struct {} {{ {fields} }}", def.name));
        }
        for func in &module.functions {
            self.out.push('\n');
            self.function(func);
        }
    }
}

/// Renders the whole module, matching `--print`'s stdout.
pub fn print_module(module: &Module) -> String {
    let mut printer = Printer::new();
    printer.module(module);
    printer.out
}

/// Renders a single node, for the debugger's step description. Callers
/// truncate this to its first non-empty line.
pub fn print_node(node: &Node) -> String {
    let mut printer = Printer::new();
    match node {
        Node::Block(_) | Node::Let(_) | Node::Assign(_) | Node::Return(_) | Node::If(_) => {
            printer.statement(node);
            printer.out
        }
        _ => expr_to_string(node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;

    #[test]
    fn binary_expressions_are_always_parenthesised() {
        let node = make_binary_op(BinaryOp::Add, make_int(1), make_int(2));
        assert_eq!(expr_to_string(&node), "(1 + 2)");
    }

    #[test]
    fn strings_are_quoted_identifiers_are_bare() {
        assert_eq!(expr_to_string(&make_string("hi")), "\"hi\"");
        assert_eq!(expr_to_string(&make_identifier("x")), "x");
    }

    #[test]
    fn module_prints_header_then_functions() {
        let mut module = Module::new("demo");
        module.functions.push(Function {
            name: "main".to_string(),
            visibility: Visibility::Private,
            params: vec![],
            return_type: Some(TypeAnnotation::new("int", false)),
            body: vec![make_return(Some(make_int(0)))],
        });
        let output = print_module(&module);
        assert!(output.starts_with("module demo\n"));
        assert!(output.contains("fn main() : int {"));
        assert!(output.contains("return 0"));
    }

    #[test]
    fn printing_is_total_for_any_valid_tree() {
        let node = make_if(
            make_binary_op(BinaryOp::Lt, make_int(1), make_int(2)),
            make_block(vec![make_return(Some(make_int(7)))]),
            Some(make_block(vec![make_return(Some(make_int(9)))])),
        );
        let output = print_node(&node);
        assert!(output.contains("if (") && output.contains("else"));
    }
}
