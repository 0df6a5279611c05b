//! Abstract syntax tree for Pie
//!
//! A single tagged `Node` enum covers both expression and statement
//! positions, the same shape the teacher uses for its own `Statement` enum
//! (literals, calls, and control-flow all live in one sum type rather than
//! behind separate `Expr`/`Stmt` traits). Visibility is the integer-encoded
//! level from the spec: `0` private, `1` public.

use std::rc::Rc;

/// Visibility level recorded on imports and function declarations.
/// Currently informational only (no access-control enforcement).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Private,
    Public,
}

impl Visibility {
    pub fn from_flag(is_public: bool) -> Self {
        if is_public {
            Visibility::Public
        } else {
            Visibility::Private
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    Assign,
    AddAssign,
    SubAssign,
    /// Listed in the operator enumeration but never produced by the parser
    /// or consumed by the checker/evaluator — `FieldAccess` supersedes it.
    Dot,
}

#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub enum UnaryOp {
    Neg,
    Not,
    Inc,
    Dec,
}

/// A type annotation as written in source: a bare name plus an array marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAnnotation {
    pub name: String,
    pub is_array: bool,
}

impl TypeAnnotation {
    pub fn new(name: impl Into<String>, is_array: bool) -> Self {
        TypeAnnotation {
            name: name.into(),
            is_array,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub module_name: String,
    pub visibility: Visibility,
    pub import_all: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub type_annotation: TypeAnnotation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub visibility: Visibility,
    pub params: Vec<Param>,
    pub return_type: Option<TypeAnnotation>,
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    pub params: Vec<Param>,
    pub return_type: Option<TypeAnnotation>,
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub callee_name: String,
    pub arguments: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Let {
    pub var_name: String,
    pub type_annotation: Option<TypeAnnotation>,
    pub initializer: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    /// Must resolve to an `Identifier` node; invalid targets are a parser
    /// or runtime error rather than a distinct AST shape.
    pub target: Box<Node>,
    pub value: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Return {
    pub expr: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct If {
    pub condition: Box<Node>,
    pub then_block: Box<Node>,
    /// Either another `Block` or another `If` (for `else if`).
    pub else_branch: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOpNode {
    pub op: BinaryOp,
    pub lhs: Box<Node>,
    pub rhs: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryOpNode {
    pub op: UnaryOp,
    pub expr: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<(String, TypeAnnotation)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructLiteral {
    pub struct_name: String,
    pub fields: Vec<(String, Node)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldAccess {
    pub object: Box<Node>,
    pub field_name: String,
}

/// One node of the tagged tree. Every expression position holds an
/// expression variant; every statement position holds a statement variant
/// (enforced by the parser, not by the type system, matching the original
/// single `Node` base class).
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Import(Import),
    Function(Function),
    Closure(Closure),
    FunctionCall(FunctionCall),
    Let(Let),
    Assign(Assign),
    Return(Return),
    If(If),
    Block(Block),
    BinaryOp(BinaryOpNode),
    UnaryOp(UnaryOpNode),
    Int(i64),
    Double(f64),
    String(String),
    Identifier(String),
    TypeAnnotation(TypeAnnotation),
    StructDef(StructDef),
    StructLiteral(StructLiteral),
    FieldAccess(FieldAccess),
}

impl Node {
    /// Generic traversal support: the child expression/statement nodes this
    /// node owns, in evaluation order. Leaf nodes (literals, identifiers,
    /// type annotations) have none.
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Import(_) => vec![],
            Node::Function(f) => f.body.iter().collect(),
            Node::Closure(c) => c.body.iter().collect(),
            Node::FunctionCall(call) => call.arguments.iter().collect(),
            Node::Let(l) => l.initializer.as_deref().into_iter().collect(),
            Node::Assign(a) => vec![&a.target, &a.value],
            Node::Return(r) => r.expr.as_deref().into_iter().collect(),
            Node::If(i) => {
                let mut v = vec![i.condition.as_ref(), i.then_block.as_ref()];
                if let Some(e) = &i.else_branch {
                    v.push(e);
                }
                v
            }
            Node::Block(b) => b.statements.iter().collect(),
            Node::BinaryOp(b) => vec![&b.lhs, &b.rhs],
            Node::UnaryOp(u) => vec![&u.expr],
            Node::Int(_) | Node::Double(_) | Node::String(_) | Node::Identifier(_) => vec![],
            Node::TypeAnnotation(_) => vec![],
            Node::StructDef(_) => vec![],
            Node::StructLiteral(s) => s.fields.iter().map(|(_, v)| v).collect(),
            Node::FieldAccess(f) => vec![&f.object],
        }
    }
}

/// Top-level compilation unit: the module owns its functions and struct
/// defs, and maintains a symbol table mapping every named top-level item to
/// itself for quick lookup (imports are listed but carry no symtab entry —
/// they resolve no name within this module).
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    pub imports: Vec<Import>,
    pub functions: Vec<Function>,
    pub struct_defs: Vec<StructDef>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            imports: Vec::new(),
            functions: Vec::new(),
            struct_defs: Vec::new(),
        }
    }

    pub fn find_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn find_struct(&self, name: &str) -> Option<&StructDef> {
        self.struct_defs.iter().find(|s| s.name == name)
    }
}

/// Convenience alias used by the evaluator: function values hold a
/// reference-counted pointer into the module that owns them rather than a
/// non-owning raw pointer, since Rust cannot statically express "the module
/// outlives every value" without an arena or unsafe lifetime extension. The
/// whole module is wrapped once at load time.
pub type ModuleRef = Rc<Module>;

// ---------------------------------------------------------------------------
// Parser → core builder operations (spec §6.3)
//
// These mirror the node-construction API the out-of-scope parser drives;
// keeping them as free functions (rather than inlining struct literals at
// every call site) is what lets `pie::parser` stay a thin, readable
// translation from grammar rule to AST shape.
// ---------------------------------------------------------------------------

pub fn make_int(v: i64) -> Node {
    Node::Int(v)
}

pub fn make_double(v: f64) -> Node {
    Node::Double(v)
}

pub fn make_string(v: impl Into<String>) -> Node {
    Node::String(v.into())
}

pub fn make_identifier(name: impl Into<String>) -> Node {
    Node::Identifier(name.into())
}

pub fn make_binary_op(op: BinaryOp, lhs: Node, rhs: Node) -> Node {
    Node::BinaryOp(BinaryOpNode {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

pub fn make_unary_op(op: UnaryOp, expr: Node) -> Node {
    Node::UnaryOp(UnaryOpNode {
        op,
        expr: Box::new(expr),
    })
}

pub fn make_function_call(name: impl Into<String>, args: Vec<Node>) -> Node {
    Node::FunctionCall(FunctionCall {
        callee_name: name.into(),
        arguments: args,
    })
}

pub fn make_let(name: impl Into<String>, ty: Option<TypeAnnotation>, value: Option<Node>) -> Node {
    Node::Let(Let {
        var_name: name.into(),
        type_annotation: ty,
        initializer: value.map(Box::new),
    })
}

pub fn make_assign(target: Node, value: Node) -> Node {
    Node::Assign(Assign {
        target: Box::new(target),
        value: Box::new(value),
    })
}

pub fn make_return(expr: Option<Node>) -> Node {
    Node::Return(Return {
        expr: expr.map(Box::new),
    })
}

pub fn make_if(cond: Node, then_block: Node, else_branch: Option<Node>) -> Node {
    Node::If(If {
        condition: Box::new(cond),
        then_block: Box::new(then_block),
        else_branch: else_branch.map(Box::new),
    })
}

pub fn make_block(statements: Vec<Node>) -> Node {
    Node::Block(Block { statements })
}

pub fn make_type(name: impl Into<String>, is_array: bool) -> TypeAnnotation {
    TypeAnnotation::new(name, is_array)
}

pub fn make_struct_literal(type_name: impl Into<String>, fields: Vec<(String, Node)>) -> Node {
    Node::StructLiteral(StructLiteral {
        struct_name: type_name.into(),
        fields,
    })
}

pub fn make_field_access(object: Node, field: impl Into<String>) -> Node {
    Node::FieldAccess(FieldAccess {
        object: Box::new(object),
        field_name: field.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_op_children_are_lhs_and_rhs() {
        let node = make_binary_op(BinaryOp::Add, make_int(1), make_int(2));
        assert_eq!(node.children().len(), 2);
    }

    #[test]
    fn if_without_else_has_two_children() {
        let node = make_if(make_identifier("cond"), make_block(vec![]), None);
        assert_eq!(node.children().len(), 2);
    }

    #[test]
    fn if_with_else_has_three_children() {
        let node = make_if(
            make_identifier("cond"),
            make_block(vec![]),
            Some(make_block(vec![])),
        );
        assert_eq!(node.children().len(), 3);
    }

    #[test]
    fn module_looks_up_functions_and_structs_by_name() {
        let mut module = Module::new("main");
        module.functions.push(Function {
            name: "main".to_string(),
            visibility: Visibility::Private,
            params: vec![],
            return_type: None,
            body: vec![],
        });
        module.struct_defs.push(StructDef {
            name: "Point".to_string(),
            fields: vec![],
        });

        assert!(module.find_function("main").is_some());
        assert!(module.find_function("missing").is_none());
        assert!(module.find_struct("Point").is_some());
    }
}
