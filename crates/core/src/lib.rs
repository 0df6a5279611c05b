//! AST model, static type checker, and tree-walking evaluator for Pie.
//!
//! The pipeline this crate implements is leaves-first: [`ast`] depends on
//! nothing project-local; [`printer`], [`checker`], and [`evaluator`] each
//! depend only on `ast`; the `pie` binary composes them with a lexer and
//! parser of its own.

pub mod ast;
pub mod checker;
pub mod debugger;
pub mod env;
pub mod error;
pub mod evaluator;
pub mod printer;
pub mod types;
pub mod value;

pub use ast::Module;
pub use checker::{TypeChecker, TypeError};
pub use error::RuntimeError;
pub use evaluator::Evaluator;
pub use value::Value;
