//! Runtime error type.
//!
//! A plain enum with a hand-written `Display`, matching the style the
//! workspace uses elsewhere for fallible internal operations rather than
//! reaching for a derive-macro error crate.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    UndefinedVariable(String),
    UndefinedFunction(String),
    NotCallable(String),
    InvalidAssignTarget,
    DivisionByZero,
    ModuloByZero,
    FieldAccessOnNonStruct,
    MissingStructField(String),
    DebuggerQuit,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::UndefinedVariable(name) => write!(f, "Undefined variable: {name}"),
            RuntimeError::UndefinedFunction(name) => write!(f, "Undefined function: {name}"),
            RuntimeError::NotCallable(name) => write!(f, "Not callable: {name}"),
            RuntimeError::InvalidAssignTarget => write!(f, "Invalid assignment target"),
            RuntimeError::DivisionByZero => write!(f, "Division by zero"),
            RuntimeError::ModuloByZero => write!(f, "Modulo by zero"),
            RuntimeError::FieldAccessOnNonStruct => write!(f, "Field access on non-struct value"),
            RuntimeError::MissingStructField(name) => write!(f, "No such field: {name}"),
            RuntimeError::DebuggerQuit => write!(f, "Debugger stopped execution"),
        }
    }
}

impl std::error::Error for RuntimeError {}
