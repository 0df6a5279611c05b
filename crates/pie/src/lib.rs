//! Library surface shared by the `pie` binary and its integration tests.
//!
//! Keeping the lex -> parse -> check -> evaluate pipeline here (rather than
//! inline in `main.rs`) lets tests drive the whole pipeline in one process
//! and assert on captured stdout and the returned/propagated exit value,
//! instead of shelling out to the built binary.

pub mod lexer;
pub mod parser;

use std::cell::RefCell;
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;

use pie_core::checker::TypeChecker;
use pie_core::evaluator::Evaluator;
use pie_core::{printer, Module, RuntimeError, TypeError, Value};

pub use parser::ParseError;

/// Why a run did not reach a value: surfaced to the driver as the relevant
/// exit code (2 for parse/type errors, 3 for runtime errors).
#[derive(Debug)]
pub enum PipelineError {
    Parse(ParseError),
    Type(Vec<TypeError>),
    Runtime(RuntimeError),
}

/// Why a file-backed run never reached the pipeline, or the pipeline's own
/// `PipelineError` once the file was read successfully.
#[derive(Debug)]
pub enum RunFileError {
    Io(io::Error),
    Pipeline(PipelineError),
}

/// The module name a driver should use for a given input path: its file
/// stem, or `"module"` for a path with none.
pub fn module_name_for(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("module")
        .to_string()
}

/// Parses `source` into a `Module`, naming it `module_name` (the file stem,
/// by convention — see `module_name_for`).
pub fn parse_module(source: &str, module_name: &str) -> Result<Module, ParseError> {
    parser::parse(source, module_name)
}

/// `--print` mode: parse only, then pretty-print. Never runs the checker,
/// mirroring the original driver, which prints the raw parsed AST.
pub fn print_ast(source: &str, module_name: &str) -> Result<String, ParseError> {
    let module = parse_module(source, module_name)?;
    Ok(printer::print_module(&module))
}

/// Execute mode: parse, type-check, then evaluate, writing any `print`/
/// `io.print` output through `output` instead of real stdout. Returns the
/// value `main` produced, or the first-applicable `PipelineError`.
pub fn run(source: &str, module_name: &str, output: Rc<RefCell<dyn Write>>) -> Result<Value, PipelineError> {
    let module = parse_module(source, module_name).map_err(PipelineError::Parse)?;

    let mut checker = TypeChecker::new();
    if !checker.check(&module) {
        return Err(PipelineError::Type(checker.errors().to_vec()));
    }

    let mut evaluator = Evaluator::with_output(output);
    evaluator.run(&module).map_err(PipelineError::Runtime)
}

/// Reads `path` from disk and runs it, per [`run`]. The file-reading half of
/// the CLI driver's execute mode, factored out here so it can be exercised
/// against a real file on disk without shelling out to the built binary.
pub fn run_file(path: &Path, output: Rc<RefCell<dyn Write>>) -> Result<Value, RunFileError> {
    let source = std::fs::read_to_string(path).map_err(RunFileError::Io)?;
    let module_name = module_name_for(path);
    run(&source, &module_name, output).map_err(RunFileError::Pipeline)
}

/// Maps a completed run to the process exit code per spec.md §6.1: the int
/// `main` returned, or 0 if it returned `Nil`/anything non-int.
pub fn exit_code_for(value: &Value) -> u8 {
    match value {
        Value::Int(code) => (*code as i32).rem_euclid(256) as u8,
        _ => 0,
    }
}
