//! Pie CLI driver.
//!
//! This binary is the only layer allowed to call `std::process::exit`
//! (transitively, through `ExitCode`).

use std::cell::RefCell;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;
use pie::{PipelineError, RunFileError};

#[derive(Parser)]
#[command(name = "pie")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Lexer, parser, checker, and evaluator for the Pie language", long_about = None)]
struct Cli {
    /// Emit the pretty-printed AST to stdout; do not type-check or execute.
    #[arg(long)]
    print: bool,

    /// Path to a .pie source file.
    file: PathBuf,
}

/// clap's own usage-error exit code (2) collides with Pie source parse
/// failures reserving exit 2 for themselves (spec.md §6.1), so usage errors
/// are remapped to 1 here; `--help`/`--version` still exit 0.
fn parse_cli() -> Result<Cli, u8> {
    match Cli::try_parse() {
        Ok(cli) => Ok(cli),
        Err(err) => {
            let _ = err.print();
            Err(if err.exit_code() == 0 { 0 } else { 1 })
        }
    }
}

fn run() -> u8 {
    let cli = match parse_cli() {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    if cli.print {
        tracing::debug!(file = ?cli.file, "reading source file for --print");
        let source = match std::fs::read_to_string(&cli.file) {
            Ok(source) => source,
            Err(err) => {
                tracing::error!(file = ?cli.file, error = %err, "failed to open input file");
                eprintln!("Failed to open file: {} ({err})", cli.file.display());
                return 1;
            }
        };
        let module_name = pie::module_name_for(&cli.file);
        return match pie::print_ast(&source, &module_name) {
            Ok(rendered) => {
                print!("{rendered}");
                0
            }
            Err(err) => {
                tracing::error!(error = %err, "parse failed");
                eprintln!("Failed to parse: {}", cli.file.display());
                eprintln!("{err}");
                2
            }
        };
    }

    tracing::debug!(file = ?cli.file, "running module");
    let stdout: Rc<RefCell<dyn io::Write>> = Rc::new(RefCell::new(io::stdout()));
    match pie::run_file(&cli.file, stdout) {
        Ok(value) => pie::exit_code_for(&value),
        Err(RunFileError::Io(err)) => {
            tracing::error!(file = ?cli.file, error = %err, "failed to open input file");
            eprintln!("Failed to open file: {} ({err})", cli.file.display());
            1
        }
        Err(RunFileError::Pipeline(PipelineError::Parse(err))) => {
            tracing::error!(error = %err, "parse failed");
            eprintln!("Failed to parse: {}", cli.file.display());
            eprintln!("{err}");
            2
        }
        Err(RunFileError::Pipeline(PipelineError::Type(errors))) => {
            tracing::error!(count = errors.len(), "type check failed");
            for error in &errors {
                eprintln!("Type error: {}", error.message);
            }
            2
        }
        Err(RunFileError::Pipeline(PipelineError::Runtime(err))) => {
            tracing::error!(error = %err, "uncaught runtime error");
            eprintln!("Runtime error: {err}");
            3
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    ExitCode::from(run())
}
