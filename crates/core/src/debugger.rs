//! Interactive single-stepper hooked into the evaluator.
//!
//! Input/output are kept behind `BufRead`/`Write` trait objects rather than
//! hard-wired to real stdio, so the command loop can be driven from an
//! in-memory buffer in tests the same way the reference test suite redirects
//! `std::cin`/`std::cout`.

use std::io::{self, BufRead, Write};

use crate::ast::Node;
use crate::env::Env;
use crate::error::RuntimeError;
use crate::printer;
use crate::value::Value;

pub struct Debugger {
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
    /// Once set, further prompts are skipped for the remainder of the run.
    continuing: bool,
}

impl Debugger {
    pub fn new(input: Box<dyn BufRead>, output: Box<dyn Write>) -> Self {
        Debugger {
            input,
            output,
            continuing: false,
        }
    }

    pub fn stdio() -> Self {
        Debugger::new(Box::new(io::BufReader::new(io::stdin())), Box::new(io::stdout()))
    }

    /// Called by the evaluator immediately before visiting `node`.
    pub fn before_node(&mut self, step: u64, depth: u64, node: &Node, env: &Env<Value>) -> Result<(), RuntimeError> {
        let description = describe_node(node);
        self.writeln(&format!("[debug] step {step} depth {depth}: {description}"));
        self.print_scope_chain(env);

        while !self.continuing {
            self.writeln("[debug] > ");
            let mut line = String::new();
            let bytes_read = self.input.read_line(&mut line).unwrap_or(0);
            if bytes_read == 0 {
                tracing::warn!("debugger input reached EOF, continuing for the rest of the run");
                self.continuing = true;
                break;
            }
            let command = line.trim();
            match command {
                "" | "s" | "step" | "n" | "next" => break,
                "c" | "continue" => {
                    self.continuing = true;
                }
                "p" | "print" => {
                    self.print_scope_chain(env);
                }
                "h" | "help" => self.print_help(),
                "q" | "quit" => return Err(RuntimeError::DebuggerQuit),
                other if other.starts_with("p ") || other.starts_with("print ") => {
                    let name = other.splitn(2, ' ').nth(1).unwrap_or("").trim();
                    match env.get(name) {
                        Some(value) => self.writeln(&format!("[debug] {name} = {}", value.display())),
                        None => self.writeln(&format!("[debug] {name} is undefined")),
                    }
                }
                _ => self.writeln("[debug] unknown command, type 'h' for help"),
            }
        }
        Ok(())
    }

    fn print_scope_chain(&mut self, env: &Env<Value>) {
        let mut current = Some(env.clone());
        let mut scope_index = 0;
        while let Some(scope) = current {
            let mut names = scope.local_names();
            names.sort();
            let bindings: Vec<String> = names
                .iter()
                .filter_map(|name| scope.get(name).map(|v| format!("{name} = {}", v.display())))
                .collect();
            self.writeln(&format!("[debug] scope {scope_index}: {}", bindings.join(", ")));
            current = scope.parent();
            scope_index += 1;
        }
    }

    fn print_help(&mut self) {
        self.writeln("[debug] commands: s/step/n/next, c/continue, p/print [NAME], h/help, q/quit");
    }

    fn writeln(&mut self, line: &str) {
        let _ = writeln!(self.output, "{line}");
    }
}

/// First non-empty line of the node's pretty-printed form, used as the
/// step's one-line description.
fn describe_node(node: &Node) -> String {
    let rendered = printer::print_node(node);
    rendered
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;

    fn debugger_with_input(input: &str) -> Debugger {
        Debugger::new(Box::new(io::Cursor::new(input.as_bytes().to_vec())), Box::new(Vec::new()))
    }

    #[test]
    fn step_command_advances_without_raising() {
        let mut debugger = debugger_with_input("s\nc\n");
        let env = Env::<Value>::root();
        let node = make_int(1);
        assert!(debugger.before_node(1, 0, &node, &env).is_ok());
    }

    #[test]
    fn quit_command_raises_debugger_stopped() {
        let mut debugger = debugger_with_input("q\n");
        let env = Env::<Value>::root();
        let node = make_int(1);
        assert_eq!(
            debugger.before_node(1, 0, &node, &env),
            Err(RuntimeError::DebuggerQuit)
        );
    }

    #[test]
    fn eof_on_input_behaves_like_continue() {
        let mut debugger = debugger_with_input("");
        let env = Env::<Value>::root();
        let node = make_int(1);
        assert!(debugger.before_node(1, 0, &node, &env).is_ok());
        assert!(debugger.continuing);
    }

    #[test]
    fn print_name_resolves_binding_in_scope() {
        let mut debugger = debugger_with_input("p a\nc\n");
        let env = Env::<Value>::root();
        env.define("a", Value::Int(1));
        let node = make_int(1);
        assert!(debugger.before_node(1, 0, &node, &env).is_ok());
    }

    #[test]
    fn describe_node_takes_first_non_empty_line() {
        let node = make_binary_op(BinaryOp::Add, make_int(1), make_int(2));
        assert_eq!(describe_node(&node), "(1 + 2)");
    }
}
