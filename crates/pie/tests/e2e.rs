//! End-to-end scenarios from the language contract: each literal source
//! fragment and its expected stdout / exit code, driven in one process
//! through `pie::run` rather than by shelling out to the built binary.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use pie::PipelineError;

fn run_captured(source: &str) -> (Result<pie_core::Value, PipelineError>, String) {
    let captured: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
    let sink: Rc<RefCell<dyn Write>> = captured.clone();
    let outcome = pie::run(source, "scenario", sink);
    let text = String::from_utf8(captured.borrow().clone()).expect("valid utf8 output");
    (outcome, text)
}

#[test]
fn scenario_1_compound_assign_returns_the_updated_value() {
    let (result, _) = run_captured("fn main() : int { let a: int = 1; a += 2; return a; }");
    let value = result.expect("well-typed program should evaluate");
    assert_eq!(pie::exit_code_for(&value), 3);
}

#[test]
fn scenario_2_if_else_picks_the_true_branch() {
    let (result, _) = run_captured("fn main() : int { if (1 < 2) { return 7; } else { return 9; } }");
    let value = result.expect("well-typed program should evaluate");
    assert_eq!(pie::exit_code_for(&value), 7);
}

#[test]
fn scenario_3_string_plus_int_concatenates_and_prints() {
    let (result, stdout) = run_captured(
        r#"fn main() : int { let s: string = "hi " + 5; print(s); return 0; }"#,
    );
    let value = result.expect("well-typed program should evaluate");
    assert_eq!(stdout, "hi 5\n");
    assert_eq!(pie::exit_code_for(&value), 0);
}

#[test]
fn scenario_4_let_type_mismatch_fails_the_checker() {
    let (result, _) = run_captured(r#"fn main() : int { let x: int = "hello"; return 0; }"#);
    match result {
        Err(PipelineError::Type(errors)) => {
            assert!(errors.iter().any(|e| e.message.contains("initialise")));
        }
        other => panic!("expected a type-check failure, got {other:?}"),
    }
}

#[test]
fn scenario_5_struct_field_access_sums_to_seven() {
    let (result, _) = run_captured(
        "struct Point { x: int, y: int } \
         fn main() : int { let p: Point = Point { x: 3, y: 4 }; return p.x + p.y; }",
    );
    let value = result.expect("well-typed program should evaluate");
    assert_eq!(pie::exit_code_for(&value), 7);
}

#[test]
fn scenario_6_arity_mismatch_reports_expects() {
    let (result, _) = run_captured(
        "fn add(x: int, y: int) : int { return x; } \
         fn main() : int { return add(1); }",
    );
    match result {
        Err(PipelineError::Type(errors)) => {
            assert!(errors.iter().any(|e| e.message.contains("expects")));
        }
        other => panic!("expected a type-check failure, got {other:?}"),
    }
}

#[test]
fn division_by_zero_is_a_runtime_error_regardless_of_operand_kind() {
    let (result, _) = run_captured("fn main() : int { return 1 / 0; }");
    match result {
        Err(PipelineError::Runtime(err)) => assert_eq!(err.to_string(), "Division by zero"),
        other => panic!("expected a runtime error, got {other:?}"),
    }
}

#[test]
fn print_mode_does_not_run_the_type_checker() {
    // Ill-typed, but `print_ast` only parses — it must still succeed.
    let rendered = pie::print_ast(r#"fn main() : int { let x: int = "hello"; return 0; }"#, "scenario")
        .expect("print mode only parses, it does not type-check");
    assert!(rendered.contains("module scenario"));
    assert!(rendered.contains("let x: int"));
}

#[test]
fn unterminated_string_is_a_parse_error_with_a_line_number() {
    let err = pie::parse_module("fn main() : int { let s: string = \"oops; return 0; }", "scenario")
        .unwrap_err();
    assert_eq!(err.line, 0);
}

#[test]
fn run_file_reads_a_real_pie_file_from_disk_and_derives_its_module_name() {
    use tempfile::tempdir;

    let temp = tempdir().unwrap();
    let source_path = temp.path().join("greeter.pie");
    std::fs::write(&source_path, "fn main() : int { print(\"hi\"); return 0; }").unwrap();

    let captured: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
    let sink: Rc<RefCell<dyn Write>> = captured.clone();
    let value = pie::run_file(&source_path, sink).expect("well-typed file should evaluate");

    assert_eq!(pie::exit_code_for(&value), 0);
    assert_eq!(String::from_utf8(captured.borrow().clone()).unwrap(), "hi\n");
    assert_eq!(pie::module_name_for(&source_path), "greeter");
}

#[test]
fn run_file_surfaces_io_errors_for_a_missing_path() {
    use tempfile::tempdir;

    let temp = tempdir().unwrap();
    let missing = temp.path().join("does-not-exist.pie");

    let captured: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
    let sink: Rc<RefCell<dyn Write>> = captured.clone();
    match pie::run_file(&missing, sink) {
        Err(pie::RunFileError::Io(_)) => {}
        other => panic!("expected an IO error for a missing file, got {other:?}"),
    }
}
