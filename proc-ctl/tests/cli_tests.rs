//! End-to-end tests for the procctl binary

use proc_rs::{Proc, StreamDirective};

const PROCCTL: &str = env!("CARGO_BIN_EXE_procctl");

fn procctl(args: &[&str]) -> (i32, String) {
    let mut child = Proc::run(std::iter::once(PROCCTL).chain(args.iter().copied()))
        .output(StreamDirective::Capture)
        .error(StreamDirective::Discard)
        .spawn()
        .unwrap();
    let stdout = child.output_pipe().unwrap().slurp().unwrap();
    (child.wait().unwrap().exit_code, stdout)
}

#[test]
fn exit_code_mirrors_child() {
    let (code, _) = procctl(&["shell", "exit 5"]);
    assert_eq!(code, 5);

    let (code, _) = procctl(&["run", "true"]);
    assert_eq!(code, 0);
}

#[test]
fn capture_prints_output() {
    let (code, stdout) = procctl(&["--capture", "run", "echo", "hi there"]);
    assert_eq!(code, 0);
    assert_eq!(stdout, "hi there\n");
}

#[test]
fn capture_preserves_missing_final_newline() {
    let (code, stdout) = procctl(&["--capture", "run", "printf", "abc"]);
    assert_eq!(code, 0);
    assert_eq!(stdout, "abc");
}

#[test]
fn json_report() {
    let (code, stdout) = procctl(&["--capture", "--json", "shell", "echo out; exit 2"]);
    assert_eq!(code, 2);

    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["exit_code"], 2);
    assert_eq!(report["signal"], serde_json::Value::Null);
    assert_eq!(report["stdout"], serde_json::json!(["out"]));
    assert_eq!(report["command"][0], "/bin/sh");
}

#[test]
fn pipeline_connects_stages() {
    let (code, stdout) = procctl(&["--capture", "pipeline", "printf 'b\\na\\n'", "sort"]);
    assert_eq!(code, 0);
    assert_eq!(stdout, "a\nb\n");
}

#[test]
fn spawn_error_exits_non_zero() {
    let (code, stdout) = procctl(&["run", "definitely_missing_cmd_xyz"]);
    assert_eq!(code, 1);
    assert!(stdout.is_empty());
}

#[test]
fn check_succeeds() {
    let (code, stdout) = procctl(&["check"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("[ok] Shell"));
}
