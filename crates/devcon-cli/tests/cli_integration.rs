//! CLI integration tests for `devcon eval`, `devcon repl` and `devcon parse`.
//!
//! These tests invoke the compiled binary to verify end-to-end behavior.

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn devcon_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_devcon"))
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn run_repl(args: &[&str], input: &str) -> Output {
    let mut child = devcon_bin()
        .arg("repl")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn repl");
    child
        .stdin
        .take()
        .expect("piped stdin")
        .write_all(input.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("wait for repl")
}

#[test]
fn cli_eval_file() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let file = dir.path().join("script.dc");
    std::fs::write(
        &file,
        r#"
        square = (x) { x * x; };
        forEach(Range(1, 3), (i) { print(square(i)); });
        "done";
        "#,
    )
    .expect("write source");

    let output = devcon_bin()
        .args(["eval", file.to_str().unwrap()])
        .output()
        .expect("run binary");

    assert!(
        output.status.success(),
        "devcon eval should succeed, stderr: {}",
        stderr_of(&output)
    );
    let stdout = stdout_of(&output);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec!["1", "4", "9", "done"]);
}

#[test]
fn cli_eval_expr_sees_player() {
    let output = devcon_bin()
        .args(["eval", "--expr", "player.damage(25); player.health;"])
        .output()
        .expect("run binary");

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert_eq!(stdout_of(&output).trim(), "75");
}

#[test]
fn cli_eval_null_result_prints_nothing() {
    let output = devcon_bin()
        .args(["eval", "--expr", "x = null;"])
        .output()
        .expect("run binary");

    assert!(output.status.success());
    assert!(stdout_of(&output).is_empty());
}

#[test]
fn cli_eval_failure_exits_nonzero() {
    let output = devcon_bin()
        .args(["eval", "--expr", "missing + 1;"])
        .output()
        .expect("run binary");

    assert!(!output.status.success(), "unbound name should fail");
    assert!(
        stderr_of(&output).contains("UnboundNameError"),
        "stderr should name the error kind: {}",
        stderr_of(&output)
    );
}

#[test]
fn cli_eval_syntax_error_exits_nonzero() {
    let output = devcon_bin()
        .args(["eval", "--expr", "x = (1 + ;"])
        .output()
        .expect("run binary");

    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("syntax error"));
}

#[test]
fn cli_eval_with_trace() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let trace = dir.path().join("trace.jsonl");

    let output = devcon_bin()
        .args([
            "eval",
            "--expr",
            ".std.Math.max(2, 9); .game.Vec2(3, 4).length();",
            "--trace",
            trace.to_str().unwrap(),
        ])
        .output()
        .expect("run binary");

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert_eq!(stdout_of(&output).trim(), "5.0");
    assert!(stderr_of(&output).contains("Trace written to"));

    let content = std::fs::read_to_string(&trace).expect("read trace");
    let records: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).expect("trace line is JSON"))
        .collect();

    assert_eq!(records.first().unwrap()["record"], "header");
    assert_eq!(records.first().unwrap()["schema_version"], "1");
    let footer = records.last().unwrap();
    assert_eq!(footer["record"], "footer");
    assert_eq!(footer["program_status"], "success");

    // `player` is spawned outside the trace
    let members: Vec<&str> = records
        .iter()
        .filter(|r| r["record"] == "invoke")
        .map(|r| r["member"].as_str().unwrap())
        .collect();
    assert_eq!(members, vec!["max", "new", "length"]);
    assert_eq!(footer["invoke_count"], 3);
}

#[test]
fn cli_eval_failed_program_marks_trace() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let trace = dir.path().join("trace.jsonl");

    let output = devcon_bin()
        .args([
            "eval",
            "--expr",
            ".std.Math.sqrt(-4);",
            "--trace",
            trace.to_str().unwrap(),
        ])
        .output()
        .expect("run binary");

    assert!(!output.status.success());
    let content = std::fs::read_to_string(&trace).expect("read trace");
    let footer: serde_json::Value =
        serde_json::from_str(content.lines().last().unwrap()).expect("footer JSON");
    assert_eq!(footer["program_status"], "error");
}

#[test]
fn cli_max_call_depth_flag() {
    let src = "down = (n) { ifElse(n == 0, () { 0; }, () { down(n - 1); }); }; down(30);";

    let shallow = devcon_bin()
        .args(["--max-call-depth", "10", "eval", "--expr", src])
        .output()
        .expect("run binary");
    assert!(!shallow.status.success());
    assert!(stderr_of(&shallow).contains("CallDepthError"));

    let deep = devcon_bin()
        .args(["eval", "--expr", src])
        .output()
        .expect("run binary");
    assert!(deep.status.success(), "stderr: {}", stderr_of(&deep));
    assert_eq!(stdout_of(&deep).trim(), "0");
}

#[test]
fn cli_config_file() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let config = dir.path().join("devcon.json");
    std::fs::write(&config, r#"{ "max_source_size": 16 }"#).expect("write config");
    let file = dir.path().join("long.dc");
    std::fs::write(&file, "x = \"this source is longer than sixteen bytes\";").expect("write source");

    let output = devcon_bin()
        .args(["--config", config.to_str().unwrap(), "eval", file.to_str().unwrap()])
        .output()
        .expect("run binary");
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("limit is 16"));
}

#[test]
fn cli_config_rejects_unknown_keys() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let config = dir.path().join("devcon.json");
    std::fs::write(&config, r#"{ "max_depth": 3 }"#).expect("write config");

    let output = devcon_bin()
        .args(["--config", config.to_str().unwrap(), "eval", "--expr", "1;"])
        .output()
        .expect("run binary");
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("parsing config"));
}

#[test]
fn cli_parse_json() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let file = dir.path().join("prog.dc");
    std::fs::write(&file, "f = (a) { a + 1; }; f(2);").expect("write source");

    let output = devcon_bin()
        .args(["parse", file.to_str().unwrap(), "--format", "json"])
        .output()
        .expect("run binary");

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let ast: serde_json::Value = serde_json::from_slice(&output.stdout).expect("AST is JSON");
    assert_eq!(ast["stmts"].as_array().map(Vec::len), Some(2));
}

#[test]
fn cli_parse_reports_syntax_errors() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let file = dir.path().join("bad.dc");
    std::fs::write(&file, "f = (a { a; };").expect("write source");

    let output = devcon_bin()
        .args(["parse", file.to_str().unwrap()])
        .output()
        .expect("run binary");
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("bad.dc"));
}

#[test]
fn cli_repl_reads_stdin() {
    let output = run_repl(&[], "x = 2\n\nx * 21;\nnope;\nprint(\"hi\");\n");

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let stdout = stdout_of(&output);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "2");
    assert_eq!(lines[1], "42");
    assert!(lines[2].starts_with("error: UnboundNameError"), "{}", lines[2]);
    assert_eq!(lines[3], "hi");
}

#[test]
fn cli_repl_piped_input_has_no_prompt_and_allows_comments() {
    let output = run_repl(&[], "x = 5 // five\n// nothing\nx + 1; // six\n");

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert_eq!(stdout_of(&output), "5\n6\n");
}

#[test]
fn cli_repl_with_globals_file() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let globals = dir.path().join("globals.json");
    std::fs::write(
        &globals,
        r#"{ "level": 3, "big": 5000000000, "name": "arena", "spawns": [1, 2.5] }"#,
    )
    .expect("write globals");

    let output = run_repl(
        &["--globals", globals.to_str().unwrap()],
        "typeOf(big);\nname + level;\nlen(spawns);\n",
    );

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let stdout = stdout_of(&output);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec!["\"long\"", "\"arena3\"", "2"]);
}
