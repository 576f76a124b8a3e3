//! Tests for the `scaffold` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn scaffold(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_scaffold"))
        .current_dir(dir)
        .env("RUST_LOG", "off")
        .args(args)
        .output()
        .expect("Failed to execute scaffold")
}

fn json_diagnostics(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stderr)
        .lines()
        .filter(|line| line.starts_with('{'))
        .map(|line| serde_json::from_str(line).expect("diagnostic line is JSON"))
        .collect()
}

#[test]
fn build_writes_stylesheet_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("site.css"), ".a { .b { color: red; } }").unwrap();

    let output = scaffold(dir.path(), &["build", "--minify", "site.css"]);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), ".a .b{color:red}");
}

#[test]
fn build_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.css"), ".a { x: 1 }").unwrap();
    fs::write(dir.path().join("b.css"), ".b { y: 2 }").unwrap();

    let output = scaffold(
        dir.path(),
        &["build", "--minify", "-o", "out.css", "a.css", "b.css"],
    );

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    let written = fs::read_to_string(dir.path().join("out.css")).unwrap();
    assert_eq!(written, ".a{x:1}.b{y:2}");
}

#[test]
fn build_activates_flags() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("site.css"),
        ".a { @flag(legacy) { zoom: 1; } color: red; }",
    )
    .unwrap();

    let with_flag = scaffold(
        dir.path(),
        &["build", "--minify", "--flag", "legacy", "site.css"],
    );
    assert_eq!(String::from_utf8_lossy(&with_flag.stdout), ".a{zoom:1;color:red}");

    let without = scaffold(dir.path(), &["build", "--minify", "site.css"]);
    assert_eq!(String::from_utf8_lossy(&without.stdout), ".a{color:red}");
}

#[test]
fn failed_document_sets_exit_code_and_reports_json() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("good.css"), ".a { x: 1 }").unwrap();
    fs::write(dir.path().join("bad.css"), ".c { y: $missing; }").unwrap();

    let output = scaffold(
        dir.path(),
        &["build", "--minify", "--json", "good.css", "bad.css"],
    );

    assert!(!output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), ".a{x:1}");

    let diagnostics = json_diagnostics(&output);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["code"], "S-2-1");
    assert_eq!(diagnostics[0]["level"], 0);
}

#[test]
fn check_produces_no_output() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("site.css"), ".a { color: red; }").unwrap();

    let output = scaffold(dir.path(), &["check", "site.css"]);

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn check_honors_error_threshold() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("site.css"), ".a { color: red; +nope; }").unwrap();

    let relaxed = scaffold(dir.path(), &["check", "site.css"]);
    assert!(relaxed.status.success());

    let strict = scaffold(
        dir.path(),
        &["check", "--json", "--error-threshold", "2", "site.css"],
    );
    assert!(!strict.status.success());
    assert_eq!(json_diagnostics(&strict)[0]["code"], "S-3-2");
}

#[test]
fn config_file_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("scaffold.yml"),
        "constants:\n  global:\n    accent: \"#0a0\"\nformatter:\n  compress: true\n",
    )
    .unwrap();
    fs::write(dir.path().join("site.css"), ".a { color: $accent; }").unwrap();

    let output = scaffold(dir.path(), &["build", "-c", "scaffold.yml", "site.css"]);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), ".a{color:#0a0}");
}

#[test]
fn invalid_threshold_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("site.css"), ".a { color: red; }").unwrap();

    let output = scaffold(dir.path(), &["check", "--error-threshold", "7", "site.css"]);

    assert!(!output.status.success());
}
