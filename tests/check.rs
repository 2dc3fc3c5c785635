use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};

fn codecheck(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_codecheck"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, body) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

#[test]
fn check_prints_style_summary() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.py"), "x=1\n").unwrap();

    let output = codecheck(dir.path(), &["check", "main.py", "--no-suggestions"]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "Found 1 PEP8 issues:\n1       E225 missing whitespace around operator\n"
    );
}

#[test]
fn check_compliant_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ok.py"), "x = 1\n").unwrap();

    let output = codecheck(dir.path(), &["check", "ok.py", "--no-suggestions"]);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "Code is PEP8 compliant!\n");
}

#[test]
fn check_archive_lists_every_entry() {
    let dir = tempfile::tempdir().unwrap();
    write_zip(
        &dir.path().join("project.zip"),
        &[("a.py", "x = 1\n"), ("setup.cfg", "[metadata]\n")],
    );

    let output = codecheck(dir.path(), &["check", "project.zip", "--no-suggestions"]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("File: a.py\nCode is PEP8 compliant!\n\n"));
    assert!(stdout.contains("File: setup.cfg is not a Python file and was skipped.\n"));
}

#[test]
fn check_writes_report_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.py"), "import os, sys\n").unwrap();

    let output = codecheck(
        dir.path(),
        &["check", "main.py", "--no-suggestions", "--output", "report.txt"],
    );

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    let report = std::fs::read_to_string(dir.path().join("report.txt")).unwrap();
    assert_eq!(
        report,
        "Found 1 PEP8 issues:\n1       E401 multiple imports on one line"
    );
}

#[test]
fn check_json_output() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.py"), "x = 1\n").unwrap();

    let output = codecheck(
        dir.path(),
        &["check", "main.py", "--no-suggestions", "--format", "json"],
    );

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["fileName"], "report.txt");
    assert_eq!(json["content"], "Code is PEP8 compliant!");
}

#[test]
fn check_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();

    let output = codecheck(dir.path(), &["check", "nope.py", "--no-suggestions"]);

    assert!(!output.status.success());
}

#[test]
fn check_honours_config_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".codecheck.toml"), "[lint]\nignore = [\"E225\"]\n").unwrap();
    std::fs::write(dir.path().join("main.py"), "x=1\n").unwrap();

    let output = codecheck(dir.path(), &["check", "main.py", "--no-suggestions"]);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "Code is PEP8 compliant!\n");
}
