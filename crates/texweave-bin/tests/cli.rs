use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn write_input(dir: &tempfile::TempDir, source: &str) -> PathBuf {
    let path = dir.path().join("input.tex");
    fs::write(&path, source).unwrap();
    path
}

#[test]
fn text_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, r"Hello world");
    let mut cmd = Command::cargo_bin("texweave").unwrap();
    cmd.arg(&input);
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("Completed list 1:\n"))
        .stdout(predicate::str::contains(r"\cmr10 H"));
}

#[test]
fn json_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, r"a\par b");
    let mut cmd = Command::cargo_bin("texweave").unwrap();
    cmd.args(["--backend", "json"]).arg(&input);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(r#""index":1"#))
        .stdout(predicate::str::contains(r#""index":2"#))
        .stdout(predicate::str::contains("cmr10"));
}

#[test]
fn output_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, r"$x+1$");
    let output = dir.path().join("out.txt");
    let mut cmd = Command::cargo_bin("texweave").unwrap();
    cmd.arg("-o").arg(&output).arg(&input);
    cmd.assert().success().stdout(predicate::str::is_empty());
    let written = fs::read_to_string(&output).unwrap();
    assert!(written.contains(r"\mathon"), "{written}");
}

#[test]
fn initex_skips_the_preamble() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, r"\kern 3pt");
    let mut cmd = Command::cargo_bin("texweave").unwrap();
    cmd.arg("--initex").arg(&input);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(r"\kern 3.0"));

    let input = write_input(&dir, r"\tenrm");
    let mut cmd = Command::cargo_bin("texweave").unwrap();
    cmd.arg("--initex").arg(&input);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains(r"undefined control sequence \tenrm"));
}

#[test]
fn missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("texweave").unwrap();
    cmd.arg(dir.path().join("missing.tex"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn undefined_control_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, r"a\undefined b");
    let mut cmd = Command::cargo_bin("texweave").unwrap();
    cmd.arg(&input);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains(r"undefined control sequence \undefined"));
}

#[test]
fn recoverable_errors_and_interaction_modes() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, r"\divide\count1 by 0 a");

    let mut cmd = Command::cargo_bin("texweave").unwrap();
    cmd.arg(&input);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("arithmetic overflow"));

    let log = dir.path().join("input.log");
    let mut cmd = Command::cargo_bin("texweave").unwrap();
    cmd.args(["--interaction", "batch", "--log-file"])
        .arg(&log)
        .arg(&input);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Completed list 1:"))
        .stderr(predicate::str::contains(
            "(1 recoverable error in batchmode)",
        ));
    let log = fs::read_to_string(&log).unwrap();
    assert!(log.contains("arithmetic overflow"), "{log}");
}

#[test]
fn interaction_mode_can_change_during_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, r"\nonstopmode\divide\count1 by 0 \divide\count1 by 0 a");
    let mut cmd = Command::cargo_bin("texweave").unwrap();
    cmd.arg(&input);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains(
            "(2 recoverable errors in nonstopmode)",
        ));
}

#[test]
fn config_directory() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, r"\kern 1pt");
    fs::write(dir.path().join("engine.json"), r#"{"backend": "json"}"#).unwrap();
    let mut cmd = Command::cargo_bin("texweave").unwrap();
    cmd.arg("--config-dir").arg(dir.path()).arg("--initex").arg(&input);
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with(r#"{"index":1"#));
}

#[test]
fn invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, r"a");
    fs::write(dir.path().join("engine.json"), r#"{"colour": "red"}"#).unwrap();
    let mut cmd = Command::cargo_bin("texweave").unwrap();
    cmd.arg("--config-dir").arg(dir.path()).arg(&input);
    cmd.assert().failure().stderr(predicate::str::contains("colour"));
}
