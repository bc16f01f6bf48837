//! CLI-level smoke tests, in the style of the pack's `assert_cmd` usage.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_mentions_the_pipeline() {
    Command::cargo_bin("goesvfi")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Interpolate and encode"));
}

#[test]
fn missing_input_dir_argument_is_a_usage_error() {
    Command::cargo_bin("goesvfi")
        .unwrap()
        .assert()
        .failure();
}

#[test]
fn unknown_encoder_is_rejected_before_any_subprocess_spawns() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("goesvfi")
        .unwrap()
        .args([
            dir.path().to_str().unwrap(),
            dir.path().join("out.mp4").to_str().unwrap(),
            "--encoder",
            "not-a-real-codec",
        ])
        .assert()
        .failure();
}
