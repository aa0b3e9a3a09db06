//! Human-mode end-to-end tests.

use assert_cmd::Command;
use predicates::prelude::*;

use crate::common::cli::CliRunner;
use crate::common::fixtures::Workspace;

fn adaptcap() -> Command {
    let mut cmd = Command::cargo_bin("adaptcap").unwrap();
    cmd.env_remove("ADAPTCAP_CONFIG")
        .env_remove("ADAPTCAP_FORMAT")
        .env("XDG_CONFIG_HOME", "/nonexistent/adaptcap-test-config")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn quick_start_lists_commands() {
    adaptcap()
        .assert()
        .success()
        .stdout(predicate::str::contains("adaptcap capture"))
        .stdout(predicate::str::contains("--robot"));
}

#[test]
fn help_mentions_subcommands() {
    adaptcap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("capture"))
        .stdout(predicate::str::contains("read-metadata"));
}

#[test]
fn plan_text_shows_settings() {
    adaptcap()
        .args(["plan", "--hour", "18", "--brightness", "200"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dusk"))
        .stdout(predicate::str::contains("bright"))
        .stdout(predicate::str::contains("exposure=4000us"));
}

#[test]
fn manual_flags_must_come_together() {
    adaptcap()
        .args(["capture", "--exposure", "1000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--iso"));
}

#[test]
fn invalid_override_exits_with_config_code() {
    let ws = Workspace::new();
    adaptcap()
        .args(["capture", "--quality", "0", "--output-dir"])
        .arg(ws.output_dir())
        .assert()
        .code(78)
        .stderr(predicate::str::contains("[ERR]"))
        .stderr(predicate::str::contains("quality"));
}

#[test]
fn missing_config_file_suggests_fix() {
    adaptcap()
        .args(["--config", "/nonexistent/adaptcap.toml", "backends"])
        .assert()
        .code(78)
        .stderr(predicate::str::contains("ADAPTCAP_CONFIG"));
}

#[test]
fn backends_text_marks_missing_tools() {
    let ws = Workspace::new();
    std::fs::create_dir_all(ws.bin_dir()).unwrap();
    CliRunner::new()
        .with_env("PATH", ws.bin_dir().to_str().unwrap())
        .with_env("NO_COLOR", "1")
        .run(&["backends"])
        .assert_success()
        .assert_stdout_matches(r"1\. rpicam-still\s+missing")
        .assert_stdout_contains("3. raspistill");
}

#[test]
fn completions_generate_for_bash() {
    adaptcap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("adaptcap"));
}
