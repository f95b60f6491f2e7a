use assert_cmd::Command;
use clap::Parser;
use merge_dispatch::cli::{Args, Command as CliCommand};
use merge_dispatch::logging::{detect_context, ExecutionContext};
use predicates::prelude::*;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn log_file_path(workspace: &Path) -> PathBuf {
    workspace
        .join(".merge-dispatch")
        .join("logs")
        .join("merge-dispatch.log")
}

fn parse(args: &[&str]) -> CliCommand {
    let mut argv = vec!["merge-dispatch"];
    argv.extend_from_slice(args);
    Args::parse_from(argv).command
}

fn clear_ci_env() {
    env::remove_var("CI");
    env::remove_var("GITHUB_ACTIONS");
}

#[test]
#[serial]
fn read_only_commands_map_to_read_only_context() {
    clear_ci_env();
    for args in [
        vec!["plan"],
        vec!["inputs"],
        vec!["artifacts", "list", "0b6c8a0e-3e5f-4f0a-9d7e-2b1c4d5e6f70"],
    ] {
        assert_eq!(
            detect_context(&parse(&args)),
            ExecutionContext::ReadOnly,
            "{:?}",
            args
        );
    }
}

#[test]
#[serial]
fn ci_environment_is_detected_for_dispatch() {
    clear_ci_env();
    assert_eq!(
        detect_context(&parse(&["dispatch"])),
        ExecutionContext::LocalDev
    );

    env::set_var("GITHUB_ACTIONS", "true");
    assert_eq!(detect_context(&parse(&["dispatch"])), ExecutionContext::Ci);
    assert_eq!(
        detect_context(&parse(&["artifacts", "clean"])),
        ExecutionContext::Ci
    );
    clear_ci_env();

    env::set_var("CI", "false");
    assert_eq!(
        detect_context(&parse(&["dispatch"])),
        ExecutionContext::LocalDev
    );
    clear_ci_env();
}

#[test]
fn context_flags() {
    assert!(ExecutionContext::LocalDev.uses_ansi());
    assert!(!ExecutionContext::Ci.uses_ansi());
    assert!(ExecutionContext::Ci.writes_log_file());
    assert!(!ExecutionContext::ReadOnly.writes_log_file());
}

#[cfg(unix)]
#[test]
fn dispatch_writes_console_and_file() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let workspace = temp_dir.path();
    fs::write(workspace.join("merge_macros.py"), "exit 0\n").expect("failed to write script");

    let mut cmd = Command::cargo_bin("merge-dispatch").expect("failed to build binary");
    cmd.arg("--workspace")
        .arg(workspace)
        .args(["dispatch", "--interpreter", "sh"])
        .env("CI", "true")
        .env_remove("RUST_LOG");
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("job finished"))
        .stderr(predicate::str::contains("\u{1b}[").not());

    let contents = fs::read_to_string(log_file_path(workspace)).expect("failed to read log file");
    assert!(contents.contains("starting merge script"));
    assert!(contents.contains("upload step failed"));
    assert!(contents.contains("run_id"));
}

#[test]
fn plan_does_not_create_log_file() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let workspace = temp_dir.path();

    let mut cmd = Command::cargo_bin("merge-dispatch").expect("failed to build binary");
    cmd.arg("--workspace").arg(workspace).arg("plan");
    cmd.assert().success();

    assert!(!log_file_path(workspace).exists());
}

#[test]
fn logging_table_controls_console_sink() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let workspace = temp_dir.path();
    fs::write(
        workspace.join("merge-dispatch.toml"),
        "[logging]\nconsole_output = \"none\"\n",
    )
    .expect("failed to write config");

    let mut cmd = Command::cargo_bin("merge-dispatch").expect("failed to build binary");
    cmd.arg("--workspace")
        .arg(workspace)
        .args(["plan", "--force", "maybe"])
        .env_remove("RUST_LOG");
    cmd.assert().success().stderr(predicate::str::is_empty());
}
