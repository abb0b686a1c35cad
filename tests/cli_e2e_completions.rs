//! End-to-end tests for the `tsbuild completions` command.
//!
//! These tests verify the CLI behavior of the `completions` command by invoking
//! the binary directly and checking its output.

#[allow(dead_code)]
mod common;
use common::prelude::*;

#[test]
fn test_completions_help() {
    let mut cmd = cargo_bin_cmd!("tsbuild");
    cmd.arg("completions")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Generate shell completion scripts",
        ))
        .stdout(predicate::str::contains("bash"))
        .stdout(predicate::str::contains("zsh"))
        .stdout(predicate::str::contains("fish"))
        .stdout(predicate::str::contains("powershell"))
        .stdout(predicate::str::contains("elvish"));
}

#[test]
fn test_completions_bash() {
    let mut cmd = cargo_bin_cmd!("tsbuild");
    cmd.arg("completions")
        .arg("bash")
        .assert()
        .success()
        // Bash completions should contain the completion function
        .stdout(predicate::str::contains("_tsbuild()"))
        // And should reference our subcommands
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("graph"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn test_completions_zsh() {
    let mut cmd = cargo_bin_cmd!("tsbuild");
    cmd.arg("completions")
        .arg("zsh")
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef tsbuild"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_completions_fish() {
    let mut cmd = cargo_bin_cmd!("tsbuild");
    cmd.arg("completions")
        .arg("fish")
        .assert()
        .success()
        .stdout(predicate::str::contains("complete -c tsbuild"))
        .stdout(predicate::str::contains("graph"));
}

#[test]
fn test_completions_powershell() {
    let mut cmd = cargo_bin_cmd!("tsbuild");
    cmd.arg("completions")
        .arg("powershell")
        .assert()
        .success()
        // PowerShell uses Register-ArgumentCompleter
        .stdout(predicate::str::contains("Register-ArgumentCompleter"))
        .stdout(predicate::str::contains("tsbuild"));
}

#[test]
fn test_completions_invalid_shell() {
    let mut cmd = cargo_bin_cmd!("tsbuild");
    cmd.arg("completions")
        .arg("invalid-shell")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_completions_missing_shell_argument() {
    let mut cmd = cargo_bin_cmd!("tsbuild");
    cmd.arg("completions")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}
