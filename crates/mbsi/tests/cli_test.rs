//! Integration tests for the `mbsi` CLI binary.
//!
//! These tests validate argument parsing, help output, shell completions,
//! and config handling — all without requiring a live portal.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `mbsi` binary with env isolation.
///
/// Clears all `MBSI_*` env vars and points config directories at a
/// temp path so tests never touch the user's real configuration.
fn mbsi_cmd(home: &std::path::Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("mbsi");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("MBSI_PORTAL")
        .env_remove("MBSI_OUTPUT")
        .env_remove("MBSI_TIMEOUT")
        .env_remove("MBSI_PASSWORD");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn no_args_shows_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = mbsi_cmd(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn help_lists_the_command_tree() {
    let dir = tempfile::tempdir().unwrap();
    mbsi_cmd(dir.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("login")
            .and(predicate::str::contains("stats"))
            .and(predicate::str::contains("coins"))
            .and(predicate::str::contains("profile")),
    );
}

#[test]
fn version_flag() {
    let dir = tempfile::tempdir().unwrap();
    mbsi_cmd(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mbsi"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn completions_bash() {
    let dir = tempfile::tempdir().unwrap();
    mbsi_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn completions_zsh() {
    let dir = tempfile::tempdir().unwrap();
    mbsi_cmd(dir.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mbsi"));
}

// ── Config commands ─────────────────────────────────────────────────

#[test]
fn config_path_prints_a_location() {
    let dir = tempfile::tempdir().unwrap();
    mbsi_cmd(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn config_show_includes_defaults() {
    let dir = tempfile::tempdir().unwrap();
    mbsi_cmd(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("portal")
                .and(predicate::str::contains("output"))
                .and(predicate::str::contains("token_backend")),
        );
}

#[test]
fn config_set_rejects_unknown_keys() {
    let dir = tempfile::tempdir().unwrap();
    let output = mbsi_cmd(dir.path())
        .args(["config", "set", "bogus.key", "1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("unknown config key"));
}

#[test]
fn config_set_rejects_invalid_portal_url() {
    let dir = tempfile::tempdir().unwrap();
    let output = mbsi_cmd(dir.path())
        .args(["config", "set", "portal", "not a url"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("invalid URL"));
}

#[test]
fn config_set_round_trips_through_show() {
    let dir = tempfile::tempdir().unwrap();
    mbsi_cmd(dir.path())
        .args(["config", "set", "defaults.page_size", "25"])
        .assert()
        .success();
    mbsi_cmd(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("page_size = 25"));
}

// ── Argument validation ─────────────────────────────────────────────

#[test]
fn unknown_subcommand_fails() {
    let dir = tempfile::tempdir().unwrap();
    mbsi_cmd(dir.path()).arg("frobnicate").assert().failure();
}

#[test]
fn profile_edit_requires_a_change() {
    // Fails before any network traffic: no flags means nothing to do.
    let dir = tempfile::tempdir().unwrap();
    let output = mbsi_cmd(dir.path())
        .args(["profile", "edit"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("nothing to change"));
}
