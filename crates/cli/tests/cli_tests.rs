//! escpos-usb command-line tests
//!
//! Runs the built binary for paths that never reach the USB stack.
//!
//! Run with: `cargo test -p cli --test cli_tests`

use std::fs;
use std::process::Command;

const MINIMAL_CONFIG: &str = r#"
[general]
log_level = "warn"
"#;

fn escpos_usb() -> Command {
    Command::new(env!("CARGO_BIN_EXE_escpos-usb"))
}

#[test]
fn test_help_lists_subcommands() {
    let output = escpos_usb().arg("--help").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("list"));
    assert!(stdout.contains("send"));
    assert!(stdout.contains("read"));
}

#[test]
fn test_version() {
    let output = escpos_usb().arg("--version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_invalid_device_filter_fails_before_usb() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, MINIMAL_CONFIG).unwrap();

    let output = escpos_usb()
        .arg("--config")
        .arg(&path)
        .args(["--device", "not-a-filter", "list"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid device filter"));
}

#[test]
fn test_invalid_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[general]\nlog_level = \"loud\"\n").unwrap();

    let output = escpos_usb()
        .arg("--config")
        .arg(&path)
        .arg("list")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to load configuration"));
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();

    let output = escpos_usb()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("list")
        .output()
        .unwrap();

    assert!(!output.status.success());
}
