//! CLI smoke tests for the wayfare-server binary: help output,
//! configuration validation, and the print-config path.

use std::process::{Command, Stdio};
use tempfile::TempDir;

/// Helper to run the wayfare-server binary with given arguments
fn run_wayfare_server(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_wayfare-server"))
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute wayfare-server")
}

fn write_config(dir: &TempDir) -> std::path::PathBuf {
    let home_dir = dir.path().join("home");
    let config_path = dir.path().join("config.yaml");
    std::fs::write(
        &config_path,
        format!(
            r#"
server:
  home_dir: "{}"
  host: "127.0.0.1"
  port: 5050

data:
  dir: "{}"

logging:
  console_level: error
  file: ""
"#,
            home_dir.display(),
            dir.path().display()
        ),
    )
    .expect("Failed to write config");
    config_path
}

#[test]
fn test_cli_help_command() {
    let output = run_wayfare_server(&["--help"]);

    assert!(output.status.success(), "Help command should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("wayfare-server"),
        "Should contain binary name"
    );
    assert!(
        stdout.contains("Usage:") || stdout.contains("USAGE:"),
        "Should contain usage information"
    );
    assert!(stdout.contains("run"), "Should contain 'run' subcommand");
    assert!(
        stdout.contains("check"),
        "Should contain 'check' subcommand"
    );
    assert!(stdout.contains("--config"), "Should mention config option");
}

#[test]
fn test_cli_version_command() {
    let output = run_wayfare_server(&["--version"]);

    assert!(output.status.success(), "Version command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("0.1.0"), "Should contain version number");
}

#[test]
fn test_cli_check_command() {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(&tmp);
    // minimal dataset marker so check does not warn
    std::fs::write(tmp.path().join("options.txt"), "1500000000\n1\n").unwrap();

    let output = run_wayfare_server(&["--config", config_path.to_str().unwrap(), "check"]);

    assert!(output.status.success(), "Check command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Configuration check passed"));
    assert!(stdout.contains("port: 5050"));
}

#[test]
fn test_cli_print_config() {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(&tmp);

    let output = run_wayfare_server(&[
        "--config",
        config_path.to_str().unwrap(),
        "--print-config",
    ]);

    assert!(output.status.success(), "print-config should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("server:"));
    assert!(stdout.contains("data:"));
}

#[test]
fn test_cli_port_override_shows_in_config() {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(&tmp);

    let output = run_wayfare_server(&[
        "--config",
        config_path.to_str().unwrap(),
        "--port",
        "6060",
        "--print-config",
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("port: 6060"));
}
