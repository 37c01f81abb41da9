//! Integration tests for the upkeep CLI

use std::path::Path;
use std::process::Command;

const FIXTURE: &str = r#"
[[packages]]
name = "acme-daemon"
installed = "1.0"
available = "1.1"
summary = "Acme background service"

[[packages]]
name = "acme-cli"
installed = "2.0"

[[repositories]]
id = "http://repo.example.org/ stable/main"
"#;

const CONFIG: &str = r#"
[general]
distro_codename = "bookworm"

[repositories]
namespace = "repo.example.org/"
channels = [
    { role = "testing", pattern = "landing", description = "Testing", source = "deb http://repo.example.org/landing {codename} main" },
]
"#;

fn write_inputs(dir: &Path) -> (String, String) {
    let fixture = dir.join("host.toml");
    let config = dir.join("config.toml");
    std::fs::write(&fixture, FIXTURE).unwrap();
    std::fs::write(&config, CONFIG).unwrap();
    (
        fixture.display().to_string(),
        config.display().to_string(),
    )
}

fn upkeep_json(args: &[&str]) -> serde_json::Value {
    let dir = tempfile::tempdir().unwrap();
    let (fixture, config) = write_inputs(dir.path());

    let output = Command::new(env!("CARGO_BIN_EXE_upkeep"))
        .args(["--json", "--fixture", &fixture, "--config", &config])
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute upkeep");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

fn find<'a>(items: &'a serde_json::Value, key: &str, value: &str) -> Option<&'a serde_json::Value> {
    items
        .as_array()
        .unwrap()
        .iter()
        .find(|item| item[key] == value)
}

#[test]
fn test_cli_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_upkeep"))
        .arg("--version")
        .output()
        .expect("Failed to execute upkeep");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("upkeep"));
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_upkeep"))
        .arg("--help")
        .output()
        .expect("Failed to execute upkeep");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("list"));
    assert!(stdout.contains("update"));
    assert!(stdout.contains("enable-repo"));
}

#[test]
fn test_cli_invalid_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_upkeep"))
        .arg("invalid-command")
        .output()
        .expect("Failed to execute upkeep");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unrecognized subcommand"));
}

#[test]
fn test_remove_requires_packages() {
    let output = Command::new(env!("CARGO_BIN_EXE_upkeep"))
        .arg("remove")
        .output()
        .expect("Failed to execute upkeep");

    assert!(!output.status.success());
}

#[test]
fn test_list_json() {
    let value = upkeep_json(&["list"]);
    assert_eq!(value["type"], "packages");

    let daemon = find(&value["data"], "name", "acme-daemon").unwrap();
    assert_eq!(daemon["installed_version"], "1.0");
    assert_eq!(daemon["candidate_version"], "1.1");
    assert_eq!(daemon["update_available"], true);

    let updates = upkeep_json(&["list", "--updates"]);
    assert_eq!(updates["data"].as_array().unwrap().len(), 1);
}

#[test]
fn test_update_json() {
    let value = upkeep_json(&["update", "acme-daemon"]);
    let daemon = find(&value["data"], "name", "acme-daemon").unwrap();
    assert_eq!(daemon["installed_version"], "1.1");
    assert_eq!(daemon["update_available"], false);
}

#[test]
fn test_repos_json_has_placeholder() {
    let value = upkeep_json(&["repos"]);
    assert_eq!(value["type"], "repositories");

    let placeholder = find(&value["data"], "id", "virtual_testing").unwrap();
    assert_eq!(placeholder["virtual"], true);
    assert_eq!(placeholder["enabled"], false);
    assert!(find(&value["data"], "id", "http://repo.example.org/ stable/main").is_some());
}

#[test]
fn test_enable_virtual_channel_json() {
    let value = upkeep_json(&["enable-repo", "virtual_testing"]);

    assert!(find(&value["data"], "id", "virtual_testing").is_none());
    let real = find(
        &value["data"],
        "id",
        "deb http://repo.example.org/landing bookworm main",
    )
    .unwrap();
    assert_eq!(real["enabled"], true);
    assert_eq!(real["description"], "Testing");
}

#[test]
fn test_unknown_repository_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (fixture, config) = write_inputs(dir.path());

    let output = Command::new(env!("CARGO_BIN_EXE_upkeep"))
        .args(["--fixture", &fixture, "--config", &config, "--color", "never"])
        .args(["disable-repo", "nowhere"])
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute upkeep");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nowhere"));
}
