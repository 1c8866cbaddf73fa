//! CLI integration tests for the `cl` command-line interface.
//!
//! Every test points `CODALAB_HOME` at a scratch directory and names the
//! session explicitly, so nothing touches the real home directory or depends
//! on the enclosing shell. Only the local bundle service is exercised; no
//! network access is needed.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the cl binary, isolated in `home`.
fn cl(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cl").unwrap();
    cmd.env("CODALAB_HOME", home)
        .env("CODALAB_SESSION", "integration")
        .env_remove("RUST_LOG");
    cmd
}

fn home() -> TempDir {
    tempfile::tempdir().unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    let home = home();
    cl(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("CodaLab"));
}

#[test]
fn test_version_displays() {
    let home = home();
    cl(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cl"));
}

#[test]
fn test_help_lists_subcommands() {
    let home = home();
    cl(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("work"))
        .stdout(predicate::str::contains("alias"))
        .stdout(predicate::str::contains("logout"))
        .stdout(predicate::str::contains("session"));
}

#[test]
fn test_unknown_subcommand_rejected() {
    let home = home();
    cl(home.path()).arg("frobnicate").assert().failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_session_from_environment() {
    let home = home();
    cl(home.path())
        .arg("session")
        .assert()
        .success()
        .stdout("integration\n");
}

#[test]
fn test_session_flag_overrides_environment() {
    let home = home();
    cl(home.path())
        .args(["--session", "other", "session"])
        .assert()
        .success()
        .stdout("other\n");
}

#[test]
fn test_temporary_session_writes_nothing() {
    let home = home();
    let inner = home.path().join("never-created");
    cl(&inner)
        .args(["--temporary", "session"])
        .assert()
        .success()
        .stdout("temporary\n");
    assert!(!inner.exists());
}

// ─────────────────────────────────────────────────────────────────────────────
// Alias Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_alias_lists_defaults() {
    let home = home();
    cl(home.path())
        .arg("alias")
        .assert()
        .success()
        .stdout(predicate::str::contains("main"))
        .stdout(predicate::str::contains("https://codalab.org/bundleservice"))
        .stdout(predicate::str::contains("localhost"));

    assert!(home.path().join("config.json").exists());
    assert!(home.path().join("state.json").exists());
}

#[test]
fn test_alias_add_show_remove() {
    let home = home();
    cl(home.path())
        .args(["alias", "dev", "http://dev:2800"])
        .assert()
        .success();

    cl(home.path())
        .args(["alias", "dev"])
        .assert()
        .success()
        .stdout("http://dev:2800\n");

    let config = std::fs::read_to_string(home.path().join("config.json")).unwrap();
    assert!(config.contains("\"dev\": \"http://dev:2800\""));

    cl(home.path())
        .args(["alias", "dev", "--remove"])
        .assert()
        .success();

    cl(home.path())
        .args(["alias", "dev", "--remove"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Alias not found: dev"));
}

#[test]
fn test_alias_json_output() {
    let home = home();
    let output = cl(home.path())
        .args(["--json", "alias"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let aliases: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(aliases["localhost"], "http://localhost:2800");
}

// ─────────────────────────────────────────────────────────────────────────────
// Fatal Document Errors
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_malformed_config_exits() {
    let home = home();
    std::fs::write(home.path().join("config.json"), "{\"aliases\": [").unwrap();

    cl(home.path())
        .arg("session")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid JSON"))
        .stderr(predicate::str::contains("{\"aliases\": ["));
}

#[test]
fn test_unknown_model_class_exits() {
    let home = home();
    std::fs::write(
        home.path().join("config.json"),
        r#"{"server": {"class": "PostgresModel", "auth": {"class": "MockAuthHandler"}}}"#,
    )
    .unwrap();

    cl(home.path())
        .arg("status")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid JSON"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Local Service Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_work_on_local_home_worksheet() {
    let home = home();
    cl(home.path())
        .arg("work")
        .assert()
        .success()
        .stdout(predicate::str::contains("Currently on worksheet local::0x"));

    let state = std::fs::read_to_string(home.path().join("state.json")).unwrap();
    assert!(state.contains("__mock_token__"));
}

#[test]
fn test_work_switch_persists_session() {
    let home = home();
    cl(home.path())
        .args(["work", "local::home-codalab"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Switched to worksheet local::0x"));

    let state: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(home.path().join("state.json")).unwrap(),
    )
    .unwrap();
    let session = &state["sessions"]["integration"];
    assert_eq!(session["address"], "local");
    assert!(session["worksheet_uuid"].as_str().unwrap().starts_with("0x"));

    cl(home.path())
        .args(["work", "--reset"])
        .assert()
        .success();
    let state = std::fs::read_to_string(home.path().join("state.json")).unwrap();
    assert!(!state.contains("worksheet_uuid"));
}

#[test]
fn test_status_and_logout() {
    let home = home();
    cl(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("integration"))
        .stdout(predicate::str::contains("not logged in"));

    cl(home.path()).arg("work").assert().success();

    cl(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("valid for"))
        .stdout(predicate::str::contains("codalab at local"));

    cl(home.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out of local"));

    let state = std::fs::read_to_string(home.path().join("state.json")).unwrap();
    assert!(!state.contains("__mock_token__"));
}

#[test]
fn test_remote_without_prompt_is_denied() {
    let home = home();
    cl(home.path())
        .args(["--no-prompt", "work", "main::home-alice"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no terminal is available"));
}
