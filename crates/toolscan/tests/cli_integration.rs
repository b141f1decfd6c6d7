//! CLI integration tests for the Toolscan command-line interface.
//!
//! These tests verify:
//! - Help text is displayed correctly
//! - Argument parsing works as expected
//! - Invalid inputs and failed fetches exit non-zero with a diagnostic
//!
//! Note: These tests do not require a running MCP server.

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a command for the toolscan binary.
fn toolscan() -> Command {
    let mut cmd = Command::cargo_bin("toolscan").unwrap();
    cmd.env_remove("TOOLSCAN_URL")
        .env_remove("TOOLSCAN_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// A localhost URL nothing listens on.
fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    toolscan()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Toolscan"))
        .stdout(predicate::str::contains("--url"))
        .stdout(predicate::str::contains("--timeout"));
}

#[test]
fn test_version_displays() {
    toolscan()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("toolscan"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument Validation Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_url_required() {
    toolscan()
        .assert()
        .failure()
        .stderr(predicate::str::contains("--url"));
}

#[test]
fn test_invalid_timeout_rejected() {
    toolscan()
        .args(["--url", "http://localhost:8080", "--timeout", "soon"])
        .assert()
        .failure();
}

#[test]
fn test_invalid_format_rejected() {
    toolscan()
        .args(["--url", "http://localhost:8080", "--format", "xml"])
        .assert()
        .failure();
}

#[test]
fn test_invalid_header_rejected() {
    toolscan()
        .args(["--url", "http://localhost:8080", "-H", "no-equals"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("KEY=VALUE"));
}

#[test]
fn test_invalid_url_rejected() {
    toolscan()
        .args(["--url", "not a url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid server configuration"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Fetch Failure Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_unreachable_server_fails() {
    toolscan()
        .args(["--url", &dead_url(), "--timeout", "2"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Failed to fetch tools"))
        .stderr(predicate::str::contains("failed to initiate connection"));
}

#[test]
fn test_url_from_env() {
    toolscan()
        .env("TOOLSCAN_URL", dead_url())
        .args(["--timeout", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to fetch tools"));
}
