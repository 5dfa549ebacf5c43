//! CLI Integration Tests
//!
//! Tests the command-line interface end-to-end. Nothing here needs network
//! access or an API key.

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

/// Get the binary to test, isolated from the caller's keys and config.
fn titanium() -> Command {
    let mut cmd = Command::cargo_bin("titanium").unwrap();
    cmd.env_remove("OPENAI_API_KEY")
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("ELEVENLABS_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

fn read_json(path: &std::path::Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

const BRIEF: &str = "# Product Brief: Demo

**Version:** 1.0
**Date:** January 01, 2026

## Executive Summary
## Problem Statement
## Proposed Solution
## Target Users
## Goals & Success Metrics
## MVP Scope
## Post-MVP Vision
## Technical Considerations
## Constraints & Assumptions
## Risks & Open Questions
## Next Steps
";

// ============================================================================
// Help & Version Tests
// ============================================================================

#[test]
fn test_help_flag() {
    titanium()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_version_flag() {
    titanium()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_tt_alias_binary() {
    Command::cargo_bin("tt").unwrap().arg("--help").assert().success();
}

#[test]
fn test_unknown_subcommand_fails() {
    titanium().arg("frobnicate").assert().failure();
}

// ============================================================================
// State Command Tests
// ============================================================================

#[test]
fn test_state_lifecycle() {
    let temp = assert_fs::TempDir::new().unwrap();
    let project = temp.path().to_str().unwrap();

    titanium()
        .args(["state", "init", project, "development", "Add login"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"planning\""));

    titanium().args(["state", "update_phase", project, "implementation"]).assert().success();
    titanium()
        .args(["state", "update-phase", project, "implementation", "completed"])
        .assert()
        .success();

    let state = read_json(&temp.path().join(".titanium/workflow-state.json"));
    assert_eq!(state["phases"].as_array().unwrap().len(), 1);
    assert!(state["phases"][0]["completed_at"].is_string());

    titanium()
        .args(["state", "complete", project])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"current_phase\": \"completed\""));

    titanium()
        .args(["state", "get", project])
        .assert()
        .success()
        .stdout(predicate::str::contains("Add login"));
}

#[test]
fn test_state_get_missing_fails() {
    let temp = assert_fs::TempDir::new().unwrap();

    titanium()
        .args(["state", "get", temp.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_state_init_blank_goal_fails() {
    let temp = assert_fs::TempDir::new().unwrap();

    titanium()
        .args(["state", "init", temp.path().to_str().unwrap(), "development", "  "])
        .assert()
        .failure();
    temp.child(".titanium/workflow-state.json").assert(predicate::path::missing());
}

// ============================================================================
// Plan Command Tests
// ============================================================================

#[test]
fn test_plan_missing_requirements_fails() {
    let temp = assert_fs::TempDir::new().unwrap();

    titanium()
        .current_dir(temp.path())
        .args(["plan", "nope.md", "."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot read requirements file"));
}

#[test]
fn test_plan_without_provider_writes_nothing() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("requirements.md").write_str("Build a todo app").unwrap();

    titanium().current_dir(temp.path()).args(["plan", "requirements.md", "."]).assert().failure();
    temp.child(".titanium/plan.json").assert(predicate::path::missing());
}

// ============================================================================
// Validate Command Tests
// ============================================================================

#[test]
fn test_validate_valid_brief() {
    let temp = assert_fs::TempDir::new().unwrap();
    let brief = temp.child("product-brief.md");
    brief.write_str(BRIEF).unwrap();

    titanium()
        .args(["validate", "brief", brief.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("VALID"));
}

#[test]
fn test_validate_invalid_epic_json() {
    let temp = assert_fs::TempDir::new().unwrap();
    let epic = temp.child("EPIC-001-auth.md");
    epic.write_str("# EPIC-001: Auth\n\n## Epic Description\n").unwrap();

    titanium()
        .args(["validate", "epic", epic.path().to_str().unwrap(), "--format", "json"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"valid\": false"))
        .stdout(predicate::str::contains("No stories found"));
}

#[test]
fn test_validate_all_prd_only() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("prd/prd.md").write_str("# Product Requirements Document: Demo\n").unwrap();

    titanium()
        .args(["validate", "all", temp.path().to_str().unwrap()])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Architecture not found"))
        .stdout(predicate::str::contains("Overall: INVALID"));
}

#[test]
fn test_validate_unreadable_file() {
    titanium()
        .args(["validate", "prd", "/definitely/not/here.md"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Cannot read file"));
}

#[test]
fn test_validate_unknown_kind() {
    titanium().args(["validate", "roadmap", "x.md"]).assert().failure();
}

// ============================================================================
// Generate Command Tests
// ============================================================================

#[test]
fn test_generate_research_template() {
    let temp = assert_fs::TempDir::new().unwrap();

    titanium()
        .args(["generate", "research", "template", "Payment Providers", temp.path().to_str().unwrap()])
        .assert()
        .success();

    temp.child("bmad-backlog/research/RESEARCH-payment-providers-findings.md")
        .assert(predicate::path::is_file());
}

#[test]
fn test_generate_brief_without_provider_fails() {
    let temp = assert_fs::TempDir::new().unwrap();

    titanium()
        .current_dir(temp.path())
        .args(["generate", "brief", "A todo app", "."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No LLM provider available"));
}

// ============================================================================
// Hook Command Tests
// ============================================================================

#[test]
fn test_hooks_exit_zero_on_garbage() {
    let temp = assert_fs::TempDir::new().unwrap();

    for hook in ["notification", "post-tool-use", "stop"] {
        titanium()
            .current_dir(temp.path())
            .args(["hook", hook])
            .write_stdin("this is not json")
            .assert()
            .success();
    }
}

#[test]
fn test_quiet_tool_hook_is_silent() {
    let temp = assert_fs::TempDir::new().unwrap();

    titanium()
        .current_dir(temp.path())
        .args(["hook", "post-tool-use"])
        .write_stdin(r#"{"tool_name": "Read", "tool_input": {"file_path": "a.rs"}}"#)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    temp.child("logs").assert(predicate::path::missing());
}

#[test]
fn test_stop_hook_records_input() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child(".titanium.toml")
        .write_str("[tts]\nproviders = []\n\n[hooks]\ndesktop_notifications = false\n")
        .unwrap();

    titanium()
        .current_dir(temp.path())
        .args(["hook", "stop"])
        .write_stdin(r#"{"session_id": "s-1", "stop_hook_active": false}"#)
        .assert()
        .success();

    let stops = read_json(&temp.path().join("logs/stop.json"));
    assert_eq!(stops[0]["session_id"], "s-1");
}

// ============================================================================
// MCP Command Tests
// ============================================================================

#[test]
fn test_mcp_lists_tools() {
    let temp = assert_fs::TempDir::new().unwrap();
    let input = concat!(
        r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#,
        "\n",
        r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#,
        "\n",
        r#"{"jsonrpc": "2.0", "id": 2, "method": "tools/list"}"#,
        "\n",
    );

    titanium()
        .current_dir(temp.path())
        .arg("mcp")
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"protocolVersion\""))
        .stdout(predicate::str::contains("bmad_validator"));
}

// ============================================================================
// Config & Completions Tests
// ============================================================================

#[test]
fn test_config_reads_local_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child(".titanium.toml").write_str("[llm]\ntemperature = 0.5\n").unwrap();

    titanium()
        .current_dir(temp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("temperature = 0.5"));
}

#[test]
fn test_completions_bash() {
    titanium()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("titanium"));
}
