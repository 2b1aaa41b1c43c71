//! Common test utilities for bddtrack integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/bddtrack/` or `~/.config/bddtrack/`.

#![allow(dead_code)]

use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// Feature used throughout the CLI tests: two scenarios, five steps.
pub const LOGIN_FEATURE: &str = "Feature: Login
  Users sign in with email and password

  Scenario: Valid login
    Given I am on the login page
    When I submit valid credentials
    Then I see the dashboard

  Scenario: Wrong password
    Given I am on the login page
    When I submit a wrong password
";

/// A test environment with isolated data and config directories.
///
/// The `bdt()` method returns a `Command` that sets `BDT_DATA_DIR` and
/// `BDT_CONFIG_DIR` per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
    pub config_dir: TempDir,
    pub work_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
            work_dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the bdt binary with isolated directories.
    pub fn bdt(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_bdt"));
        cmd.current_dir(self.work_dir.path());
        cmd.env("BDT_DATA_DIR", self.data_dir.path());
        cmd.env("BDT_CONFIG_DIR", self.config_dir.path());
        cmd.env_remove("BDT_BACKEND");
        cmd.env_remove("BDT_OUTPUT_FORMAT");
        cmd.env_remove("BDT_ENVIRONMENT");
        cmd
    }

    pub fn data_path(&self) -> &Path {
        self.data_dir.path()
    }

    pub fn config_path(&self) -> &Path {
        self.config_dir.path()
    }

    /// Write a file into the working directory and return its path.
    pub fn write_file(&self, name: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.work_dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    /// Run a command expected to succeed and parse its JSON output.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self.bdt().args(args).assert().success().get_output().stdout.clone();
        parse_json(&output)
    }

    /// Create a project and return its id.
    pub fn create_project(&self, name: &str) -> String {
        let json = self.json(&["project", "create", name]);
        json["id"].as_str().unwrap().to_string()
    }

    /// Upload the login feature into a project and return its id.
    pub fn upload_login(&self, project: &str) -> String {
        let path = self.write_file("login.feature", LOGIN_FEATURE);
        let json = self.json(&["feature", "upload", project, path.to_str().unwrap()]);
        json["feature_id"].as_str().unwrap().to_string()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse JSON output from a command.
pub fn parse_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("Failed to parse JSON output")
}
