//! Action logging for bdt commands.
//!
//! Every CLI invocation is appended to `<data-dir>/action.log` as one JSON
//! line. Logging is best-effort: failures are reported through `tracing` and
//! never fail the command.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Log file name inside the data directory.
pub const ACTION_LOG_FILE: &str = "action.log";

const MAX_STRING_CHARS: usize = 100;
const MAX_ARRAY_ITEMS: usize = 10;

/// Represents a single action log entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionLog {
    /// ISO 8601 timestamp when the action occurred
    pub timestamp: DateTime<Utc>,

    /// Command name (e.g., "run step", "feature upload")
    pub command: String,

    /// Sanitized command arguments
    pub args: serde_json::Value,

    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Command execution duration in milliseconds
    pub duration_ms: u64,

    /// User who executed the command
    pub user: String,
}

impl ActionLog {
    /// Build an entry, sanitizing `args`.
    pub fn new(
        command: &str,
        args: &serde_json::Value,
        success: bool,
        error: Option<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            command: command.to_string(),
            args: sanitize_args(args),
            success,
            error,
            duration_ms,
            user: current_user(),
        }
    }
}

/// Append an entry to the action log in `data_dir`.
pub fn log_action(data_dir: &Path, entry: &ActionLog) {
    let path = data_dir.join(ACTION_LOG_FILE);
    if let Err(e) = append_entry(&path, entry) {
        tracing::warn!(path = %path.display(), error = %e, "failed to write action log");
    }
}

fn append_entry(path: &Path, entry: &ActionLog) -> crate::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)?;
    Ok(())
}

/// Read back every entry of the action log. Unreadable lines are skipped.
pub fn read_actions(data_dir: &Path) -> crate::Result<Vec<ActionLog>> {
    let path = data_dir.join(ACTION_LOG_FILE);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_lowercase();
    key.contains("password")
        || key.contains("token")
        || key.contains("secret")
        || key.ends_with("api_key")
        || key.ends_with("apikey")
}

/// Sanitize arguments before they reach the log.
///
/// Redacts sensitive keys, summarizes data URLs and large arrays, reduces
/// paths to their file name and truncates long strings.
fn sanitize_args(args: &serde_json::Value) -> serde_json::Value {
    match args {
        serde_json::Value::Object(map) => {
            let sanitized = map
                .iter()
                .map(|(key, value)| {
                    let value = if is_sensitive_key(key) {
                        serde_json::Value::String("[REDACTED]".to_string())
                    } else {
                        sanitize_args(value)
                    };
                    (key.clone(), value)
                })
                .collect();
            serde_json::Value::Object(sanitized)
        }
        serde_json::Value::Array(arr) if arr.len() > MAX_ARRAY_ITEMS => {
            serde_json::Value::String(format!("[Array with {} items]", arr.len()))
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(sanitize_args).collect())
        }
        serde_json::Value::String(s) => serde_json::Value::String(sanitize_string(s)),
        _ => args.clone(),
    }
}

fn sanitize_string(s: &str) -> String {
    if s.starts_with("data:") {
        return format!("[data URL, {} chars]", s.chars().count());
    }

    let base = if s.contains('/') || s.contains('\\') {
        s.rsplit(['/', '\\']).next().unwrap_or(s)
    } else {
        s
    };

    let chars = base.chars().count();
    if chars > MAX_STRING_CHARS {
        let head: String = base.chars().take(MAX_STRING_CHARS - 3).collect();
        format!("{}... ({} chars)", head, chars)
    } else {
        base.to_string()
    }
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
