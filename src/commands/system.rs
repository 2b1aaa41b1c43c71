//! System information and maintenance commands.

use super::{Output, json, plural};
use crate::action_log::{ActionLog, read_actions};
use crate::config::ResolvedConfig;
use crate::storage::file::CompactStats;
use crate::storage::{BackendType, FileBackend, ProjectBackend, ProjectStore};
use crate::{Error, Result};
use serde::Serialize;
use std::path::Path;

/// Package version from Cargo.toml.
pub fn package_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Short git commit the binary was built from.
pub fn git_commit() -> &'static str {
    env!("BDT_GIT_COMMIT")
}

/// Build timestamp (ISO 8601).
pub fn build_timestamp() -> &'static str {
    env!("BDT_BUILD_TIMESTAMP")
}

#[derive(Serialize)]
pub struct SystemInfo {
    pub version: String,
    pub commit: String,
    pub built: String,
    pub data_dir: String,
    pub config_dir: String,
    pub backend: String,
    pub backend_source: String,
    pub location: String,
    pub projects: usize,
}

impl Output for SystemInfo {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        [
            format!("Version:  {}", self.version),
            format!("Commit:   {}", self.commit),
            format!("Built:    {}", self.built),
            format!("Data:     {}", self.data_dir),
            format!("Config:   {}", self.config_dir),
            format!("Backend:  {} ({})", self.backend, self.backend_source),
            format!("Location: {}", self.location),
            format!("Projects: {}", self.projects),
        ]
        .join("\n")
    }
}

/// Version, build and storage information.
pub fn system_info<B: ProjectBackend>(
    store: &ProjectStore<B>,
    data_dir: &Path,
    config_dir: &Path,
    resolved: &ResolvedConfig,
) -> Result<SystemInfo> {
    let backend = store.backend();
    Ok(SystemInfo {
        version: package_version().to_string(),
        commit: git_commit().to_string(),
        built: build_timestamp().to_string(),
        data_dir: data_dir.display().to_string(),
        config_dir: config_dir.display().to_string(),
        backend: backend.backend_type().to_string(),
        backend_source: resolved.backend.source.to_string(),
        location: backend.location(),
        projects: store.list_projects()?.len(),
    })
}

#[derive(Debug, Serialize)]
pub struct Compacted {
    pub path: String,
    #[serde(flatten)]
    pub stats: CompactStats,
}

impl Output for Compacted {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Compacted {}: {} -> {}",
            self.path,
            plural(self.stats.lines_before, "line"),
            plural(self.stats.lines_after, "line")
        )
    }
}

/// Rewrite the JSONL project log keeping only the latest live records.
pub fn system_compact(data_dir: &Path, backend: BackendType) -> Result<Compacted> {
    if backend != BackendType::File {
        return Err(Error::InvalidInput(format!(
            "Compaction only applies to the file backend (current backend: {})",
            backend
        )));
    }
    let mut file = FileBackend::open(data_dir)?;
    let stats = file.compact()?;
    Ok(Compacted {
        path: file.location(),
        stats,
    })
}

#[derive(Serialize)]
pub struct ActionHistory {
    pub actions: Vec<ActionLog>,
    pub count: usize,
}

impl Output for ActionHistory {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.actions.is_empty() {
            return "No actions logged.".to_string();
        }
        self.actions
            .iter()
            .map(|a| {
                let status = if a.success { "ok" } else { "failed" };
                let mut line = format!(
                    "{} {} [{}] {}ms",
                    a.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    a.command,
                    status,
                    a.duration_ms
                );
                if let Some(error) = &a.error {
                    line.push_str(&format!(": {}", error));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The last `limit` entries of the action log, oldest first.
pub fn system_actions(data_dir: &Path, limit: usize) -> Result<ActionHistory> {
    let mut actions = read_actions(data_dir)?;
    let skip = actions.len().saturating_sub(limit);
    actions.drain(..skip);
    let count = actions.len();
    Ok(ActionHistory { actions, count })
}
