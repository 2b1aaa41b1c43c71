//! Storage backend trait and backend selection.
//!
//! This module provides the persistence port used by the project store:
//! - `SqliteBackend` - Single SQLite database (default)
//! - `FileBackend` - Append-only JSONL file
//! - `MemoryBackend` - Process-local map, nothing persisted

use crate::Result;
use crate::models::Project;

/// Trait for storage backends that persist whole projects.
///
/// Backends store and return full-fidelity `Project` documents, including
/// nested runs and attachments. There is no partial update: callers read a
/// project, change it in memory, and `put` it back.
pub trait ProjectBackend: Send {
    /// Read every stored project.
    fn list(&self) -> Result<Vec<Project>>;

    /// Read one project, if present.
    fn get(&self, id: &str) -> Result<Option<Project>>;

    /// Insert or replace a project.
    fn put(&mut self, project: &Project) -> Result<()>;

    /// Remove a project. Removing an absent project is not an error.
    fn delete(&mut self, id: &str) -> Result<()>;

    /// Get the storage location description (for display purposes).
    fn location(&self) -> String;

    /// Get the backend type.
    fn backend_type(&self) -> BackendType;
}

impl ProjectBackend for Box<dyn ProjectBackend> {
    fn list(&self) -> Result<Vec<Project>> {
        (**self).list()
    }

    fn get(&self, id: &str) -> Result<Option<Project>> {
        (**self).get(id)
    }

    fn put(&mut self, project: &Project) -> Result<()> {
        (**self).put(project)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        (**self).delete(id)
    }

    fn location(&self) -> String {
        (**self).location()
    }

    fn backend_type(&self) -> BackendType {
        (**self).backend_type()
    }
}

/// Available storage backend types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendType {
    /// SQLite database at `<data-dir>/bddtrack.db` (default)
    #[default]
    Sqlite,
    /// Append-only JSONL at `<data-dir>/projects.jsonl`
    File,
    /// In-memory only, lost when the process exits
    Memory,
}

impl BackendType {
    /// Parse a backend type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sqlite" | "db" | "default" => Some(Self::Sqlite),
            "file" | "jsonl" => Some(Self::File),
            "memory" | "mem" => Some(Self::Memory),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
