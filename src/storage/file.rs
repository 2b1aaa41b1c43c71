//! Append-only JSONL storage backend.
//!
//! Every `put` appends the full project as one line; `delete` appends a
//! tombstone. Reads replay the file and keep the latest line per project id.
//! `compact` rewrites the file with only the live projects.

use super::backend::{BackendType, ProjectBackend};
use crate::Result;
use crate::models::Project;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Log file name inside the data directory.
pub const PROJECTS_FILE: &str = "projects.jsonl";

/// One line of the log.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Record {
    Tombstone { id: String, deleted: bool },
    Project(Box<Project>),
}

/// Result of compacting the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompactStats {
    /// Lines before compaction
    pub lines_before: usize,
    /// Lines after compaction (one per live project)
    pub lines_after: usize,
}

/// JSONL-backed project storage.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// Open (creating if needed) the log in `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(PROJECTS_FILE);
        if !path.exists() {
            File::create(&path)?;
        }
        Ok(Self { path })
    }

    /// Replay the log into the latest state per project.
    ///
    /// Returns the live projects and the number of non-empty lines read.
    fn replay(&self) -> Result<(HashMap<String, Project>, usize)> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut projects = HashMap::new();
        let mut lines = 0;
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            lines += 1;
            match serde_json::from_str::<Record>(&line) {
                Ok(Record::Project(project)) => {
                    projects.insert(project.id.clone(), *project);
                }
                Ok(Record::Tombstone { id, deleted }) => {
                    if deleted {
                        projects.remove(&id);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = number + 1,
                        error = %e,
                        "skipping unreadable project record"
                    );
                }
            }
        }
        Ok((projects, lines))
    }

    fn append(&self, record: &Record) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let json = serde_json::to_string(record)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }

    /// Rewrite the log keeping only the latest version of each live project.
    pub fn compact(&mut self) -> Result<CompactStats> {
        let (projects, lines_before) = self.replay()?;
        let mut projects: Vec<Project> = projects.into_values().collect();
        projects.sort_by(|a, b| a.id.cmp(&b.id));

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        for project in &projects {
            writeln!(tmp, "{}", serde_json::to_string(project)?)?;
        }
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        Ok(CompactStats {
            lines_before,
            lines_after: projects.len(),
        })
    }
}

impl ProjectBackend for FileBackend {
    fn list(&self) -> Result<Vec<Project>> {
        let (projects, _) = self.replay()?;
        let mut projects: Vec<Project> = projects.into_values().collect();
        projects.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(projects)
    }

    fn get(&self, id: &str) -> Result<Option<Project>> {
        let (mut projects, _) = self.replay()?;
        Ok(projects.remove(id))
    }

    fn put(&mut self, project: &Project) -> Result<()> {
        self.append(&Record::Project(Box::new(project.clone())))
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.append(&Record::Tombstone {
            id: id.to_string(),
            deleted: true,
        })
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn backend_type(&self) -> BackendType {
        BackendType::File
    }
}
