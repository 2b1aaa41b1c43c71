//! In-memory storage backend.

use super::backend::{BackendType, ProjectBackend};
use crate::Result;
use crate::models::Project;
use std::collections::BTreeMap;

/// Process-local project storage. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    projects: BTreeMap<String, Project>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProjectBackend for MemoryBackend {
    fn list(&self) -> Result<Vec<Project>> {
        let mut projects: Vec<Project> = self.projects.values().cloned().collect();
        projects.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(projects)
    }

    fn get(&self, id: &str) -> Result<Option<Project>> {
        Ok(self.projects.get(id).cloned())
    }

    fn put(&mut self, project: &Project) -> Result<()> {
        self.projects.insert(project.id.clone(), project.clone());
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.projects.remove(id);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Memory
    }
}
