//! Project commands.

use super::{Output, json, plural};
use crate::Result;
use crate::models::{Project, RunStatus};
use crate::storage::{ProjectBackend, ProjectStore};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// One line of a project listing.
#[derive(Serialize)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub features: usize,
    pub runs: usize,
}

impl From<&Project> for ProjectSummary {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            description: project.description.clone(),
            features: project.features.len(),
            runs: project.runs.len(),
        }
    }
}

impl Output for ProjectSummary {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut line = format!(
            "{} {} ({}, {})",
            self.id,
            self.name,
            plural(self.features, "feature"),
            plural(self.runs, "run")
        );
        if let Some(description) = &self.description {
            line.push_str(&format!("\n  {}", description));
        }
        line
    }
}

/// Create a project.
pub fn project_create<B: ProjectBackend>(
    store: &mut ProjectStore<B>,
    name: &str,
    description: Option<&str>,
) -> Result<ProjectSummary> {
    let project = store.create_project(name, description)?;
    Ok(ProjectSummary::from(&project))
}

#[derive(Serialize)]
pub struct ProjectList {
    pub projects: Vec<ProjectSummary>,
    pub count: usize,
}

impl Output for ProjectList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.projects.is_empty() {
            return "No projects.".to_string();
        }
        let mut lines = vec![format!("{}:", plural(self.count, "project"))];
        for project in &self.projects {
            lines.push(format!("  {}", project.to_human().replace('\n', "\n  ")));
        }
        lines.join("\n")
    }
}

/// List projects.
pub fn project_list<B: ProjectBackend>(store: &ProjectStore<B>) -> Result<ProjectList> {
    let projects: Vec<ProjectSummary> = store
        .list_projects()?
        .iter()
        .map(ProjectSummary::from)
        .collect();
    let count = projects.len();
    Ok(ProjectList { projects, count })
}

#[derive(Serialize)]
pub struct FeatureRow {
    pub id: String,
    pub name: String,
    pub file: String,
    pub scenarios: usize,
}

#[derive(Serialize)]
pub struct RunRow {
    pub id: String,
    pub feature_id: String,
    pub environment: String,
    pub version: String,
    pub status: RunStatus,
    pub passed: usize,
    pub failed: usize,
    pub untested: usize,
}

/// Project details with its features and runs.
#[derive(Serialize)]
pub struct ProjectDetail {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub features: Vec<FeatureRow>,
    pub runs: Vec<RunRow>,
}

impl Output for ProjectDetail {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!("{} {}", self.id, self.name)];
        if let Some(description) = &self.description {
            lines.push(format!("  {}", description));
        }
        lines.push(String::new());
        lines.push(format!("Features ({}):", self.features.len()));
        for feature in &self.features {
            lines.push(format!(
                "  {} {} [{}] {}",
                feature.id,
                feature.name,
                feature.file,
                plural(feature.scenarios, "scenario")
            ));
        }
        lines.push(format!("Runs ({}):", self.runs.len()));
        for run in &self.runs {
            lines.push(format!(
                "  {} {} {} {} (passed {}, failed {}, untested {})",
                run.id, run.environment, run.version, run.status, run.passed, run.failed, run.untested
            ));
        }
        lines.join("\n")
    }
}

/// Show a project.
pub fn project_show<B: ProjectBackend>(store: &ProjectStore<B>, project_id: &str) -> Result<ProjectDetail> {
    let project = store.get_project(project_id)?;
    let features = project
        .features
        .iter()
        .map(|f| FeatureRow {
            id: f.id.clone(),
            name: f.name.clone(),
            file: f.source_file.name.clone(),
            scenarios: f.scenarios.len(),
        })
        .collect();
    let mut runs: Vec<RunRow> = project
        .runs
        .iter()
        .map(|r| RunRow {
            id: r.id.clone(),
            feature_id: r.feature_id.clone(),
            environment: r.environment.to_string(),
            version: r.version.clone(),
            status: r.status,
            passed: r.summary.passed,
            failed: r.summary.failed,
            untested: r.summary.untested,
        })
        .collect();
    runs.reverse();

    Ok(ProjectDetail {
        id: project.id,
        name: project.name,
        description: project.description,
        features,
        runs,
    })
}

#[derive(Serialize)]
pub struct ProjectDeleted {
    pub id: String,
    pub deleted: bool,
}

impl Output for ProjectDeleted {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Deleted project {}", self.id)
    }
}

/// Delete a project.
pub fn project_delete<B: ProjectBackend>(
    store: &mut ProjectStore<B>,
    project_id: &str,
) -> Result<ProjectDeleted> {
    store.delete_project(project_id)?;
    Ok(ProjectDeleted {
        id: project_id.to_string(),
        deleted: true,
    })
}

/// Result of an export: the document itself, or where it was written.
pub enum ProjectExport {
    Document(String),
    Written { id: String, path: String, bytes: usize },
}

impl Output for ProjectExport {
    fn to_json(&self) -> String {
        match self {
            ProjectExport::Document(doc) => doc.clone(),
            ProjectExport::Written { id, path, bytes } => {
                serde_json::json!({ "id": id, "path": path, "bytes": bytes }).to_string()
            }
        }
    }

    fn to_human(&self) -> String {
        match self {
            ProjectExport::Document(doc) => doc.clone(),
            ProjectExport::Written { id, path, bytes } => {
                format!("Exported project {} to {} ({} bytes)", id, path, bytes)
            }
        }
    }
}

/// Export a project to stdout or a file.
pub fn project_export<B: ProjectBackend>(
    store: &ProjectStore<B>,
    project_id: &str,
    output: Option<&Path>,
) -> Result<ProjectExport> {
    let document = store.export_project(project_id)?;
    match output {
        None => Ok(ProjectExport::Document(document)),
        Some(path) => {
            fs::write(path, &document)?;
            Ok(ProjectExport::Written {
                id: project_id.to_string(),
                path: path.display().to_string(),
                bytes: document.len(),
            })
        }
    }
}

/// Import a project from an exported file.
pub fn project_import<B: ProjectBackend>(store: &mut ProjectStore<B>, file: &Path) -> Result<ProjectSummary> {
    let document = fs::read_to_string(file)?;
    let project = store.import_project(&document)?;
    Ok(ProjectSummary::from(&project))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::memory_store;
    use tempfile::TempDir;

    #[test]
    fn test_create_list_show() {
        let mut store = memory_store();
        let created = project_create(&mut store, "Shop", Some("Web shop")).unwrap();
        store
            .upload_feature(&created.id, "cart.feature", "Feature: Cart\nScenario: Add\nGiven a cart")
            .unwrap();

        let list = project_list(&store).unwrap();
        assert_eq!(list.count, 1);
        assert!(list.to_human().contains("Shop (1 feature, 0 runs)"));

        let detail = project_show(&store, &created.id).unwrap();
        assert_eq!(detail.features.len(), 1);
        assert_eq!(detail.features[0].file, "cart.feature");
        let json: serde_json::Value = serde_json::from_str(&detail.to_json()).unwrap();
        assert_eq!(json["name"], "Shop");
    }

    #[test]
    fn test_empty_list_human() {
        let store = memory_store();
        assert_eq!(project_list(&store).unwrap().to_human(), "No projects.");
    }

    #[test]
    fn test_export_to_file_and_import() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("shop.json");

        let mut store = memory_store();
        let created = project_create(&mut store, "Shop", None).unwrap();
        let result = project_export(&store, &created.id, Some(&path)).unwrap();
        assert!(matches!(result, ProjectExport::Written { .. }));

        let mut other = memory_store();
        let imported = project_import(&mut other, &path).unwrap();
        assert_eq!(imported.id, created.id);
        assert_eq!(imported.name, "Shop");
    }

    #[test]
    fn test_export_to_stdout_is_raw_document() {
        let mut store = memory_store();
        let created = project_create(&mut store, "Shop", None).unwrap();
        let result = project_export(&store, &created.id, None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&result.to_json()).unwrap();
        assert_eq!(value["id"], created.id.as_str());
        assert!(value["features"].is_array());
    }
}
