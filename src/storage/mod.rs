//! Storage layer for bddtrack data.
//!
//! This module handles persistence of projects, their features and test runs.
//!
//! ## Storage Backends
//!
//! bddtrack supports multiple storage backends:
//!
//! - **SQLite backend** (default): `<data-dir>/bddtrack.db`
//! - **File backend**: append-only `<data-dir>/projects.jsonl`
//! - **Memory backend**: nothing persisted, for tests and embedding
//!
//! Every backend stores whole `Project` documents. `ProjectStore` performs
//! each operation as "read full project, mutate in memory, write full project
//! back"; concurrent writers to the same project are last-write-wins.

pub mod backend;
pub mod file;
pub mod memory;
pub mod sqlite;

pub use backend::{BackendType, ProjectBackend};
pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use crate::ids::IdGenerator;
use crate::models::{Attachment, Environment, Feature, Outcome, Project, RunStatus, TestRun};
use crate::parser::FeatureParser;
use crate::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "BDT_DATA_DIR";

/// What `add_feature` did with an uploaded feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FeatureUpload {
    /// No feature with that name existed; appended
    Added { feature_id: String },
    /// Identical content already stored; nothing changed
    Unchanged { feature_id: String },
    /// Same name, different content; replaced in place and stale runs purged
    Replaced {
        feature_id: String,
        previous_id: String,
        purged_runs: usize,
    },
}

impl FeatureUpload {
    /// Id of the feature now stored under the uploaded name.
    pub fn feature_id(&self) -> &str {
        match self {
            FeatureUpload::Added { feature_id }
            | FeatureUpload::Unchanged { feature_id }
            | FeatureUpload::Replaced { feature_id, .. } => feature_id,
        }
    }
}

/// Outcome of a result-changing run operation.
#[derive(Debug, Clone, Serialize)]
pub struct RunUpdate {
    /// False when the run was locked and nothing changed
    pub applied: bool,
    pub run: TestRun,
}

/// Mediates all reads and writes of projects against a backend.
pub struct ProjectStore<B: ProjectBackend> {
    backend: B,
    ids: Arc<dyn IdGenerator>,
    parser: FeatureParser,
}

impl<B: ProjectBackend> ProjectStore<B> {
    /// Create a store over `backend`, using `ids` for every new identity.
    pub fn new(backend: B, ids: Arc<dyn IdGenerator>) -> Self {
        let parser = FeatureParser::new(Arc::clone(&ids));
        Self {
            backend,
            ids,
            parser,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Generate a fresh identity (used for attachments built by callers).
    pub fn next_id(&self) -> String {
        self.ids.next_id()
    }

    fn load(&self, project_id: &str) -> Result<Project> {
        self.backend
            .get(project_id)?
            .ok_or_else(|| Error::NotFound(format!("Project not found: {}", project_id)))
    }

    fn save(&mut self, project: &Project) -> Result<()> {
        tracing::debug!(
            project = %project.id,
            features = project.features.len(),
            runs = project.runs.len(),
            "writing project"
        );
        self.backend.put(project)
    }

    // === Project Operations ===

    /// Create a new, empty project.
    pub fn create_project(&mut self, name: &str, description: Option<&str>) -> Result<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Project name cannot be empty".to_string()));
        }

        let mut project = Project::new(self.ids.next_id(), name.to_string());
        project.description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        self.save(&project)?;
        tracing::info!(project = %project.id, name = %project.name, "created project");
        Ok(project)
    }

    /// List all projects, sorted by name.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut projects = self.backend.list()?;
        projects.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(projects)
    }

    /// Get a project by ID.
    pub fn get_project(&self, project_id: &str) -> Result<Project> {
        self.load(project_id)
    }

    /// Delete a project with all its features and runs.
    pub fn delete_project(&mut self, project_id: &str) -> Result<()> {
        self.load(project_id)?;
        self.backend.delete(project_id)?;
        tracing::info!(project = %project_id, "deleted project");
        Ok(())
    }

    // === Feature Operations ===

    /// Add a parsed feature to a project.
    ///
    /// Features are matched by name. Identical content is a no-op; changed
    /// content replaces the stored feature in its slot and deletes every run
    /// of the old feature, since those runs cannot be reconciled against the
    /// new scenario and step identities.
    pub fn add_feature(&mut self, project_id: &str, feature: Feature) -> Result<FeatureUpload> {
        let mut project = self.load(project_id)?;

        let existing = project
            .features
            .iter()
            .position(|f| f.name == feature.name);

        let upload = match existing {
            Some(index) => {
                let stored = &project.features[index];
                if stored.source_file.hash == feature.source_file.hash {
                    tracing::debug!(
                        project = %project_id,
                        feature = %stored.id,
                        "identical feature upload ignored"
                    );
                    return Ok(FeatureUpload::Unchanged {
                        feature_id: stored.id.clone(),
                    });
                }

                let previous_id = stored.id.clone();
                let before = project.runs.len();
                project.runs.retain(|r| r.feature_id != previous_id);
                let purged_runs = before - project.runs.len();

                let feature_id = feature.id.clone();
                project.features[index] = feature;
                tracing::info!(
                    project = %project_id,
                    feature = %feature_id,
                    previous = %previous_id,
                    purged_runs,
                    "replaced feature"
                );
                FeatureUpload::Replaced {
                    feature_id,
                    previous_id,
                    purged_runs,
                }
            }
            None => {
                let feature_id = feature.id.clone();
                project.features.push(feature);
                tracing::info!(project = %project_id, feature = %feature_id, "added feature");
                FeatureUpload::Added { feature_id }
            }
        };

        self.save(&project)?;
        Ok(upload)
    }

    /// Parse a feature file and add it to a project.
    pub fn upload_feature(
        &mut self,
        project_id: &str,
        file_name: &str,
        content: &str,
    ) -> Result<FeatureUpload> {
        let feature = self.parser.parse(file_name, content);
        self.add_feature(project_id, feature)
    }

    /// Get a feature by ID.
    pub fn get_feature(&self, project_id: &str, feature_id: &str) -> Result<Feature> {
        let project = self.load(project_id)?;
        project
            .find_feature(feature_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Feature not found: {}", feature_id)))
    }

    // === Run Operations ===

    /// Return the in-progress run for (feature, environment, version), or
    /// snapshot the feature into a new one.
    ///
    /// Calling this repeatedly never resets progress on an existing run.
    pub fn get_or_create_run(
        &mut self,
        project_id: &str,
        feature_id: &str,
        environment: Environment,
        version: &str,
    ) -> Result<TestRun> {
        let version = validate_version(version)?;
        let mut project = self.load(project_id)?;

        if let Some(run) = project.runs.iter().find(|r| {
            r.feature_id == feature_id
                && r.environment == environment
                && r.version == version
                && r.status == RunStatus::InProgress
        }) {
            tracing::debug!(run = %run.id, "reusing in-progress run");
            return Ok(run.clone());
        }

        let feature = project
            .find_feature(feature_id)
            .ok_or_else(|| Error::NotFound(format!("Feature not found: {}", feature_id)))?;

        let run = TestRun::snapshot(feature, environment, version, self.ids.next_id());
        project.runs.push(run.clone());
        self.save(&project)?;

        tracing::info!(
            project = %project_id,
            feature = %feature_id,
            run = %run.id,
            environment = %environment,
            version,
            "created test run"
        );
        Ok(run)
    }

    /// Start a run for a new version label.
    ///
    /// Fails with `Conflict` if any run of the feature in that environment
    /// already uses the version, whether in progress or completed.
    pub fn start_run(
        &mut self,
        project_id: &str,
        feature_id: &str,
        environment: Environment,
        version: &str,
    ) -> Result<TestRun> {
        let trimmed = validate_version(version)?;
        let project = self.load(project_id)?;

        if project
            .runs
            .iter()
            .any(|r| r.feature_id == feature_id && r.environment == environment && r.version == trimmed)
        {
            return Err(Error::Conflict(format!(
                "Version {} already exists for this feature in {}",
                trimmed, environment
            )));
        }

        self.get_or_create_run(project_id, feature_id, environment, trimmed)
    }

    /// Get a run by ID.
    pub fn get_run(&self, project_id: &str, run_id: &str) -> Result<TestRun> {
        let project = self.load(project_id)?;
        find_run(&project, run_id).cloned()
    }

    /// List runs, newest first, optionally filtered by feature and environment.
    pub fn list_runs(
        &self,
        project_id: &str,
        feature_id: Option<&str>,
        environment: Option<Environment>,
    ) -> Result<Vec<TestRun>> {
        let project = self.load(project_id)?;
        let mut runs: Vec<TestRun> = project
            .runs
            .into_iter()
            .filter(|r| feature_id.is_none_or(|f| r.feature_id == f))
            .filter(|r| environment.is_none_or(|e| r.environment == e))
            .collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(runs)
    }

    /// Store a run, replacing the one with the same id or appending it.
    pub fn update_run(&mut self, project_id: &str, run: &TestRun) -> Result<()> {
        let mut project = self.load(project_id)?;
        match project.runs.iter_mut().find(|r| r.id == run.id) {
            Some(slot) => *slot = run.clone(),
            None => project.runs.push(run.clone()),
        }
        self.save(&project)
    }

    /// Apply `f` to a copy of a run and persist the updated copy.
    ///
    /// Nothing is written when `f` fails.
    pub fn mutate_run<T, F>(&mut self, project_id: &str, run_id: &str, f: F) -> Result<(T, TestRun)>
    where
        F: FnOnce(&mut TestRun) -> Result<T>,
    {
        let mut project = self.load(project_id)?;
        let mut run = find_run(&project, run_id)?.clone();

        let value = f(&mut run)?;

        if let Some(slot) = project.runs.iter_mut().find(|r| r.id == run.id) {
            *slot = run.clone();
        }
        self.save(&project)?;
        Ok((value, run))
    }

    fn mutate_result<F>(&mut self, project_id: &str, run_id: &str, f: F) -> Result<RunUpdate>
    where
        F: FnOnce(&mut TestRun) -> Result<bool>,
    {
        let (applied, run) = self.mutate_run(project_id, run_id, f)?;
        if !applied {
            tracing::debug!(run = %run_id, "ignored result change on completed run");
        }
        Ok(RunUpdate { applied, run })
    }

    pub fn set_step_result(
        &mut self,
        project_id: &str,
        run_id: &str,
        step_id: &str,
        result: Outcome,
    ) -> Result<RunUpdate> {
        self.mutate_result(project_id, run_id, |run| run.set_step_result(step_id, result))
    }

    pub fn set_scenario_result(
        &mut self,
        project_id: &str,
        run_id: &str,
        scenario_id: &str,
        result: Outcome,
    ) -> Result<RunUpdate> {
        self.mutate_result(project_id, run_id, |run| {
            run.set_scenario_result(scenario_id, result)
        })
    }

    pub fn bulk_set_result(
        &mut self,
        project_id: &str,
        run_id: &str,
        scenario_ids: &[String],
        result: Outcome,
    ) -> Result<RunUpdate> {
        self.mutate_result(project_id, run_id, |run| {
            run.bulk_set_result(scenario_ids, result)
        })
    }

    pub fn set_step_note(
        &mut self,
        project_id: &str,
        run_id: &str,
        step_id: &str,
        note: &str,
    ) -> Result<TestRun> {
        let ((), run) = self.mutate_run(project_id, run_id, |run| run.set_step_note(step_id, note))?;
        Ok(run)
    }

    pub fn set_scenario_note(
        &mut self,
        project_id: &str,
        run_id: &str,
        scenario_id: &str,
        note: &str,
    ) -> Result<TestRun> {
        let ((), run) = self.mutate_run(project_id, run_id, |run| {
            run.set_scenario_note(scenario_id, note)
        })?;
        Ok(run)
    }

    pub fn add_step_attachment(
        &mut self,
        project_id: &str,
        run_id: &str,
        step_id: &str,
        attachment: Attachment,
    ) -> Result<TestRun> {
        let ((), run) = self.mutate_run(project_id, run_id, |run| {
            run.add_step_attachment(step_id, attachment)
        })?;
        Ok(run)
    }

    pub fn add_scenario_attachment(
        &mut self,
        project_id: &str,
        run_id: &str,
        scenario_id: &str,
        attachment: Attachment,
    ) -> Result<TestRun> {
        let ((), run) = self.mutate_run(project_id, run_id, |run| {
            run.add_scenario_attachment(scenario_id, attachment)
        })?;
        Ok(run)
    }

    /// Return every result in a run to untested and reopen it.
    ///
    /// Fails with `Conflict` if another run of the same feature, environment
    /// and version is already in progress.
    pub fn reset_run(&mut self, project_id: &str, run_id: &str) -> Result<TestRun> {
        let project = self.load(project_id)?;
        let run = find_run(&project, run_id)?;
        if let Some(open) = open_sibling(&project, run) {
            return Err(Error::Conflict(format!(
                "Run {} is already in progress for {} {}",
                open.id, run.environment, run.version
            )));
        }

        let ((), run) = self.mutate_run(project_id, run_id, |run| {
            run.reset();
            Ok(())
        })?;
        tracing::info!(run = %run_id, "reset test run");
        Ok(run)
    }

    /// Complete and lock a run.
    ///
    /// A missing run is not an error: nothing happens and `None` is returned.
    pub fn complete_run(&mut self, project_id: &str, run_id: &str) -> Result<Option<TestRun>> {
        let mut project = self.load(project_id)?;
        let Some(run) = project.runs.iter_mut().find(|r| r.id == run_id) else {
            tracing::warn!(project = %project_id, run = %run_id, "complete requested for unknown run");
            return Ok(None);
        };

        if !run.complete() {
            tracing::debug!(run = %run_id, "run already completed");
            return Ok(Some(run.clone()));
        }

        let run = run.clone();
        self.save(&project)?;
        tracing::info!(
            run = %run.id,
            passed = run.summary.passed,
            failed = run.summary.failed,
            untested = run.summary.untested,
            "completed test run"
        );
        Ok(Some(run))
    }

    /// Reset every run of a feature. Returns the number of runs reset.
    pub fn reset_feature_runs(&mut self, project_id: &str, feature_id: &str) -> Result<usize> {
        let mut project = self.load(project_id)?;
        if project.find_feature(feature_id).is_none() {
            return Err(Error::NotFound(format!("Feature not found: {}", feature_id)));
        }

        let mut count = 0;
        for index in 0..project.runs.len() {
            let run = &project.runs[index];
            if run.feature_id != feature_id {
                continue;
            }
            if let Some(open) = open_sibling(&project, run) {
                tracing::debug!(run = %run.id, open = %open.id, "skipping reset, sibling run in progress");
                continue;
            }
            project.runs[index].reset();
            count += 1;
        }

        self.save(&project)?;
        tracing::info!(project = %project_id, feature = %feature_id, count, "reset feature runs");
        Ok(count)
    }

    /// Delete every run in a project. Returns the number of runs deleted.
    pub fn reset_all_runs(&mut self, project_id: &str) -> Result<usize> {
        let mut project = self.load(project_id)?;
        let count = project.runs.len();
        project.runs.clear();

        self.save(&project)?;
        tracing::info!(project = %project_id, count, "deleted all runs");
        Ok(count)
    }

    // === Export / Import ===

    /// Serialize a project as a portable, pretty-printed JSON document.
    pub fn export_project(&self, project_id: &str) -> Result<String> {
        let project = self.load(project_id)?;
        Ok(serde_json::to_string_pretty(&project)?)
    }

    /// Store a project from an exported JSON document.
    ///
    /// An existing project with the same id is overwritten.
    pub fn import_project(&mut self, json: &str) -> Result<Project> {
        let project: Project = serde_json::from_str(json)?;
        if project.id.trim().is_empty() {
            return Err(Error::InvalidInput("Imported project has no id".to_string()));
        }

        let replaced = self.backend.get(&project.id)?.is_some();
        self.save(&project)?;
        tracing::info!(project = %project.id, replaced, "imported project");
        Ok(project)
    }
}

fn find_run<'a>(project: &'a Project, run_id: &str) -> Result<&'a TestRun> {
    project
        .find_run(run_id)
        .ok_or_else(|| Error::NotFound(format!("Run not found: {}", run_id)))
}

/// Another in-progress run with the same feature, environment and version.
fn open_sibling<'a>(project: &'a Project, run: &TestRun) -> Option<&'a TestRun> {
    project.runs.iter().find(|r| {
        r.id != run.id
            && r.feature_id == run.feature_id
            && r.environment == run.environment
            && r.version == run.version
            && r.status == RunStatus::InProgress
    })
}

fn validate_version(version: &str) -> Result<&str> {
    let version = version.trim();
    if version.is_empty() {
        return Err(Error::InvalidInput("Version cannot be empty".to_string()));
    }
    Ok(version)
}

/// Resolve the data directory.
///
/// Order: explicit path, then `BDT_DATA_DIR`, then `<platform data dir>/bddtrack`.
pub fn get_data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(data_dir.join("bddtrack"))
}

/// Open the selected backend in `data_dir`.
pub fn open_backend(backend_type: BackendType, data_dir: &Path) -> Result<Box<dyn ProjectBackend>> {
    let backend: Box<dyn ProjectBackend> = match backend_type {
        BackendType::Sqlite => Box::new(SqliteBackend::open(data_dir)?),
        BackendType::File => Box::new(FileBackend::open(data_dir)?),
        BackendType::Memory => Box::new(MemoryBackend::new()),
    };
    tracing::debug!(backend = %backend_type, location = %backend.location(), "opened backend");
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RunSummary;
    use crate::test_utils::{TestEnv, memory_store};
    use serial_test::serial;

    const LOGIN: &str = "Feature: Login
Scenario: Valid login
Given I am on the login page
When I submit valid credentials
Then I see the dashboard";

    const LOGIN_V2: &str = "Feature: Login
Scenario: Valid login
Given I am on the login page
When I submit valid credentials
Then I see the dashboard
Scenario: Locked account
Given my account is locked
When I submit valid credentials
Then I see a lockout message";

    fn setup<B: ProjectBackend>(store: &mut ProjectStore<B>) -> (String, String) {
        let project = store.create_project("Shop", None).unwrap();
        let upload = store.upload_feature(&project.id, "login.feature", LOGIN).unwrap();
        (project.id, upload.feature_id().to_string())
    }

    // === Project Tests ===

    #[test]
    fn test_create_and_list_projects() {
        let mut store = memory_store();
        store.create_project("Zeta", Some("  last  ")).unwrap();
        store.create_project("Alpha", Some("   ")).unwrap();

        let projects = store.list_projects().unwrap();
        let names: Vec<&str> = projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
        assert_eq!(projects[0].description, None);
        assert_eq!(projects[1].description.as_deref(), Some("last"));
    }

    #[test]
    fn test_create_project_rejects_blank_name() {
        let mut store = memory_store();
        let err = store.create_project("  ", None).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_get_and_delete_project() {
        let mut store = memory_store();
        let project = store.create_project("Shop", None).unwrap();

        assert_eq!(store.get_project(&project.id).unwrap().name, "Shop");
        store.delete_project(&project.id).unwrap();
        assert!(matches!(store.get_project(&project.id), Err(Error::NotFound(_))));
        assert!(matches!(store.delete_project(&project.id), Err(Error::NotFound(_))));
    }

    // === Feature Tests ===

    #[test]
    fn test_upload_adds_feature() {
        let mut store = memory_store();
        let (project_id, feature_id) = setup(&mut store);

        let feature = store.get_feature(&project_id, &feature_id).unwrap();
        assert_eq!(feature.name, "Login");
        assert_eq!(feature.scenarios.len(), 1);
        assert_eq!(feature.source_file.name, "login.feature");
    }

    #[test]
    fn test_identical_upload_is_noop() {
        let mut store = memory_store();
        let (project_id, feature_id) = setup(&mut store);

        let upload = store.upload_feature(&project_id, "login.feature", LOGIN).unwrap();
        assert_eq!(upload, FeatureUpload::Unchanged { feature_id });
        assert_eq!(store.get_project(&project_id).unwrap().features.len(), 1);
    }

    #[test]
    fn test_reupload_replaces_and_purges_runs() {
        let mut store = memory_store();
        let (project_id, feature_id) = setup(&mut store);
        let other = store
            .upload_feature(&project_id, "cart.feature", "Feature: Cart\nScenario: Add")
            .unwrap();

        store
            .get_or_create_run(&project_id, &feature_id, Environment::Staging, "v1")
            .unwrap();
        store
            .get_or_create_run(&project_id, &feature_id, Environment::Production, "v1")
            .unwrap();
        let kept = store
            .get_or_create_run(&project_id, other.feature_id(), Environment::Staging, "v1")
            .unwrap();

        let old_scenario_id = store.get_feature(&project_id, &feature_id).unwrap().scenarios[0]
            .id
            .clone();

        let upload = store.upload_feature(&project_id, "login.feature", LOGIN_V2).unwrap();
        let FeatureUpload::Replaced {
            feature_id: new_id,
            previous_id,
            purged_runs,
        } = upload.clone()
        else {
            panic!("expected replace, got {:?}", upload);
        };
        assert_eq!(previous_id, feature_id);
        assert_ne!(new_id, feature_id);
        assert_eq!(purged_runs, 2);

        let project = store.get_project(&project_id).unwrap();
        // Replaced in the same slot
        assert_eq!(project.features[0].id, new_id);
        assert_eq!(project.features[0].scenarios.len(), 2);
        assert_ne!(project.features[0].scenarios[0].id, old_scenario_id);
        assert_eq!(project.runs.len(), 1);
        assert_eq!(project.runs[0].id, kept.id);
    }

    #[test]
    fn test_upload_to_missing_project() {
        let mut store = memory_store();
        let err = store.upload_feature("nope", "a.feature", LOGIN).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    // === Run Tests ===

    #[test]
    fn test_get_or_create_run_is_idempotent() {
        let mut store = memory_store();
        let (project_id, feature_id) = setup(&mut store);

        let first = store
            .get_or_create_run(&project_id, &feature_id, Environment::Staging, "v1")
            .unwrap();
        let scenario_id = first.scenarios[0].id.clone();
        store
            .set_scenario_result(&project_id, &first.id, &scenario_id, Outcome::Passed)
            .unwrap();

        let second = store
            .get_or_create_run(&project_id, &feature_id, Environment::Staging, "v1")
            .unwrap();
        assert_eq!(second.id, first.id);
        // Progress is kept
        assert_eq!(second.summary.passed, 1);
        assert_eq!(store.list_runs(&project_id, None, None).unwrap().len(), 1);
    }

    #[test]
    fn test_new_run_after_completion() {
        let mut store = memory_store();
        let (project_id, feature_id) = setup(&mut store);

        let first = store
            .get_or_create_run(&project_id, &feature_id, Environment::Staging, "v1")
            .unwrap();
        store.complete_run(&project_id, &first.id).unwrap();

        let second = store
            .get_or_create_run(&project_id, &feature_id, Environment::Staging, "v1")
            .unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(second.status, RunStatus::InProgress);
        assert_eq!(
            store.get_run(&project_id, &first.id).unwrap().status,
            RunStatus::Completed
        );
    }

    #[test]
    fn test_paused_run_is_not_reused() {
        let mut store = memory_store();
        let (project_id, feature_id) = setup(&mut store);

        let mut paused = store
            .get_or_create_run(&project_id, &feature_id, Environment::Staging, "v1")
            .unwrap();
        paused.status = RunStatus::Paused;
        store.update_run(&project_id, &paused).unwrap();

        let run = store
            .get_or_create_run(&project_id, &feature_id, Environment::Staging, "v1")
            .unwrap();
        assert_ne!(run.id, paused.id);
        assert_eq!(run.status, RunStatus::InProgress);
        assert_eq!(
            store.get_run(&project_id, &paused.id).unwrap().status,
            RunStatus::Paused
        );
    }

    #[test]
    fn test_runs_keyed_by_environment_and_version() {
        let mut store = memory_store();
        let (project_id, feature_id) = setup(&mut store);

        let a = store
            .get_or_create_run(&project_id, &feature_id, Environment::Staging, "v1")
            .unwrap();
        let b = store
            .get_or_create_run(&project_id, &feature_id, Environment::Uat, "v1")
            .unwrap();
        let c = store
            .get_or_create_run(&project_id, &feature_id, Environment::Staging, "v2")
            .unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.id, c.id);

        let staging = store
            .list_runs(&project_id, Some(&feature_id), Some(Environment::Staging))
            .unwrap();
        assert_eq!(staging.len(), 2);
        // Newest first
        assert_eq!(staging[0].id, c.id);
    }

    #[test]
    fn test_get_or_create_run_errors() {
        let mut store = memory_store();
        let (project_id, feature_id) = setup(&mut store);

        assert!(matches!(
            store.get_or_create_run(&project_id, "missing", Environment::Staging, "v1"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.get_or_create_run("missing", &feature_id, Environment::Staging, "v1"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.get_or_create_run(&project_id, &feature_id, Environment::Staging, "  "),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_start_run_rejects_existing_version() {
        let mut store = memory_store();
        let (project_id, feature_id) = setup(&mut store);

        let run = store
            .start_run(&project_id, &feature_id, Environment::Staging, "v1")
            .unwrap();

        // In progress
        let err = store
            .start_run(&project_id, &feature_id, Environment::Staging, "v1")
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // Completed
        store.complete_run(&project_id, &run.id).unwrap();
        let before = store.get_project(&project_id).unwrap();
        let err = store
            .start_run(&project_id, &feature_id, Environment::Staging, " v1 ")
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(store.get_project(&project_id).unwrap(), before);

        // Other environment is fine
        store
            .start_run(&project_id, &feature_id, Environment::Production, "v1")
            .unwrap();
    }

    #[test]
    fn test_update_run_replaces_or_appends() {
        let mut store = memory_store();
        let (project_id, feature_id) = setup(&mut store);
        let mut run = store
            .get_or_create_run(&project_id, &feature_id, Environment::Staging, "v1")
            .unwrap();

        run.version = "v1-hotfix".to_string();
        store.update_run(&project_id, &run).unwrap();
        assert_eq!(store.get_run(&project_id, &run.id).unwrap().version, "v1-hotfix");

        let mut copy = run.clone();
        copy.id = "imported-run".to_string();
        store.update_run(&project_id, &copy).unwrap();
        assert_eq!(store.list_runs(&project_id, None, None).unwrap().len(), 2);
    }

    #[test]
    fn test_mutate_run_failure_writes_nothing() {
        let mut store = memory_store();
        let (project_id, feature_id) = setup(&mut store);
        let run = store
            .get_or_create_run(&project_id, &feature_id, Environment::Staging, "v1")
            .unwrap();
        let scenario_id = run.scenarios[0].id.clone();

        let ids = vec![scenario_id, "missing".to_string()];
        let err = store
            .bulk_set_result(&project_id, &run.id, &ids, Outcome::Passed)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(store.get_run(&project_id, &run.id).unwrap(), run);
    }

    #[test]
    fn test_locked_run_ignores_results_but_accepts_notes() {
        let mut store = memory_store();
        let (project_id, feature_id) = setup(&mut store);
        let run = store
            .get_or_create_run(&project_id, &feature_id, Environment::Staging, "v1")
            .unwrap();
        let scenario_id = run.scenarios[0].id.clone();
        let step_id = run.scenarios[0].steps[0].id.clone();
        let completed = store.complete_run(&project_id, &run.id).unwrap().unwrap();

        let update = store
            .set_step_result(&project_id, &run.id, &step_id, Outcome::Failed)
            .unwrap();
        assert!(!update.applied);
        let update = store
            .set_scenario_result(&project_id, &run.id, &scenario_id, Outcome::Failed)
            .unwrap();
        assert!(!update.applied);
        assert_eq!(store.get_run(&project_id, &run.id).unwrap(), completed);

        let run = store
            .set_scenario_note(&project_id, &run.id, &scenario_id, "checked later")
            .unwrap();
        assert_eq!(run.scenarios[0].note.as_deref(), Some("checked later"));

        let attachment = Attachment::new(
            store.next_id(),
            "trace.txt".to_string(),
            "text/plain",
            "data:text/plain;base64,eA==".to_string(),
        );
        let run = store
            .add_step_attachment(&project_id, &run.id, &step_id, attachment)
            .unwrap();
        assert_eq!(run.scenarios[0].steps[0].attachments.len(), 1);
        assert_eq!(
            store.get_run(&project_id, &run.id).unwrap().scenarios[0].steps[0]
                .attachments
                .len(),
            1
        );
    }

    #[test]
    fn test_complete_missing_run_is_noop() {
        let mut store = memory_store();
        let (project_id, _) = setup(&mut store);
        let before = store.get_project(&project_id).unwrap();

        assert!(store.complete_run(&project_id, "missing").unwrap().is_none());
        assert_eq!(store.get_project(&project_id).unwrap(), before);
        assert!(matches!(
            store.complete_run("missing", "missing"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_reset_run_reopens() {
        let mut store = memory_store();
        let (project_id, feature_id) = setup(&mut store);
        let run = store
            .get_or_create_run(&project_id, &feature_id, Environment::Staging, "v1")
            .unwrap();
        let scenario_id = run.scenarios[0].id.clone();
        store
            .set_scenario_result(&project_id, &run.id, &scenario_id, Outcome::Failed)
            .unwrap();
        store.complete_run(&project_id, &run.id).unwrap();

        let run = store.reset_run(&project_id, &run.id).unwrap();
        assert_eq!(run.status, RunStatus::InProgress);
        assert!(!run.is_locked);
        assert_eq!(run.summary, RunSummary::all_untested(1));
    }

    #[test]
    fn test_reset_feature_runs_and_reset_all() {
        let mut store = memory_store();
        let (project_id, feature_id) = setup(&mut store);
        for version in ["v1", "v2"] {
            let run = store
                .get_or_create_run(&project_id, &feature_id, Environment::Staging, version)
                .unwrap();
            let scenario_id = run.scenarios[0].id.clone();
            store
                .set_scenario_result(&project_id, &run.id, &scenario_id, Outcome::Passed)
                .unwrap();
            store.complete_run(&project_id, &run.id).unwrap();
        }

        assert_eq!(store.reset_feature_runs(&project_id, &feature_id).unwrap(), 2);
        let runs = store.list_runs(&project_id, None, None).unwrap();
        assert!(runs.iter().all(|r| r.status == RunStatus::InProgress && r.summary.untested == 1));

        assert!(matches!(
            store.reset_feature_runs(&project_id, "missing"),
            Err(Error::NotFound(_))
        ));

        assert_eq!(store.reset_all_runs(&project_id).unwrap(), 2);
        assert!(store.list_runs(&project_id, None, None).unwrap().is_empty());
        // Features survive
        assert_eq!(store.get_project(&project_id).unwrap().features.len(), 1);
    }

    #[test]
    fn test_reset_keeps_one_open_run_per_version() {
        let mut store = memory_store();
        let (project_id, feature_id) = setup(&mut store);

        let first = store
            .get_or_create_run(&project_id, &feature_id, Environment::Staging, "v1")
            .unwrap();
        store.complete_run(&project_id, &first.id).unwrap();
        let second = store
            .get_or_create_run(&project_id, &feature_id, Environment::Staging, "v1")
            .unwrap();
        assert_ne!(second.id, first.id);

        let before = store.get_project(&project_id).unwrap();
        assert!(matches!(
            store.reset_run(&project_id, &first.id),
            Err(Error::Conflict(_))
        ));
        assert_eq!(store.get_project(&project_id).unwrap(), before);

        // The completed run is skipped, the open one is reset in place
        assert_eq!(store.reset_feature_runs(&project_id, &feature_id).unwrap(), 1);
        let runs = store.list_runs(&project_id, None, None).unwrap();
        let open: Vec<&str> = runs
            .iter()
            .filter(|r| r.status == RunStatus::InProgress)
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(open, vec![second.id.as_str()]);
        assert_eq!(
            store.get_run(&project_id, &first.id).unwrap().status,
            RunStatus::Completed
        );
    }

    #[test]
    fn test_reset_feature_runs_reopens_one_of_two_completed() {
        let mut store = memory_store();
        let (project_id, feature_id) = setup(&mut store);
        for _ in 0..2 {
            let run = store
                .get_or_create_run(&project_id, &feature_id, Environment::Staging, "v1")
                .unwrap();
            store.complete_run(&project_id, &run.id).unwrap();
        }

        assert_eq!(store.reset_feature_runs(&project_id, &feature_id).unwrap(), 1);
        let runs = store.list_runs(&project_id, None, None).unwrap();
        let open = runs.iter().filter(|r| r.status == RunStatus::InProgress).count();
        assert_eq!(open, 1);
    }

    #[test]
    fn test_end_to_end_login() {
        let mut store = memory_store();
        let (project_id, feature_id) = setup(&mut store);

        let run = store
            .start_run(&project_id, &feature_id, Environment::Staging, "v1")
            .unwrap();
        let scenario_id = run.scenarios[0].id.clone();

        let update = store
            .set_scenario_result(&project_id, &run.id, &scenario_id, Outcome::Passed)
            .unwrap();
        assert!(update.applied);
        assert_eq!(
            update.run.summary,
            RunSummary {
                total: 1,
                passed: 1,
                failed: 0,
                skipped: 0,
                untested: 0,
            }
        );
        assert!(update.run.scenarios[0]
            .steps
            .iter()
            .all(|s| s.result == Outcome::Passed));

        let completed = store.complete_run(&project_id, &run.id).unwrap().unwrap();
        assert_eq!(completed.status, RunStatus::Completed);
        assert!(completed.is_locked);
        assert!(completed.completed_at.is_some());

        for step in &completed.scenarios[0].steps {
            let update = store
                .set_step_result(&project_id, &run.id, &step.id, Outcome::Failed)
                .unwrap();
            assert!(!update.applied);
        }
        assert_eq!(store.get_run(&project_id, &run.id).unwrap(), completed);
    }

    // === Export / Import Tests ===

    #[test]
    fn test_export_import_roundtrip() {
        let mut store = memory_store();
        let (project_id, feature_id) = setup(&mut store);
        store
            .get_or_create_run(&project_id, &feature_id, Environment::Uat, "v9")
            .unwrap();

        let json = store.export_project(&project_id).unwrap();
        assert!(json.contains("\"featureId\""));
        assert!(json.contains("\"sourceFile\""));

        let mut other = memory_store();
        let imported = other.import_project(&json).unwrap();
        assert_eq!(imported, store.get_project(&project_id).unwrap());
        assert_eq!(other.list_projects().unwrap().len(), 1);

        // Importing again overwrites
        other.import_project(&json).unwrap();
        assert_eq!(other.list_projects().unwrap().len(), 1);
    }

    #[test]
    fn test_import_rejects_garbage() {
        let mut store = memory_store();
        assert!(matches!(store.import_project("{"), Err(Error::Json(_))));
    }

    // === Backend Tests ===

    #[test]
    fn test_sqlite_store_persists() {
        let env = TestEnv::new();
        let project_id = {
            let mut store = env.sqlite_store();
            let (project_id, feature_id) = setup(&mut store);
            store
                .get_or_create_run(&project_id, &feature_id, Environment::Staging, "v1")
                .unwrap();
            project_id
        };

        let store = env.sqlite_store();
        let project = store.get_project(&project_id).unwrap();
        assert_eq!(project.features.len(), 1);
        assert_eq!(project.runs.len(), 1);
    }

    #[test]
    fn test_open_backend_each_type() {
        let env = TestEnv::new();
        for backend_type in [BackendType::Sqlite, BackendType::File, BackendType::Memory] {
            let backend = open_backend(backend_type, env.data_path()).unwrap();
            assert_eq!(backend.backend_type(), backend_type);

            let mut store = ProjectStore::new(backend, Arc::new(crate::ids::SequentialIds::new("b")));
            let (project_id, _) = setup(&mut store);
            assert!(store.get_project(&project_id).is_ok());
        }
    }

    #[test]
    #[serial]
    fn test_get_data_dir_precedence() {
        let explicit = PathBuf::from("/tmp/explicit");
        // SAFETY: serialized with other env-mutating tests
        unsafe { std::env::set_var(DATA_DIR_ENV, "/tmp/from-env") };
        assert_eq!(get_data_dir(Some(&explicit)).unwrap(), explicit);
        assert_eq!(get_data_dir(None).unwrap(), PathBuf::from("/tmp/from-env"));

        unsafe { std::env::remove_var(DATA_DIR_ENV) };
        let default = get_data_dir(None).unwrap();
        assert!(default.ends_with("bddtrack"));
    }
}
