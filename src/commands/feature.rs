//! Feature commands.

use super::{Output, json, plural};
use crate::models::Feature;
use crate::storage::{FeatureUpload, ProjectBackend, ProjectStore};
use crate::{Error, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct FeatureUploaded {
    #[serde(flatten)]
    pub upload: FeatureUpload,
    pub name: String,
    pub file: String,
    pub scenarios: usize,
    pub steps: usize,
}

impl Output for FeatureUploaded {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let counts = format!(
            "{}, {}",
            plural(self.scenarios, "scenario"),
            plural(self.steps, "step")
        );
        match &self.upload {
            FeatureUpload::Added { feature_id } => {
                format!("Added feature {} \"{}\" ({})", feature_id, self.name, counts)
            }
            FeatureUpload::Unchanged { feature_id } => {
                format!("Feature {} \"{}\" is unchanged", feature_id, self.name)
            }
            FeatureUpload::Replaced {
                feature_id,
                previous_id,
                purged_runs,
            } => format!(
                "Replaced feature {} with {} \"{}\" ({}); removed {}",
                previous_id,
                feature_id,
                self.name,
                counts,
                plural(*purged_runs, "stale run")
            ),
        }
    }
}

/// Upload a `.feature` file into a project.
pub fn feature_upload<B: ProjectBackend>(
    store: &mut ProjectStore<B>,
    project_id: &str,
    file: &Path,
) -> Result<FeatureUploaded> {
    let is_feature = file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("feature"));
    if !is_feature {
        return Err(Error::InvalidInput(format!(
            "Only .feature files can be uploaded: {}",
            file.display()
        )));
    }

    let content = fs::read_to_string(file)?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.display().to_string());

    let upload = store.upload_feature(project_id, &file_name, &content)?;
    let feature = store.get_feature(project_id, upload.feature_id())?;

    Ok(FeatureUploaded {
        upload,
        name: feature.name.clone(),
        file: file_name,
        scenarios: feature.scenarios.len(),
        steps: feature.step_count(),
    })
}

#[derive(Serialize)]
pub struct FeatureSummary {
    pub id: String,
    pub name: String,
    pub file: String,
    pub hash: String,
    pub scenarios: usize,
    pub steps: usize,
}

#[derive(Serialize)]
pub struct FeatureList {
    pub features: Vec<FeatureSummary>,
    pub count: usize,
}

impl Output for FeatureList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.features.is_empty() {
            return "No features.".to_string();
        }
        let mut lines = vec![format!("{}:", plural(self.count, "feature"))];
        for f in &self.features {
            lines.push(format!(
                "  {} {} [{}] {}, {}",
                f.id,
                f.name,
                f.file,
                plural(f.scenarios, "scenario"),
                plural(f.steps, "step")
            ));
        }
        lines.join("\n")
    }
}

/// List features in a project.
pub fn feature_list<B: ProjectBackend>(store: &ProjectStore<B>, project_id: &str) -> Result<FeatureList> {
    let project = store.get_project(project_id)?;
    let features: Vec<FeatureSummary> = project
        .features
        .iter()
        .map(|f| FeatureSummary {
            id: f.id.clone(),
            name: f.name.clone(),
            file: f.source_file.name.clone(),
            hash: f.source_file.hash.clone(),
            scenarios: f.scenarios.len(),
            steps: f.step_count(),
        })
        .collect();
    let count = features.len();
    Ok(FeatureList { features, count })
}

/// A feature with its scenario and step tree.
#[derive(Serialize)]
#[serde(transparent)]
pub struct FeatureDetail(pub Feature);

impl Output for FeatureDetail {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let feature = &self.0;
        let mut lines = vec![format!("{} Feature: {}", feature.id, feature.name)];
        if !feature.description.is_empty() {
            lines.push(format!("  {}", feature.description));
        }
        for scenario in &feature.scenarios {
            lines.push(format!("  {} Scenario: {}", scenario.id, scenario.name));
            for step in &scenario.steps {
                lines.push(format!("    {} {} {}", step.id, step.keyword, step.text));
            }
        }
        lines.join("\n")
    }
}

/// Show a feature.
pub fn feature_show<B: ProjectBackend>(
    store: &ProjectStore<B>,
    project_id: &str,
    feature_id: &str,
) -> Result<FeatureDetail> {
    Ok(FeatureDetail(store.get_feature(project_id, feature_id)?))
}
