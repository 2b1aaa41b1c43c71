//! History, comparison and documentation commands.

use super::{Output, json, plural};
use crate::Result;
use crate::docs::{outcome_icon, render_markdown};
use crate::models::{Environment, RunSummary};
use crate::report::{Comparison, compare_versions, run_history};
use crate::storage::{ProjectBackend, ProjectStore};
use serde::Serialize;

#[derive(Serialize)]
pub struct HistoryEntry {
    pub run_id: String,
    pub environment: Environment,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub summary: RunSummary,
}

#[derive(Serialize)]
pub struct RunHistory {
    pub feature_id: String,
    pub feature_name: String,
    pub runs: Vec<HistoryEntry>,
}

impl Output for RunHistory {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.runs.is_empty() {
            return format!("No completed runs for {}.", self.feature_name);
        }
        let mut lines = vec![format!(
            "{} ({}):",
            self.feature_name,
            plural(self.runs.len(), "completed run")
        )];
        for entry in &self.runs {
            lines.push(format!(
                "  {} {} {} passed {}, failed {}, skipped {}, untested {}",
                entry.completed_at.as_deref().unwrap_or("-"),
                entry.environment,
                entry.version,
                entry.summary.passed,
                entry.summary.failed,
                entry.summary.skipped,
                entry.summary.untested
            ));
        }
        lines.join("\n")
    }
}

/// Completed runs of a feature, newest first.
pub fn report_history<B: ProjectBackend>(
    store: &ProjectStore<B>,
    project_id: &str,
    feature_id: &str,
    environment: Option<Environment>,
) -> Result<RunHistory> {
    let project = store.get_project(project_id)?;
    let feature = store.get_feature(project_id, feature_id)?;
    let runs = run_history(&project, feature_id, environment)
        .into_iter()
        .map(|r| HistoryEntry {
            run_id: r.id.clone(),
            environment: r.environment,
            version: r.version.clone(),
            completed_at: r.completed_at.map(|t| t.to_rfc3339()),
            summary: r.summary,
        })
        .collect();

    Ok(RunHistory {
        feature_id: feature.id,
        feature_name: feature.name,
        runs,
    })
}

#[derive(Debug, Serialize)]
pub struct VersionComparison {
    pub feature_id: String,
    pub environment: Environment,
    #[serde(flatten)]
    pub comparison: Comparison,
    pub changed: usize,
}

impl Output for VersionComparison {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let c = &self.comparison;
        let mut lines = vec![
            format!(
                "{} -> {} in {} ({} changed)",
                c.before_version,
                c.after_version,
                self.environment,
                plural(self.changed, "scenario")
            ),
            format!(
                "  passed {} -> {}, failed {} -> {}",
                c.before_summary.passed,
                c.after_summary.passed,
                c.before_summary.failed,
                c.after_summary.failed
            ),
        ];
        for row in &c.rows {
            let label = row.change.map(|change| change.label()).unwrap_or("");
            lines.push(format!(
                "  {} {} -> {} {} {}",
                outcome_icon(row.before),
                row.before,
                outcome_icon(row.after),
                row.after,
                row.name
            ));
            if !label.is_empty() {
                lines.push(format!("      {}", label));
            }
        }
        lines.join("\n")
    }
}

/// Compare two completed versions of a feature.
pub fn report_compare<B: ProjectBackend>(
    store: &ProjectStore<B>,
    project_id: &str,
    feature_id: &str,
    environment: Environment,
    before: &str,
    after: &str,
) -> Result<VersionComparison> {
    let project = store.get_project(project_id)?;
    let comparison = compare_versions(&project, feature_id, environment, before.trim(), after.trim())?;
    let changed = comparison.changed().count();
    Ok(VersionComparison {
        feature_id: feature_id.to_string(),
        environment,
        comparison,
        changed,
    })
}

/// Rendered Markdown for a feature.
#[derive(Serialize)]
pub struct Documentation {
    pub feature_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub markdown: String,
}

impl Output for Documentation {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        self.markdown.clone()
    }
}

/// Render a feature as Markdown, optionally with a run's results.
pub fn docs_render<B: ProjectBackend>(
    store: &ProjectStore<B>,
    project_id: &str,
    feature_id: &str,
    run_id: Option<&str>,
) -> Result<Documentation> {
    let feature = store.get_feature(project_id, feature_id)?;
    let run = run_id.map(|id| store.get_run(project_id, id)).transpose()?;
    if let Some(run) = &run {
        if run.feature_id != feature.id {
            return Err(crate::Error::InvalidInput(format!(
                "Run {} belongs to feature {}, not {}",
                run.id, run.feature_id, feature.id
            )));
        }
    }

    Ok(Documentation {
        feature_id: feature.id.clone(),
        run_id: run.as_ref().map(|r| r.id.clone()),
        markdown: render_markdown(&feature, run.as_ref()),
    })
}
