//! Test run commands.

use super::{Output, json, plural};
use crate::docs::outcome_icon;
use crate::models::{Attachment, Environment, Outcome, RunSummary, TestRun};
use crate::report::filter_scenarios;
use crate::storage::{ProjectBackend, ProjectStore, RunUpdate};
use crate::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Step or scenario a note or attachment is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    Step(&'a str),
    Scenario(&'a str),
}

impl<'a> Target<'a> {
    /// Build from the mutually exclusive `--step` / `--scenario` flags.
    pub fn from_args(step: Option<&'a str>, scenario: Option<&'a str>) -> Result<Self> {
        match (step, scenario) {
            (Some(step), None) => Ok(Target::Step(step)),
            (None, Some(scenario)) => Ok(Target::Scenario(scenario)),
            _ => Err(Error::InvalidInput(
                "Specify exactly one of --step or --scenario".to_string(),
            )),
        }
    }
}

/// A run, optionally showing only scenarios with one status.
#[derive(Serialize)]
pub struct RunDetail {
    pub feature_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_filter: Option<Outcome>,
    pub run: TestRun,
}

impl RunDetail {
    fn new(feature_name: String, mut run: TestRun, status_filter: Option<Outcome>) -> Self {
        if status_filter.is_some() {
            run.scenarios = filter_scenarios(&run, status_filter)
                .into_iter()
                .cloned()
                .collect();
        }
        Self {
            feature_name,
            status_filter,
            run,
        }
    }
}

fn summary_line(summary: &RunSummary) -> String {
    format!(
        "{} total: {} passed, {} failed, {} skipped, {} untested",
        summary.total, summary.passed, summary.failed, summary.skipped, summary.untested
    )
}

impl Output for RunDetail {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let run = &self.run;
        let lock = if run.is_locked { " [locked]" } else { "" };
        let mut lines = vec![
            format!(
                "{} {} ({} {}) {}{}",
                run.id, self.feature_name, run.environment, run.version, run.status, lock
            ),
            format!("  {}", summary_line(&run.summary)),
        ];
        if let Some(filter) = self.status_filter {
            lines.push(format!("  showing {} scenarios only", filter));
        }

        for scenario in &run.scenarios {
            lines.push(format!(
                "  {} {} {}",
                outcome_icon(scenario.status),
                scenario.id,
                scenario.name
            ));
            if let Some(note) = &scenario.note {
                lines.push(format!("      note: {}", note));
            }
            for attachment in &scenario.attachments {
                lines.push(format!("      attachment: {} ({})", attachment.name, attachment.kind));
            }
            for step in &scenario.steps {
                lines.push(format!(
                    "    {} {} {} {}",
                    outcome_icon(step.result),
                    step.id,
                    step.keyword,
                    step.text
                ));
                if let Some(note) = &step.note {
                    lines.push(format!("        note: {}", note));
                }
                for attachment in &step.attachments {
                    lines.push(format!(
                        "        attachment: {} ({})",
                        attachment.name, attachment.kind
                    ));
                }
            }
        }
        lines.join("\n")
    }
}

fn feature_name<B: ProjectBackend>(store: &ProjectStore<B>, project_id: &str, run: &TestRun) -> String {
    store
        .get_feature(project_id, &run.feature_id)
        .map(|f| f.name)
        .unwrap_or_default()
}

fn detail<B: ProjectBackend>(store: &ProjectStore<B>, project_id: &str, run: TestRun) -> RunDetail {
    let name = feature_name(store, project_id, &run);
    RunDetail::new(name, run, None)
}

/// Start a run for a new version label.
pub fn run_start<B: ProjectBackend>(
    store: &mut ProjectStore<B>,
    project_id: &str,
    feature_id: &str,
    environment: Environment,
    version: &str,
) -> Result<RunDetail> {
    let run = store.start_run(project_id, feature_id, environment, version)?;
    Ok(detail(store, project_id, run))
}

/// Resume or start the in-progress run for a version.
pub fn run_open<B: ProjectBackend>(
    store: &mut ProjectStore<B>,
    project_id: &str,
    feature_id: &str,
    environment: Environment,
    version: &str,
) -> Result<RunDetail> {
    let run = store.get_or_create_run(project_id, feature_id, environment, version)?;
    Ok(detail(store, project_id, run))
}

/// Show a run.
pub fn run_show<B: ProjectBackend>(
    store: &ProjectStore<B>,
    project_id: &str,
    run_id: &str,
    status: Option<Outcome>,
) -> Result<RunDetail> {
    let run = store.get_run(project_id, run_id)?;
    let name = feature_name(store, project_id, &run);
    Ok(RunDetail::new(name, run, status))
}

#[derive(Serialize)]
pub struct RunRow {
    pub id: String,
    pub feature_id: String,
    pub environment: Environment,
    pub version: String,
    pub status: String,
    pub is_locked: bool,
    pub summary: RunSummary,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct RunList {
    pub runs: Vec<RunRow>,
    pub count: usize,
}

impl Output for RunList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.runs.is_empty() {
            return "No runs.".to_string();
        }
        let mut lines = vec![format!("{}:", plural(self.count, "run"))];
        for run in &self.runs {
            lines.push(format!(
                "  {} {} {} {} [{}]",
                run.id,
                run.environment,
                run.version,
                run.status,
                summary_line(&run.summary)
            ));
        }
        lines.join("\n")
    }
}

/// List runs, newest first.
pub fn run_list<B: ProjectBackend>(
    store: &ProjectStore<B>,
    project_id: &str,
    feature_id: Option<&str>,
    environment: Option<Environment>,
) -> Result<RunList> {
    let runs: Vec<RunRow> = store
        .list_runs(project_id, feature_id, environment)?
        .into_iter()
        .map(|r| RunRow {
            id: r.id,
            feature_id: r.feature_id,
            environment: r.environment,
            version: r.version,
            status: r.status.to_string(),
            is_locked: r.is_locked,
            summary: r.summary,
            created_at: r.created_at.to_rfc3339(),
        })
        .collect();
    let count = runs.len();
    Ok(RunList { runs, count })
}

/// Result of a step, scenario or bulk result change.
#[derive(Serialize)]
pub struct ResultRecorded {
    pub run_id: String,
    pub target: String,
    pub outcome: Outcome,
    /// False when the run is completed and the change was ignored
    pub applied: bool,
    pub summary: RunSummary,
}

impl ResultRecorded {
    fn new(update: RunUpdate, target: String, outcome: Outcome) -> Self {
        Self {
            run_id: update.run.id,
            target,
            outcome,
            applied: update.applied,
            summary: update.run.summary,
        }
    }
}

impl Output for ResultRecorded {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if !self.applied {
            return format!(
                "Run {} is completed; {} left unchanged (reset the run to change results)",
                self.run_id, self.target
            );
        }
        format!(
            "Marked {} {} {}\n  {}",
            self.target,
            outcome_icon(self.outcome),
            self.outcome,
            summary_line(&self.summary)
        )
    }
}

pub fn run_step<B: ProjectBackend>(
    store: &mut ProjectStore<B>,
    project_id: &str,
    run_id: &str,
    step_id: &str,
    outcome: Outcome,
) -> Result<ResultRecorded> {
    let update = store.set_step_result(project_id, run_id, step_id, outcome)?;
    Ok(ResultRecorded::new(update, format!("step {}", step_id), outcome))
}

pub fn run_scenario<B: ProjectBackend>(
    store: &mut ProjectStore<B>,
    project_id: &str,
    run_id: &str,
    scenario_id: &str,
    outcome: Outcome,
) -> Result<ResultRecorded> {
    let update = store.set_scenario_result(project_id, run_id, scenario_id, outcome)?;
    Ok(ResultRecorded::new(update, format!("scenario {}", scenario_id), outcome))
}

pub fn run_bulk<B: ProjectBackend>(
    store: &mut ProjectStore<B>,
    project_id: &str,
    run_id: &str,
    scenario_ids: &[String],
    outcome: Outcome,
) -> Result<ResultRecorded> {
    let update = store.bulk_set_result(project_id, run_id, scenario_ids, outcome)?;
    Ok(ResultRecorded::new(
        update,
        plural(scenario_ids.len(), "scenario"),
        outcome,
    ))
}

#[derive(Serialize)]
pub struct NoteSet {
    pub run_id: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Output for NoteSet {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match &self.note {
            Some(note) => format!("Note on {}: {}", self.target, note),
            None => format!("Cleared note on {}", self.target),
        }
    }
}

/// Set or clear a note.
pub fn run_note<B: ProjectBackend>(
    store: &mut ProjectStore<B>,
    project_id: &str,
    run_id: &str,
    target: Target<'_>,
    text: &str,
) -> Result<NoteSet> {
    let (label, note) = match target {
        Target::Step(step_id) => {
            let run = store.set_step_note(project_id, run_id, step_id, text)?;
            let note = run.find_step(step_id).and_then(|s| s.note.clone());
            (format!("step {}", step_id), note)
        }
        Target::Scenario(scenario_id) => {
            let run = store.set_scenario_note(project_id, run_id, scenario_id, text)?;
            let note = run.find_scenario(scenario_id).and_then(|s| s.note.clone());
            (format!("scenario {}", scenario_id), note)
        }
    };
    Ok(NoteSet {
        run_id: run_id.to_string(),
        target: label,
        note,
    })
}

#[derive(Serialize)]
pub struct AttachmentAdded {
    pub run_id: String,
    pub target: String,
    pub attachment_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub mime: String,
    pub bytes: usize,
}

impl Output for AttachmentAdded {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Attached {} ({}, {} bytes) to {}",
            self.name, self.kind, self.bytes, self.target
        )
    }
}

/// Guess a MIME type from a file extension.
pub fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "zip" => "application/zip",
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        _ => "application/octet-stream",
    }
}

/// Attach a file to a step or scenario as a data URL.
pub fn run_attach<B: ProjectBackend>(
    store: &mut ProjectStore<B>,
    project_id: &str,
    run_id: &str,
    target: Target<'_>,
    file: &Path,
    mime: Option<&str>,
) -> Result<AttachmentAdded> {
    let bytes = fs::read(file)?;
    let mime = match mime {
        Some(m) if !m.trim().is_empty() => m.trim().to_string(),
        Some(_) => return Err(Error::InvalidInput("MIME type cannot be empty".to_string())),
        None => guess_mime(file).to_string(),
    };
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "attachment".to_string());

    let url = format!("data:{};base64,{}", mime, STANDARD.encode(&bytes));
    let attachment = Attachment::new(store.next_id(), name.clone(), &mime, url);
    let attachment_id = attachment.id.clone();
    let kind = attachment.kind.to_string();

    let label = match target {
        Target::Step(step_id) => {
            store.add_step_attachment(project_id, run_id, step_id, attachment)?;
            format!("step {}", step_id)
        }
        Target::Scenario(scenario_id) => {
            store.add_scenario_attachment(project_id, run_id, scenario_id, attachment)?;
            format!("scenario {}", scenario_id)
        }
    };

    Ok(AttachmentAdded {
        run_id: run_id.to_string(),
        target: label,
        attachment_id,
        name,
        kind,
        mime,
        bytes: bytes.len(),
    })
}

#[derive(Serialize)]
pub struct RunCompleted {
    pub run_id: String,
    /// False when no run with that id exists
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
}

impl Output for RunCompleted {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match (&self.completed_at, &self.summary) {
            (Some(at), Some(summary)) => format!(
                "Completed run {} at {}\n  {}",
                self.run_id,
                at,
                summary_line(summary)
            ),
            _ => format!("No run {}; nothing completed", self.run_id),
        }
    }
}

/// Complete and lock a run.
pub fn run_complete<B: ProjectBackend>(
    store: &mut ProjectStore<B>,
    project_id: &str,
    run_id: &str,
) -> Result<RunCompleted> {
    let run = store.complete_run(project_id, run_id)?;
    Ok(RunCompleted {
        run_id: run_id.to_string(),
        found: run.is_some(),
        completed_at: run
            .as_ref()
            .and_then(|r| r.completed_at)
            .map(|t| t.to_rfc3339()),
        summary: run.map(|r| r.summary),
    })
}

/// Reset a run to untested.
pub fn run_reset<B: ProjectBackend>(
    store: &mut ProjectStore<B>,
    project_id: &str,
    run_id: &str,
) -> Result<RunDetail> {
    let run = store.reset_run(project_id, run_id)?;
    Ok(detail(store, project_id, run))
}

#[derive(Serialize)]
pub struct RunsReset {
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_id: Option<String>,
    /// Runs reset (feature) or deleted (project)
    pub count: usize,
}

impl Output for RunsReset {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match &self.feature_id {
            Some(feature_id) => format!(
                "Reset {} of feature {}",
                plural(self.count, "run"),
                feature_id
            ),
            None => format!(
                "Deleted {} from project {}",
                plural(self.count, "run"),
                self.project_id
            ),
        }
    }
}

/// Reset every run of a feature.
pub fn run_reset_feature<B: ProjectBackend>(
    store: &mut ProjectStore<B>,
    project_id: &str,
    feature_id: &str,
) -> Result<RunsReset> {
    let count = store.reset_feature_runs(project_id, feature_id)?;
    Ok(RunsReset {
        project_id: project_id.to_string(),
        feature_id: Some(feature_id.to_string()),
        count,
    })
}

/// Delete every run in a project.
pub fn run_reset_all<B: ProjectBackend>(store: &mut ProjectStore<B>, project_id: &str) -> Result<RunsReset> {
    let count = store.reset_all_runs(project_id)?;
    Ok(RunsReset {
        project_id: project_id.to_string(),
        feature_id: None,
        count,
    })
}
