//! Test run lifecycle.
//!
//! In-memory transitions of a [`TestRun`]: snapshotting a feature, recording
//! step and scenario results, notes and attachments, completing and resetting.
//! Persistence is handled by [`crate::storage::ProjectStore`], which loads a
//! run, applies one of these operations and writes the project back.
//!
//! ```text
//!   snapshot ──> in_progress ──complete──> completed (locked)
//!                    ^                          │
//!                    └────────── reset ─────────┘
//! ```
//!
//! Result-changing operations on a completed run are ignored and report
//! `false`. Notes and attachments can still be added after completion.

use crate::models::status::{run_summary, scenario_status};
use crate::models::{
    Attachment, Environment, Feature, Outcome, RunStatus, RunSummary, Scenario, Step, TestRun,
};
use crate::{Error, Result};
use chrono::Utc;

impl TestRun {
    /// Create a new in-progress run from a feature's current scenarios.
    ///
    /// The scenarios are deep-copied: later edits to the run never reach the
    /// feature template, and vice versa.
    pub fn snapshot(feature: &Feature, environment: Environment, version: &str, id: String) -> Self {
        let scenarios: Vec<Scenario> = feature
            .scenarios
            .iter()
            .cloned()
            .map(|mut scenario| {
                scenario.status = Outcome::Untested;
                for step in &mut scenario.steps {
                    step.result = Outcome::Untested;
                }
                scenario
            })
            .collect();

        Self {
            id,
            feature_id: feature.id.clone(),
            created_at: Utc::now(),
            environment,
            version: version.to_string(),
            summary: RunSummary::all_untested(scenarios.len()),
            scenarios,
            status: RunStatus::InProgress,
            completed_at: None,
            is_locked: false,
        }
    }

    /// Whether step and scenario results may still change.
    pub fn is_mutable(&self) -> bool {
        !self.is_locked && self.status != RunStatus::Completed
    }

    /// Record a single step result and re-derive its scenario's status.
    ///
    /// Returns `Ok(false)` when the run is locked.
    pub fn set_step_result(&mut self, step_id: &str, result: Outcome) -> Result<bool> {
        if !self.is_mutable() {
            return Ok(false);
        }

        let scenario = self
            .scenarios
            .iter_mut()
            .find(|s| s.has_step(step_id))
            .ok_or_else(|| Error::NotFound(format!("Step not found: {}", step_id)))?;

        if let Some(step) = scenario.steps.iter_mut().find(|s| s.id == step_id) {
            step.result = result;
        }
        scenario.status = scenario_status(scenario);

        self.refresh_summary();
        Ok(true)
    }

    /// Assert a whole scenario's outcome, overriding every step.
    ///
    /// Returns `Ok(false)` when the run is locked.
    pub fn set_scenario_result(&mut self, scenario_id: &str, result: Outcome) -> Result<bool> {
        if !self.is_mutable() {
            return Ok(false);
        }

        let scenario = self.scenario_mut(scenario_id)?;
        apply_scenario_result(scenario, result);

        self.refresh_summary();
        Ok(true)
    }

    /// Apply [`TestRun::set_scenario_result`] to several scenarios at once.
    ///
    /// All ids are checked before anything changes.
    pub fn bulk_set_result(&mut self, scenario_ids: &[String], result: Outcome) -> Result<bool> {
        if !self.is_mutable() {
            return Ok(false);
        }

        if let Some(missing) = scenario_ids
            .iter()
            .find(|id| !self.scenarios.iter().any(|s| &s.id == *id))
        {
            return Err(Error::NotFound(format!("Scenario not found: {}", missing)));
        }

        for scenario in &mut self.scenarios {
            if scenario_ids.contains(&scenario.id) {
                apply_scenario_result(scenario, result);
            }
        }

        self.refresh_summary();
        Ok(true)
    }

    /// Return every result to untested and reopen the run.
    ///
    /// This is the one operation allowed on a completed run.
    pub fn reset(&mut self) {
        for scenario in &mut self.scenarios {
            apply_scenario_result(scenario, Outcome::Untested);
        }
        self.summary = RunSummary::all_untested(self.scenarios.len());
        self.status = RunStatus::InProgress;
        self.completed_at = None;
        self.is_locked = false;
    }

    /// Complete and lock the run.
    ///
    /// Untested scenarios are allowed. Returns `false` if the run was
    /// already completed.
    pub fn complete(&mut self) -> bool {
        if self.status == RunStatus::Completed {
            return false;
        }
        self.status = RunStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.is_locked = true;
        true
    }

    /// Set or clear (blank text) a scenario note.
    pub fn set_scenario_note(&mut self, scenario_id: &str, note: &str) -> Result<()> {
        let scenario = self.scenario_mut(scenario_id)?;
        scenario.note = normalize_note(note);
        Ok(())
    }

    /// Set or clear (blank text) a step note.
    pub fn set_step_note(&mut self, step_id: &str, note: &str) -> Result<()> {
        let step = self.step_mut(step_id)?;
        step.note = normalize_note(note);
        Ok(())
    }

    pub fn add_scenario_attachment(&mut self, scenario_id: &str, attachment: Attachment) -> Result<()> {
        self.scenario_mut(scenario_id)?.attachments.push(attachment);
        Ok(())
    }

    pub fn add_step_attachment(&mut self, step_id: &str, attachment: Attachment) -> Result<()> {
        self.step_mut(step_id)?.attachments.push(attachment);
        Ok(())
    }

    pub fn find_scenario(&self, scenario_id: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.id == scenario_id)
    }

    pub fn find_step(&self, step_id: &str) -> Option<&Step> {
        self.scenarios
            .iter()
            .flat_map(|s| s.steps.iter())
            .find(|s| s.id == step_id)
    }

    fn scenario_mut(&mut self, scenario_id: &str) -> Result<&mut Scenario> {
        self.scenarios
            .iter_mut()
            .find(|s| s.id == scenario_id)
            .ok_or_else(|| Error::NotFound(format!("Scenario not found: {}", scenario_id)))
    }

    fn step_mut(&mut self, step_id: &str) -> Result<&mut Step> {
        self.scenarios
            .iter_mut()
            .flat_map(|s| s.steps.iter_mut())
            .find(|s| s.id == step_id)
            .ok_or_else(|| Error::NotFound(format!("Step not found: {}", step_id)))
    }

    fn refresh_summary(&mut self) {
        self.summary = run_summary(&self.scenarios);
    }
}

fn apply_scenario_result(scenario: &mut Scenario, result: Outcome) {
    scenario.status = result;
    for step in &mut scenario.steps {
        step.result = result;
    }
}

fn normalize_note(note: &str) -> Option<String> {
    let trimmed = note.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
