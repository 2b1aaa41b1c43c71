//! Data models for bddtrack entities.
//!
//! This module defines the core data structures:
//! - `Feature` - A parsed `.feature` file with its scenarios and source
//! - `Scenario` / `Step` - Gherkin scenarios and their Given/When/Then lines
//! - `Attachment` - Evidence (screenshots, videos, documents) attached to results
//! - `TestRun` - One manual execution of a feature against an environment and version
//! - `Project` - The top-level persisted aggregate owning features and runs
//!
//! Field names serialize in camelCase so an exported project is a portable
//! JSON document (`featureId`, `isLocked`, `sourceFile`, ...).

pub mod status;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of a step, or derived status of a scenario.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
    #[default]
    Untested,
}

impl Outcome {
    /// Get all outcomes in display order.
    pub fn all() -> &'static [Outcome] {
        &[
            Outcome::Passed,
            Outcome::Failed,
            Outcome::Skipped,
            Outcome::Untested,
        ]
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Failed => "failed",
            Outcome::Skipped => "skipped",
            Outcome::Untested => "untested",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "passed" | "pass" => Ok(Outcome::Passed),
            "failed" | "fail" => Ok(Outcome::Failed),
            "skipped" | "skip" => Ok(Outcome::Skipped),
            "untested" | "untest" => Ok(Outcome::Untested),
            _ => Err(format!("Unknown outcome: {}", s)),
        }
    }
}

/// Gherkin step keyword, kept exactly as written in the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKeyword {
    Given,
    When,
    Then,
    And,
    But,
}

impl StepKeyword {
    /// All keywords, in the order the parser tries them.
    pub fn all() -> &'static [StepKeyword] {
        &[
            StepKeyword::Given,
            StepKeyword::When,
            StepKeyword::Then,
            StepKeyword::And,
            StepKeyword::But,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepKeyword::Given => "Given",
            StepKeyword::When => "When",
            StepKeyword::Then => "Then",
            StepKeyword::And => "And",
            StepKeyword::But => "But",
        }
    }
}

impl fmt::Display for StepKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Media kind of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Video,
    Document,
    Other,
}

impl AttachmentKind {
    /// Derive the kind from a MIME type prefix.
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_lowercase();
        if mime.starts_with("image/") {
            AttachmentKind::Image
        } else if mime.starts_with("video/") {
            AttachmentKind::Video
        } else if mime.starts_with("application/") || mime.starts_with("text/") {
            AttachmentKind::Document
        } else {
            AttachmentKind::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentKind::Image => "image",
            AttachmentKind::Video => "video",
            AttachmentKind::Document => "document",
            AttachmentKind::Other => "other",
        }
    }
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Evidence attached to a step or scenario result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Unique identifier
    pub id: String,

    /// Display name (usually the original file name)
    pub name: String,

    /// Media kind derived from the MIME type
    #[serde(rename = "type")]
    pub kind: AttachmentKind,

    /// Content reference, a data URL for uploaded files
    pub url: String,

    /// Upload timestamp
    pub uploaded_at: DateTime<Utc>,
}

impl Attachment {
    /// Create a new attachment, deriving its kind from `mime`.
    pub fn new(id: String, name: String, mime: &str, url: String) -> Self {
        Self {
            id,
            name,
            kind: AttachmentKind::from_mime(mime),
            url,
            uploaded_at: Utc::now(),
        }
    }
}

/// One Given/When/Then/And/But line within a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,

    pub keyword: StepKeyword,

    /// Step text after the keyword
    pub text: String,

    /// Execution result (always untested on feature templates)
    #[serde(default)]
    pub result: Outcome,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl Step {
    /// Create a new untested step.
    pub fn new(id: String, keyword: StepKeyword, text: String) -> Self {
        Self {
            id,
            keyword,
            text,
            result: Outcome::Untested,
            note: None,
            attachments: Vec::new(),
        }
    }
}

/// A named sequence of steps.
///
/// Lives both as an untested template on a `Feature` and as a stateful copy
/// inside every `TestRun` derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub steps: Vec<Step>,

    /// Status derived from step results (see [`status::scenario_status`])
    #[serde(default)]
    pub status: Outcome,

    /// Tags (never populated by the parser)
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl Scenario {
    /// Create a new empty, untested scenario.
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            steps: Vec::new(),
            status: Outcome::Untested,
            tags: Vec::new(),
            note: None,
            attachments: Vec::new(),
        }
    }

    /// Check whether this scenario owns the given step.
    pub fn has_step(&self, step_id: &str) -> bool {
        self.steps.iter().any(|s| s.id == step_id)
    }
}

/// The uploaded file a feature was parsed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Original file name
    pub name: String,

    /// Raw file content, verbatim
    pub content: String,

    /// Content fingerprint (see [`crate::fingerprint`])
    pub hash: String,
}

/// A parsed feature file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: String,

    /// Feature name (empty when the file has no `Feature:` line)
    pub name: String,

    /// Free-text description following the `Feature:` line
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub scenarios: Vec<Scenario>,

    pub source_file: SourceFile,
}

impl Feature {
    /// Create an empty feature for the given source file.
    pub fn new(id: String, source_file: SourceFile) -> Self {
        Self {
            id,
            name: String::new(),
            description: String::new(),
            tags: Vec::new(),
            scenarios: Vec::new(),
            source_file,
        }
    }

    /// Total number of steps across all scenarios.
    pub fn step_count(&self) -> usize {
        self.scenarios.iter().map(|s| s.steps.len()).sum()
    }
}

/// Deployment target a run is executed against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Staging,
    Production,
    Uat,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Staging => "staging",
            Environment::Production => "production",
            Environment::Uat => "uat",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            "uat" => Ok(Environment::Uat),
            _ => Err(format!("Unknown environment: {}", s)),
        }
    }
}

/// Lifecycle state of a test run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    InProgress,
    Completed,
    /// Reserved; no transition produces it
    Paused,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Paused => "paused",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Scenario counts for a test run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub untested: usize,
}

impl RunSummary {
    /// Summary of a run where nothing has been executed yet.
    pub fn all_untested(total: usize) -> Self {
        Self {
            total,
            untested: total,
            ..Self::default()
        }
    }

    /// Count for a single outcome.
    pub fn count(&self, outcome: Outcome) -> usize {
        match outcome {
            Outcome::Passed => self.passed,
            Outcome::Failed => self.failed,
            Outcome::Skipped => self.skipped,
            Outcome::Untested => self.untested,
        }
    }
}

/// One execution attempt of a feature's scenarios.
///
/// Holds its own deep copy of the feature's scenarios; see [`crate::lifecycle`]
/// for the operations that mutate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRun {
    pub id: String,

    /// Feature this run executes
    pub feature_id: String,

    pub created_at: DateTime<Utc>,

    pub environment: Environment,

    /// Free-text version label (e.g., "v1.2.0")
    pub version: String,

    /// Snapshot of the feature's scenarios
    #[serde(default)]
    pub scenarios: Vec<Scenario>,

    #[serde(default)]
    pub summary: RunSummary,

    #[serde(default)]
    pub status: RunStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Set once the run is completed
    #[serde(default)]
    pub is_locked: bool,
}

/// Top-level persisted aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub features: Vec<Feature>,

    #[serde(default)]
    pub runs: Vec<TestRun>,
}

impl Project {
    /// Create an empty project.
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            description: None,
            features: Vec::new(),
            runs: Vec::new(),
        }
    }

    pub fn find_feature(&self, feature_id: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == feature_id)
    }

    pub fn find_run(&self, run_id: &str) -> Option<&TestRun> {
        self.runs.iter().find(|r| r.id == run_id)
    }

    /// Runs that execute the given feature.
    pub fn runs_for_feature<'a>(&'a self, feature_id: &'a str) -> impl Iterator<Item = &'a TestRun> {
        self.runs.iter().filter(move |r| r.feature_id == feature_id)
    }
}
