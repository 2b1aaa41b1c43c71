//! CLI argument definitions for bddtrack.

use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

const OUTCOMES: [&str; 4] = ["passed", "failed", "skipped", "untested"];
const ENVIRONMENTS: [&str; 3] = ["staging", "production", "uat"];
const BACKENDS: [&str; 3] = ["sqlite", "file", "memory"];

/// bddtrack - Manual BDD test tracking for Gherkin feature files.
///
/// Upload `.feature` files into a project, execute their scenarios by hand
/// against an environment and version, then compare versions and render
/// living documentation.
#[derive(Parser, Debug)]
#[command(name = "bdt")]
#[command(author, version, about = "Manual BDD test tracking for Gherkin feature files", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Directory holding the project store and action log.
    /// Can also be set via BDT_DATA_DIR environment variable.
    #[arg(long = "data-dir", global = true, env = "BDT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Storage backend (overrides BDT_BACKEND and config.kdl)
    #[arg(long, global = true, value_parser = BACKENDS)]
    pub backend: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Project management commands
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Feature file commands
    Feature {
        #[command(subcommand)]
        command: FeatureCommands,
    },

    /// Test run commands (execute scenarios, record results)
    Run {
        #[command(subcommand)]
        command: RunCommands,
    },

    /// Run history and version comparison
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },

    /// Render a feature as Markdown documentation
    Docs {
        /// Project ID
        project: String,
        /// Feature ID
        feature: String,
        /// Overlay the results of this run
        #[arg(long)]
        run: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// System information and maintenance
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a new project
    Create {
        /// Project name
        name: String,
        /// Project description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List all projects
    List,

    /// Show project details
    Show {
        /// Project ID
        project: String,
    },

    /// Delete a project with all its features and runs
    Delete {
        /// Project ID
        project: String,
    },

    /// Export a project as a portable JSON document
    Export {
        /// Project ID
        project: String,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a project from an exported JSON document (overwrites same id)
    Import {
        /// Path to the exported JSON file
        file: PathBuf,
    },
}

/// Feature subcommands
#[derive(Subcommand, Debug)]
pub enum FeatureCommands {
    /// Upload a .feature file (re-upload with changes replaces it and purges its runs)
    Upload {
        /// Project ID
        project: String,
        /// Path to the .feature file
        file: PathBuf,
    },

    /// List features in a project
    List {
        /// Project ID
        project: String,
    },

    /// Show a feature with its scenarios and steps
    Show {
        /// Project ID
        project: String,
        /// Feature ID
        feature: String,
    },
}

/// Test run subcommands
#[derive(Subcommand, Debug)]
pub enum RunCommands {
    /// Start a run for a new version (fails if the version already exists)
    Start {
        /// Project ID
        project: String,
        /// Feature ID
        feature: String,
        /// Environment (defaults to config default-environment)
        #[arg(short, long, value_parser = ENVIRONMENTS)]
        environment: Option<String>,
        /// Version label (e.g., v1.2.0)
        #[arg(short, long)]
        version: String,
    },

    /// Resume the in-progress run for a version, or start it
    Open {
        /// Project ID
        project: String,
        /// Feature ID
        feature: String,
        /// Environment (defaults to config default-environment)
        #[arg(short, long, value_parser = ENVIRONMENTS)]
        environment: Option<String>,
        /// Version label
        #[arg(short, long)]
        version: String,
    },

    /// List runs, newest first
    List {
        /// Project ID
        project: String,
        /// Filter by feature ID
        #[arg(long)]
        feature: Option<String>,
        /// Filter by environment
        #[arg(short, long, value_parser = ENVIRONMENTS)]
        environment: Option<String>,
    },

    /// Show a run
    Show {
        /// Project ID
        project: String,
        /// Run ID
        run: String,
        /// Only show scenarios with this status
        #[arg(long, value_parser = OUTCOMES)]
        status: Option<String>,
    },

    /// Record a step result
    Step {
        /// Project ID
        project: String,
        /// Run ID
        run: String,
        /// Step ID
        step: String,
        /// Result
        #[arg(value_parser = OUTCOMES)]
        outcome: String,
    },

    /// Set a whole scenario's result (applies to every step)
    Scenario {
        /// Project ID
        project: String,
        /// Run ID
        run: String,
        /// Scenario ID
        scenario: String,
        /// Result
        #[arg(value_parser = OUTCOMES)]
        outcome: String,
    },

    /// Set the same result on several scenarios
    Bulk {
        /// Project ID
        project: String,
        /// Run ID
        run: String,
        /// Result
        #[arg(value_parser = OUTCOMES)]
        outcome: String,
        /// Scenario IDs
        #[arg(required = true)]
        scenarios: Vec<String>,
    },

    /// Set or clear (empty text) a note on a step or scenario
    #[command(group(ArgGroup::new("target").required(true).args(["step", "scenario"])))]
    Note {
        /// Project ID
        project: String,
        /// Run ID
        run: String,
        /// Step ID
        #[arg(long)]
        step: Option<String>,
        /// Scenario ID
        #[arg(long)]
        scenario: Option<String>,
        /// Note text
        text: String,
    },

    /// Attach a file to a step or scenario
    #[command(group(ArgGroup::new("target").required(true).args(["step", "scenario"])))]
    Attach {
        /// Project ID
        project: String,
        /// Run ID
        run: String,
        /// Step ID
        #[arg(long)]
        step: Option<String>,
        /// Scenario ID
        #[arg(long)]
        scenario: Option<String>,
        /// File to attach
        file: PathBuf,
        /// MIME type (guessed from the file extension if omitted)
        #[arg(long)]
        mime: Option<String>,
    },

    /// Complete and lock a run
    Complete {
        /// Project ID
        project: String,
        /// Run ID
        run: String,
    },

    /// Reset a run to untested and reopen it
    Reset {
        /// Project ID
        project: String,
        /// Run ID
        run: String,
    },

    /// Reset every run of a feature
    ResetFeature {
        /// Project ID
        project: String,
        /// Feature ID
        feature: String,
    },

    /// Delete every run in a project
    ResetAll {
        /// Project ID
        project: String,
    },
}

/// Report subcommands
#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Completed runs of a feature, latest per environment and version
    History {
        /// Project ID
        project: String,
        /// Feature ID
        feature: String,
        /// Filter by environment
        #[arg(short, long, value_parser = ENVIRONMENTS)]
        environment: Option<String>,
    },

    /// Compare two completed versions scenario by scenario
    Compare {
        /// Project ID
        project: String,
        /// Feature ID
        feature: String,
        /// Environment (defaults to config default-environment)
        #[arg(short, long, value_parser = ENVIRONMENTS)]
        environment: Option<String>,
        /// Baseline version
        before: String,
        /// Version to compare against the baseline
        after: String,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },

    /// List all configuration values with their sources
    List,
}

/// System subcommands
#[derive(Subcommand, Debug)]
pub enum SystemCommands {
    /// Show version, build and storage information
    Info,

    /// Rewrite the JSONL project log keeping only live projects (file backend)
    Compact,

    /// Show recent entries of the action log
    Actions {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
}
