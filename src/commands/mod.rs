//! Command implementations for the bdt CLI.
//!
//! Each command returns a result type implementing [`Output`], which `main`
//! prints as JSON or, with `-H`, as human-readable text.
//! Commands are organized by entity type:
//! - `project` - Project CRUD, export and import
//! - `feature` - Feature file upload and inspection
//! - `run` - Test run lifecycle
//! - `report` - History, comparison and Markdown docs
//! - `config` - config.kdl management
//! - `system` - Build/storage info and maintenance

pub mod config;
pub mod feature;
pub mod project;
pub mod report;
pub mod run;
pub mod system;

use crate::models::{Environment, Outcome};
use crate::storage::{ProjectBackend, ProjectStore};
use crate::{Error, Result};
use serde::Serialize;

/// Store type the CLI operates on, backend chosen at runtime.
pub type Store = ProjectStore<Box<dyn ProjectBackend>>;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

/// Serialize any result to compact JSON.
pub(crate) fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
}

/// Parse an outcome argument.
pub fn parse_outcome(s: &str) -> Result<Outcome> {
    s.parse().map_err(Error::InvalidInput)
}

/// Parse an environment argument.
pub fn parse_environment(s: &str) -> Result<Environment> {
    s.parse().map_err(Error::InvalidInput)
}

/// Parse an optional environment argument.
pub fn parse_environment_opt(s: Option<&str>) -> Result<Option<Environment>> {
    s.map(parse_environment).transpose()
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{} {}", count, word)
    } else {
        format!("{} {}s", count, word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_outcome("passed").unwrap(), Outcome::Passed);
        assert!(matches!(parse_outcome("green"), Err(Error::InvalidInput(_))));
        assert_eq!(parse_environment_opt(Some("uat")).unwrap(), Some(Environment::Uat));
        assert_eq!(parse_environment_opt(None).unwrap(), None);
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "run"), "1 run");
        assert_eq!(plural(0, "run"), "0 runs");
    }
}
