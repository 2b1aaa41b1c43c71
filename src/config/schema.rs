//! KDL schema for config.kdl.
//!
//! This module provides:
//! - The Rust struct representing the KDL schema
//! - Serialization/deserialization to/from KDL format
//! - Per-key get/set used by `bdt config`

use crate::models::Environment;
use crate::storage::BackendType;
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub const KEY_OUTPUT_FORMAT: &str = "output-format";
pub const KEY_BACKEND: &str = "backend";
pub const KEY_DEFAULT_ENVIRONMENT: &str = "default-environment";
pub const KEY_ACTION_LOG: &str = "action-log";

/// Every key accepted in config.kdl.
pub const CONFIG_KEYS: &[&str] = &[
    KEY_OUTPUT_FORMAT,
    KEY_BACKEND,
    KEY_DEFAULT_ENVIRONMENT,
    KEY_ACTION_LOG,
];

/// User preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// output-format "human"       // or "json"
/// backend "file"              // "sqlite", "file" or "memory"
/// default-environment "uat"   // "staging", "production" or "uat"
/// action-log #false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BddConfig {
    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,

    /// Storage backend
    pub backend: Option<BackendType>,

    /// Environment used when a run command gives none
    pub default_environment: Option<Environment>,

    /// Whether CLI invocations are recorded in action.log
    pub action_log: Option<bool>,
}

impl BddConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config from a KDL document.
    ///
    /// Unknown nodes and values of the wrong type are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(s) = first_string(doc, KEY_OUTPUT_FORMAT) {
            config.output_format = OutputFormat::parse(s);
        }

        if let Some(s) = first_string(doc, KEY_BACKEND) {
            config.backend = BackendType::parse(s);
        }

        if let Some(s) = first_string(doc, KEY_DEFAULT_ENVIRONMENT) {
            config.default_environment = s.parse().ok();
        }

        if let Some(node) = doc.get(KEY_ACTION_LOG) {
            if let Some(entry) = node.entries().first() {
                config.action_log = entry.value().as_bool();
            }
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(format) = self.output_format {
            push_node(&mut doc, KEY_OUTPUT_FORMAT, KdlValue::String(format.as_str().to_string()));
        }

        if let Some(backend) = self.backend {
            push_node(&mut doc, KEY_BACKEND, KdlValue::String(backend.as_str().to_string()));
        }

        if let Some(environment) = self.default_environment {
            push_node(
                &mut doc,
                KEY_DEFAULT_ENVIRONMENT,
                KdlValue::String(environment.as_str().to_string()),
            );
        }

        if let Some(enabled) = self.action_log {
            push_node(&mut doc, KEY_ACTION_LOG, KdlValue::Bool(enabled));
        }

        doc.autoformat();
        doc
    }

    /// Read one key as a display string.
    pub fn get(&self, key: &str) -> Result<Option<String>, String> {
        match key {
            KEY_OUTPUT_FORMAT => Ok(self.output_format.map(|v| v.to_string())),
            KEY_BACKEND => Ok(self.backend.map(|v| v.to_string())),
            KEY_DEFAULT_ENVIRONMENT => Ok(self.default_environment.map(|v| v.to_string())),
            KEY_ACTION_LOG => Ok(self.action_log.map(|v| v.to_string())),
            _ => Err(unknown_key(key)),
        }
    }

    /// Set one key from a string, validating the value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            KEY_OUTPUT_FORMAT => {
                let format = OutputFormat::parse(value).ok_or_else(|| {
                    format!("{} must be \"json\" or \"human\", got {}", key, value)
                })?;
                self.output_format = Some(format);
            }
            KEY_BACKEND => {
                let backend = BackendType::parse(value).ok_or_else(|| {
                    format!("{} must be sqlite, file or memory, got {}", key, value)
                })?;
                self.backend = Some(backend);
            }
            KEY_DEFAULT_ENVIRONMENT => {
                self.default_environment = Some(value.parse()?);
            }
            KEY_ACTION_LOG => {
                let enabled = match value.to_lowercase().as_str() {
                    "true" | "on" | "yes" | "1" => true,
                    "false" | "off" | "no" | "0" => false,
                    _ => return Err(format!("{} must be true or false, got {}", key, value)),
                };
                self.action_log = Some(enabled);
            }
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &BddConfig) {
        if other.output_format.is_some() {
            self.output_format = other.output_format;
        }
        if other.backend.is_some() {
            self.backend = other.backend;
        }
        if other.default_environment.is_some() {
            self.default_environment = other.default_environment;
        }
        if other.action_log.is_some() {
            self.action_log = other.action_log;
        }
    }
}

fn first_string<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a str> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .and_then(|entry| entry.value().as_string())
}

fn push_node(doc: &mut KdlDocument, name: &str, value: KdlValue) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(value));
    doc.nodes_mut().push(node);
}

fn unknown_key(key: &str) -> String {
    format!("Unknown config key: {} (expected one of: {})", key, CONFIG_KEYS.join(", "))
}
