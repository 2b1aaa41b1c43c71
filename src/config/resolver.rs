//! Precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Environment variables (`BDT_OUTPUT_FORMAT`, `BDT_BACKEND`, `BDT_ENVIRONMENT`)
//! 3. config.kdl
//! 4. Built-in defaults

use super::schema::{BddConfig, OutputFormat};
use crate::models::Environment;
use crate::storage::BackendType;
use crate::{Error, Result};

pub const OUTPUT_FORMAT_ENV: &str = "BDT_OUTPUT_FORMAT";
pub const BACKEND_ENV: &str = "BDT_BACKEND";
pub const ENVIRONMENT_ENV: &str = "BDT_ENVIRONMENT";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from CLI flag
    CliFlag,
    /// Value from environment variable
    EnvVar(String),
    /// Value from config.kdl
    ConfigFile,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::ConfigFile => write!(f, "config"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub output_format: Resolved<OutputFormat>,
    pub backend: Resolved<BackendType>,
    pub default_environment: Resolved<Environment>,
    pub action_log: Resolved<bool>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            backend: Resolved::new(BackendType::Sqlite, ValueSource::Default),
            default_environment: Resolved::new(Environment::Staging, ValueSource::Default),
            action_log: Resolved::new(true, ValueSource::Default),
        }
    }
}

impl ResolvedConfig {
    pub fn is_human(&self) -> bool {
        self.output_format.value == OutputFormat::Human
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_format: Option<OutputFormat>,
    pub backend: Option<BackendType>,
    pub environment: Option<Environment>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }
}

/// Resolve configuration with the full precedence chain.
///
/// An environment variable holding an invalid value is an error rather than
/// being skipped silently.
pub fn resolve_config(file: &BddConfig, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let mut result = ResolvedConfig::default();

    // Resolve output_format
    if let Some(format) = overrides.output_format {
        result.output_format = Resolved::new(format, ValueSource::CliFlag);
    } else if let Some(format) = env_value(OUTPUT_FORMAT_ENV, OutputFormat::parse)? {
        result.output_format = Resolved::new(format, env_source(OUTPUT_FORMAT_ENV));
    } else if let Some(format) = file.output_format {
        result.output_format = Resolved::new(format, ValueSource::ConfigFile);
    }

    // Resolve backend
    if let Some(backend) = overrides.backend {
        result.backend = Resolved::new(backend, ValueSource::CliFlag);
    } else if let Some(backend) = env_value(BACKEND_ENV, BackendType::parse)? {
        result.backend = Resolved::new(backend, env_source(BACKEND_ENV));
    } else if let Some(backend) = file.backend {
        result.backend = Resolved::new(backend, ValueSource::ConfigFile);
    }

    // Resolve default_environment
    if let Some(environment) = overrides.environment {
        result.default_environment = Resolved::new(environment, ValueSource::CliFlag);
    } else if let Some(environment) = env_value(ENVIRONMENT_ENV, |s| s.parse::<Environment>().ok())? {
        result.default_environment = Resolved::new(environment, env_source(ENVIRONMENT_ENV));
    } else if let Some(environment) = file.default_environment {
        result.default_environment = Resolved::new(environment, ValueSource::ConfigFile);
    }

    // action-log has no flag or variable
    if let Some(enabled) = file.action_log {
        result.action_log = Resolved::new(enabled, ValueSource::ConfigFile);
    }

    Ok(result)
}

fn env_value<T>(name: &str, parse: impl Fn(&str) -> Option<T>) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => parse(raw.trim())
            .map(Some)
            .ok_or_else(|| Error::Config(format!("Invalid value for {}: {}", name, raw))),
        _ => Ok(None),
    }
}

fn env_source(name: &str) -> ValueSource {
    ValueSource::EnvVar(name.to_string())
}
