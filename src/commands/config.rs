//! config.kdl commands.

use super::{Output, json};
use crate::config::schema::{KEY_ACTION_LOG, KEY_BACKEND, KEY_DEFAULT_ENVIRONMENT, KEY_OUTPUT_FORMAT};
use crate::config::{CONFIG_FILE, ConfigOverrides, ResolvedConfig, load_config, resolve_config, save_config};
use crate::{Error, Result};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
pub struct ConfigValue {
    pub key: String,
    pub value: Option<String>,
}

impl Output for ConfigValue {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match &self.value {
            Some(value) => format!("{} = {}", self.key, value),
            None => format!("{} is not set", self.key),
        }
    }
}

/// Read one key from config.kdl.
pub fn config_get(config_dir: &Path, key: &str) -> Result<ConfigValue> {
    let config = load_config(config_dir)?;
    let value = config.get(key).map_err(Error::InvalidInput)?;
    Ok(ConfigValue {
        key: key.to_string(),
        value,
    })
}

#[derive(Debug, Serialize)]
pub struct ConfigSet {
    pub key: String,
    pub value: String,
    pub path: String,
}

impl Output for ConfigSet {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Set {} = {} in {}", self.key, self.value, self.path)
    }
}

/// Validate and write one key to config.kdl.
pub fn config_set(config_dir: &Path, key: &str, value: &str) -> Result<ConfigSet> {
    let mut config = load_config(config_dir)?;
    config.set(key, value.trim()).map_err(Error::InvalidInput)?;
    let stored = config.get(key).map_err(Error::InvalidInput)?.unwrap_or_default();
    let path = save_config(config_dir, &config)?;
    tracing::info!(key, value = %stored, "updated config");

    Ok(ConfigSet {
        key: key.to_string(),
        value: stored,
        path: path.display().to_string(),
    })
}

#[derive(Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub source: String,
}

#[derive(Serialize)]
pub struct ConfigListing {
    pub path: String,
    pub entries: Vec<ConfigEntry>,
}

impl Output for ConfigListing {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!("Config file: {}", self.path)];
        for entry in &self.entries {
            lines.push(format!("  {} = {} ({})", entry.key, entry.value, entry.source));
        }
        lines.join("\n")
    }
}

fn entries(resolved: &ResolvedConfig) -> Vec<ConfigEntry> {
    let entry = |key: &str, value: String, source: String| ConfigEntry {
        key: key.to_string(),
        value,
        source,
    };
    vec![
        entry(
            KEY_OUTPUT_FORMAT,
            resolved.output_format.value.to_string(),
            resolved.output_format.source.to_string(),
        ),
        entry(
            KEY_BACKEND,
            resolved.backend.value.to_string(),
            resolved.backend.source.to_string(),
        ),
        entry(
            KEY_DEFAULT_ENVIRONMENT,
            resolved.default_environment.value.to_string(),
            resolved.default_environment.source.to_string(),
        ),
        entry(
            KEY_ACTION_LOG,
            resolved.action_log.value.to_string(),
            resolved.action_log.source.to_string(),
        ),
    ]
}

/// Every key with its effective value and where it came from.
pub fn config_list(config_dir: &Path, overrides: &ConfigOverrides) -> Result<ConfigListing> {
    let config = load_config(config_dir)?;
    let resolved = resolve_config(&config, overrides)?;
    Ok(ConfigListing {
        path: config_dir.join(CONFIG_FILE).display().to_string(),
        entries: entries(&resolved),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_set_then_get() {
        let temp = TempDir::new().unwrap();
        let set = config_set(temp.path(), "default-environment", " UAT ").unwrap();
        assert_eq!(set.value, "uat");

        let got = config_get(temp.path(), "default-environment").unwrap();
        assert_eq!(got.value.as_deref(), Some("uat"));
        assert_eq!(got.to_human(), "default-environment = uat");
    }

    #[test]
    fn test_get_unset_and_unknown() {
        let temp = TempDir::new().unwrap();
        let unset = config_get(temp.path(), "backend").unwrap();
        assert!(unset.value.is_none());
        assert!(matches!(
            config_get(temp.path(), "colour"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_set_rejects_bad_value() {
        let temp = TempDir::new().unwrap();
        let err = config_set(temp.path(), "backend", "postgres").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(!temp.path().join(CONFIG_FILE).exists());
    }

    #[test]
    #[serial]
    fn test_list_reports_sources() {
        // SAFETY: serialized with every other test touching BDT_* variables
        unsafe {
            std::env::remove_var("BDT_OUTPUT_FORMAT");
            std::env::remove_var("BDT_BACKEND");
            std::env::remove_var("BDT_ENVIRONMENT");
        }
        let temp = TempDir::new().unwrap();
        config_set(temp.path(), "backend", "file").unwrap();

        let listing = config_list(temp.path(), &ConfigOverrides::new()).unwrap();
        let backend = listing.entries.iter().find(|e| e.key == "backend").unwrap();
        assert_eq!(backend.value, "file");
        assert_eq!(backend.source, "config");

        let format = listing.entries.iter().find(|e| e.key == "output-format").unwrap();
        assert_eq!(format.value, "json");
        assert_eq!(format.source, "default");
    }
}
