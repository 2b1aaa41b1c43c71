//! Configuration for bddtrack.
//!
//! ## config.kdl - User preferences
//!
//! Located at `$BDT_CONFIG_DIR/config.kdl`, or `~/.config/bddtrack/config.kdl`
//! by default.
//!
//! Contains:
//! - `output-format` - "json" or "human"
//! - `backend` - "sqlite", "file" or "memory"
//! - `default-environment` - "staging", "production" or "uat"
//! - `action-log` - `#true`/`#false`, whether invocations are logged
//!
//! ## Precedence
//!
//! CLI flag > environment variable > config.kdl > defaults.
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{ConfigOverrides, Resolved, ResolvedConfig, ValueSource, resolve_config};
pub use schema::{BddConfig, CONFIG_KEYS, OutputFormat};

use crate::{Error, Result};
use kdl::KdlDocument;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "BDT_CONFIG_DIR";

/// Config file name inside the config directory.
pub const CONFIG_FILE: &str = "config.kdl";

/// Resolve the config directory: `BDT_CONFIG_DIR`, then the platform default.
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    let base = dirs::config_dir()
        .ok_or_else(|| Error::Other("Could not determine config directory".to_string()))?;
    Ok(base.join("bddtrack"))
}

/// Load config.kdl from `dir`. A missing file yields an empty config.
pub fn load_config(dir: &Path) -> Result<BddConfig> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(BddConfig::new());
    }

    let content = fs::read_to_string(&path)?;
    let doc: KdlDocument = content
        .parse()
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    Ok(BddConfig::from_kdl(&doc))
}

/// Write config.kdl to `dir`, creating the directory if needed.
pub fn save_config(dir: &Path, config: &BddConfig) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(CONFIG_FILE);
    fs::write(&path, config.to_kdl().to_string())?;
    tracing::debug!(path = %path.display(), "wrote config");
    Ok(path)
}
