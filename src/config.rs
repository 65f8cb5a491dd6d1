//! Engine configuration
//!
//! Loaded from a JSON file; every field has a default so a partial file works:
//!
//! ```json
//! { "provider": "clublog", "path": "data/cty.xml", "progress_interval": 1000 }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::model::Provider;
use crate::readers::{ReadOptions, DEFAULT_PROGRESS_INTERVAL};

// ============================================================================
// Data Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Which reader handles `path`
    pub provider: Provider,
    /// Source file to load
    pub path: PathBuf,
    /// Records between progress callbacks
    pub progress_interval: usize,
    /// Log overlapping validity windows at warn instead of debug
    pub strict_overlaps: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Clublog,
            path: PathBuf::from("cty.xml"),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            strict_overlaps: true,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl EngineConfig {
    pub fn new(provider: Provider, path: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            path: path.into(),
            ..Self::default()
        }
    }

    /// Read a JSON config file. A relative `path` inside it is resolved
    /// against the config file's directory.
    pub fn from_file(file: &Path) -> Result<Self, LoadError> {
        let text = fs::read_to_string(file)?;
        let mut config = Self::from_json(&text)?;
        if config.path.is_relative() {
            if let Some(dir) = file.parent() {
                config.path = dir.join(&config.path);
            }
        }
        log::debug!("Loaded config from {}: {:?}", file.display(), config);
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| LoadError::Config(e.to_string()))?;
        if config.progress_interval == 0 {
            return Err(LoadError::Config(
                "progress_interval must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            progress_interval: self.progress_interval,
            strict_overlaps: self.strict_overlaps,
        }
    }
}
