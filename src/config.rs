#![forbid(unsafe_code)]
//! Runtime configuration for the page mapper, loadable from TOML.
//!
//! ```toml
//! log_level = "leafkv=debug"
//!
//! [mapper]
//! allocation = "fallocate"
//! flush_on_close = true
//! populate = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::primitives::io::Allocation;

/// Options controlling how the page mapper maps and grows its file.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperOptions {
    /// How the backing file is grown by `extend_file`.
    pub allocation: Allocation,
    /// Whether every chunk is flushed to the file before it is unmapped.
    pub flush_on_close: bool,
    /// Whether new mappings are pre-faulted (`MAP_POPULATE` on Linux).
    pub populate: bool,
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            allocation: Allocation::default(),
            flush_on_close: true,
            populate: false,
        }
    }
}

/// Top-level configuration file.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `tracing` filter directive handed to [`crate::logging::init_logging`].
    pub log_level: String,
    /// Page mapper options.
    pub mapper: MapperOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            mapper: MapperOptions::default(),
        }
    }
}

impl Config {
    /// Parses a configuration from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse { path: None, source })
    }

    /// Reads and parses the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })
    }

    /// Serializes the configuration back to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|source| ConfigError::Serialize { source })
    }
}

/// Errors raised while loading or saving a [`Config`].
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config{}: {source}", display_path(.path))]
    Parse {
        path: Option<PathBuf>,
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {source}")]
    Serialize { source: toml::ser::Error },
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" {}", p.display()))
        .unwrap_or_default()
}
