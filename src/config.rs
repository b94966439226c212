//! Service configuration
//!
//! Loaded from YAML; every section and field falls back to its default, so
//! an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FamilyConfig {
    pub storage: StorageConfig,
    pub layout: LayoutConfig,
    pub server: ServerConfig,
}

impl FamilyConfig {
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        // An empty document deserializes to unit, not to an empty mapping
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Nothing survives a restart
    Memory,
    #[default]
    RocksDb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Data directory for the RocksDB backend
    pub path: PathBuf,
    /// Key prefix separating family trees that share a data directory
    pub namespace: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::RocksDb,
            path: PathBuf::from("./family_data"),
            namespace: "FamilyTree".to_string(),
        }
    }
}

/// Layout constants, in display units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// `x` of the first node in every row
    pub x_origin: f64,
    /// `y` of the row holding the earliest generation
    pub y_origin: f64,
    /// Horizontal distance between neighbours in a row
    pub x_step: f64,
    /// Vertical distance between consecutive generation rows
    pub y_step: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            x_origin: 50.0,
            y_origin: 50.0,
            x_step: 150.0,
            y_step: 120.0,
        }
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub address: String,
    /// Port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 3012,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}
