//! Open-time configuration

use std::fs;
use std::path::{Path, PathBuf};
use serde::Deserialize;
use crate::error::{Error, Result};

/// Configuration for grid cover access
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Memory-map tile files instead of reading them through a buffer
    pub use_mmap: bool,

    /// Number of failed tile openings reported as warnings
    pub warn_failed_openings: u32,

    /// Once this many tile openings have failed, stop trying the filesystem
    pub max_failed_openings: Option<u32>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            use_mmap: false,
            warn_failed_openings: 100,
            max_failed_openings: None,
        }
    }
}

impl GridConfig {
    /// Configuration for adversarial inputs: give up on tiles after 1000 failures
    pub fn fuzzing() -> Self {
        Self {
            max_failed_openings: Some(1000),
            ..Self::default()
        }
    }
}

/// Configuration for mesh-series files
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SelafinConfig {
    /// Directory for rewrite scratch files (system temp dir when unset)
    pub temp_dir: Option<PathBuf>,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub grid: GridConfig,
    pub selafin: SelafinConfig,
}

impl Config {
    /// Loads a configuration from a JSON file; missing keys take defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::invalid_format(format!("configuration: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.grid.use_mmap);
        assert_eq!(config.grid.warn_failed_openings, 100);
        assert_eq!(config.grid.max_failed_openings, None);
        assert_eq!(config.selafin.temp_dir, None);
    }

    #[test]
    fn test_partial_json() {
        let config = Config::from_json_str(r#"{"grid": {"use_mmap": true}}"#).unwrap();
        assert!(config.grid.use_mmap);
        assert_eq!(config.grid.warn_failed_openings, 100);
    }

    #[test]
    fn test_fuzzing_preset() {
        assert_eq!(GridConfig::fuzzing().max_failed_openings, Some(1000));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            Config::from_json_str("{grid"),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"selafin": {"temp_dir": "/var/tmp"}}"#).unwrap();
        let config = Config::from_json_file(&path).unwrap();
        assert_eq!(config.selafin.temp_dir, Some(PathBuf::from("/var/tmp")));
    }
}
