//! Engine configuration.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Runtime settings for an [`Engine`](crate::Engine).
///
/// Can be loaded from TOML:
///
/// ```toml
/// verify_consistency = true
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Replay every play against its recorded deltas and fail on mismatch.
    #[serde(default = "default_verify_consistency")]
    verify_consistency: bool,
}

/// Verification is on for debug builds and off for release builds.
#[instrument]
fn default_verify_consistency() -> bool {
    cfg!(debug_assertions)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            verify_consistency: default_verify_consistency(),
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with build-profile defaults.
    #[instrument]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with the consistency check switched on or off.
    #[instrument]
    pub fn with_verify_consistency(self, verify_consistency: bool) -> Self {
        Self { verify_consistency }
    }

    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading engine config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(verify_consistency = config.verify_consistency, "Engine config loaded");
        Ok(config)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_follows_build_profile() {
        assert_eq!(
            *EngineConfig::default().verify_consistency(),
            cfg!(debug_assertions)
        );
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "verify_consistency = false").unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert!(!config.verify_consistency());
    }

    #[test]
    fn test_from_file_empty_uses_default() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_from_file_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "verify_consistency = \"maybe\"").unwrap();

        let err = EngineConfig::from_file(file.path()).unwrap_err();
        assert!(err.message.contains("Failed to parse config"));
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::from_file("/nonexistent/strictly_reveal.toml").unwrap_err();
        assert!(err.message.contains("Failed to read config file"));
    }
}
