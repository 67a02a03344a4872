//! Configuration file location and TOML bootstrap loading
//!
//! Resolution order used by the scp binaries:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: the binary warns and starts on defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Logging section shared by every scp TOML file
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Platform config location for an scp file: `<config_dir>/scp/<file_name>`
///
/// Linux: `~/.config/scp/`, macOS: `~/Library/Application Support/scp/`,
/// Windows: `%APPDATA%\scp\`.
pub fn default_config_path(file_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("scp").join(file_name))
}

/// Load a TOML bootstrap file, falling back to defaults when it does not exist
///
/// Read and parse failures of an existing file are reported as `Error::Config`.
pub fn load_toml_or_default<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        warn!("No config file location available, using built-in defaults");
        return Ok(T::default());
    };

    if !path.exists() {
        warn!(path = %path.display(), "Config file not found, using built-in defaults");
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;

    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!(path = %path.display(), "Loaded config file");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct SampleConfig {
        #[serde(default)]
        port: Option<u16>,
        #[serde(default)]
        logging: LoggingConfig,
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let config: SampleConfig = load_toml_or_default(Some(&path)).unwrap();
        assert_eq!(config, SampleConfig::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_no_location_uses_defaults() {
        let config: SampleConfig = load_toml_or_default(None).unwrap();
        assert_eq!(config.port, None);
    }

    #[test]
    fn test_existing_file_is_parsed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 4100\n\n[logging]\nlevel = \"debug\"").unwrap();

        let config: SampleConfig = load_toml_or_default(Some(file.path())).unwrap();
        assert_eq!(config.port, Some(4100));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number").unwrap();

        let result: Result<SampleConfig> = load_toml_or_default(Some(file.path()));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_default_config_path_layout() {
        if let Some(path) = default_config_path("scp-proxy.toml") {
            assert!(path.ends_with("scp/scp-proxy.toml"));
        }
    }
}
