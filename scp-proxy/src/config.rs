//! Configuration for scp-proxy
//!
//! Two layers are merged into a [`ProxyConfig`]:
//! 1. **Command line / environment**: [`Args`] (clap reads `SCP_*` variables as fallbacks)
//! 2. **TOML bootstrap**: [`TomlConfig`], optional, `~/.config/scp/scp-proxy.toml` by default
//!
//! Anything still unset takes the compiled default. The catalog client id may also be
//! baked in at build time by exporting `SCP_CLIENT_ID` while compiling.

use clap::Parser;
use scp_common::config::{default_config_path, LoggingConfig};
use scp_common::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default listen port (the front end expects the proxy on 3000)
pub const DEFAULT_PORT: u16 = 3000;
/// Public catalog API
pub const DEFAULT_API_BASE_URL: &str = "https://api-v2.soundcloud.com";
/// Tracks per search page
pub const DEFAULT_SEARCH_LIMIT: u32 = 10;
/// Upper bound accepted by the catalog for a single page
pub const MAX_SEARCH_LIMIT: u32 = 200;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
/// TOML file name looked up in the platform config directory
pub const CONFIG_FILE_NAME: &str = "scp-proxy.toml";

/// Client id compiled into the binary, if one was exported at build time
const BUILD_CLIENT_ID: Option<&str> = option_env!("SCP_CLIENT_ID");

/// Command-line arguments for scp-proxy
#[derive(Parser, Debug, Default)]
#[command(name = "scp-proxy")]
#[command(about = "Catalog search and stream resolution proxy")]
#[command(version)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "SCP_PORT")]
    pub port: Option<u16>,

    /// Catalog client id appended to every upstream request
    #[arg(long, env = "SCP_CLIENT_ID", hide_env_values = true)]
    pub client_id: Option<String>,

    /// Catalog API base URL
    #[arg(long, env = "SCP_API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Path to the TOML bootstrap file
    #[arg(short, long, env = "SCP_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Args {
    /// TOML location: explicit `--config`, else the platform default
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config
            .clone()
            .or_else(|| default_config_path(CONFIG_FILE_NAME))
    }
}

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub search_limit: Option<u32>,
    #[serde(default)]
    pub http_timeout_secs: Option<u64>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Fully resolved proxy configuration
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub port: u16,
    pub client_id: String,
    pub api_base_url: String,
    pub search_limit: u32,
    pub http_timeout: Duration,
    pub log_level: String,
}

impl ProxyConfig {
    /// Merge arguments over TOML over compiled defaults
    pub fn resolve(args: &Args, toml_config: TomlConfig) -> Result<Self> {
        let client_id = first_valid([
            args.client_id.as_deref(),
            toml_config.client_id.as_deref(),
            BUILD_CLIENT_ID,
        ])
        .ok_or_else(|| {
            Error::Config(
                "Catalog client id not configured. Please configure using one of:\n\
                 1. Command line: --client-id <id>\n\
                 2. Environment: SCP_CLIENT_ID=<id>\n\
                 3. TOML config: ~/.config/scp/scp-proxy.toml (client_id = \"<id>\")"
                    .to_string(),
            )
        })?;

        let api_base_url = first_valid([
            args.api_base_url.as_deref(),
            toml_config.api_base_url.as_deref(),
        ])
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let search_limit = toml_config.search_limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        if search_limit == 0 || search_limit > MAX_SEARCH_LIMIT {
            return Err(Error::Config(format!(
                "search_limit must be between 1 and {}, got {}",
                MAX_SEARCH_LIMIT, search_limit
            )));
        }

        Ok(Self {
            port: args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT),
            client_id,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            search_limit,
            http_timeout: Duration::from_secs(
                toml_config
                    .http_timeout_secs
                    .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
            log_level: toml_config.logging.level,
        })
    }
}

/// Non-empty, non-whitespace
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

fn first_valid<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|v| is_valid_value(v))
        .map(|v| v.trim().to_string())
}
