//! Tool configuration file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings that rarely change between runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolConfig {
    /// REST API port of both clusters.
    pub api_port: u16,
    /// Port the source uses to reach the destination's replication service.
    pub replication_port: u16,
    /// Timeout of a single REST request.
    pub request_timeout_secs: u64,
    /// Storage clusters commonly serve self-signed certificates.
    pub accept_invalid_certs: bool,
    /// Directory receiving the per-run log file.
    pub log_dir: PathBuf,
    /// Network used when no explicit destination addresses are given.
    pub default_network: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            api_port: 8000,
            replication_port: 3712,
            request_timeout_secs: 30,
            accept_invalid_certs: true,
            log_dir: PathBuf::from("logs"),
            default_network: String::from("Default"),
        }
    }
}

impl ToolConfig {
    /// Parse a `.toml` or `.json` file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        match ext.to_lowercase().as_str() {
            "toml" => {
                let config: ToolConfig = toml::from_str(&contents)?;
                Ok(config)
            }
            "json" => {
                let config: ToolConfig = serde_json::from_str(&contents)?;
                Ok(config)
            }
            _ => anyhow::bail!("Unsupported config file extension: {}", ext),
        }
    }

    /// Load `path` when given and present, defaults otherwise.
    ///
    /// The flag is set when a named file was missing, so the caller can warn
    /// once logging is up.
    pub fn load(path: Option<&Path>) -> anyhow::Result<(Self, bool)> {
        match path {
            Some(path) if path.exists() => Ok((Self::from_file(path)?, false)),
            Some(_) => Ok((Self::default(), true)),
            None => Ok((Self::default(), false)),
        }
    }
}
