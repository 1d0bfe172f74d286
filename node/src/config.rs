//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use entangle_types::EntangleParams;
use entangle_verification::RetryPolicy;

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for an entanglement node.
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Filter directive, e.g. `"info"` or `"info,entangle_node=debug"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Capacity of the incoming block queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Failover policy for the foreign chain endpoints.
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Curve constants, maturities and beacon bounds.
    #[serde(default)]
    pub params: EntangleParams,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./entangle_data")
}

fn default_map_size() -> usize {
    1 << 30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_queue_capacity() -> usize {
    64
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size: default_map_size(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            retry: RetryPolicy::default(),
            queue_capacity: default_queue_capacity(),
            params: EntangleParams::default(),
        }
    }
}
