//! Configuration schema
//!
//! Configuration is stored at `~/.config/pydepot/config.toml`

use crate::interpreter::DEFAULT_PLATFORMS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Shared cache settings
    pub cache: CacheConfig,

    /// Target interpreter settings
    pub python: PythonConfig,

    /// Package registry settings
    pub registry: RegistryConfig,

    /// Job queue settings
    pub queue: QueueConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Shared cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root directory of the shared package cache
    pub root: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/mnt/efs/pydepot"),
        }
    }
}

/// Target interpreter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PythonConfig {
    /// Interpreter version packages are installed for, e.g. "3.12"
    pub version: String,

    /// Platform tags accepted when selecting built distributions,
    /// most specific first
    pub platforms: Vec<String>,
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self {
            version: "3.12".to_string(),
            platforms: DEFAULT_PLATFORMS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Package registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Base URL of the registry's JSON API
    pub index_url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            index_url: "https://pypi.org/pypi".to_string(),
        }
    }
}

/// Job queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Directory polled for incoming job messages
    pub request_dir: PathBuf,

    /// Directory replies are written to
    pub response_dir: PathBuf,

    /// Long-poll wait per receive, in seconds
    pub wait_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            request_dir: PathBuf::from("/mnt/efs/pydepot/queue/requests"),
            response_dir: PathBuf::from("/mnt/efs/pydepot/queue/responses"),
            wait_secs: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[python]"));
        assert!(toml.contains("[queue]"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.python.version, "3.12");
        assert_eq!(config.queue.wait_secs, 20);
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [python]
            version = "3.11"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.python.version, "3.11");
        assert_eq!(config.registry.index_url, "https://pypi.org/pypi"); // default preserved
    }

    #[test]
    fn platform_order_is_most_specific_first() {
        let config = Config::default();
        assert_eq!(config.python.platforms[0], "manylinux_2_17_x86_64");
        assert_eq!(config.python.platforms.last().unwrap(), "manylinux1_x86_64");
    }
}
