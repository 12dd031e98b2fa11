use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::codec::IdFormat;
use crate::error::{Result, WatchError};
use crate::poller::Dialect;
use crate::probe::SubResource;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rpc: RpcConfig,
    pub store: StoreConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub endpoints: Vec<String>,
    pub timeout_ms: u64,
    pub dialect: Dialect,
    pub recent_limit: u32,
    pub id_format: IdFormat,
    pub batch_probe: bool,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["https://fullnode.mainnet.sui.io:443".to_string()],
            timeout_ms: 10000,
            dialect: Dialect::Recent,
            recent_limit: 3,
            id_format: IdFormat::Base58,
            batch_probe: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub slow_threshold_ms: u64,
    pub resources: Vec<SubResource>,
    pub max_records: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "https://transactions.sui.io/mainnet".to_string(),
            timeout_ms: 10000,
            slow_threshold_ms: 5000,
            resources: SubResource::ALL.to_vec(),
            max_records: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub loop_delay_ms: u64,
    pub max_iterations: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            loop_delay_ms: 2000,
            max_iterations: None,
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).map_err(|e| {
                WatchError::Config(format!("Failed to load config from {}: {}", path.display(), e))
            });
        }

        let project_name = env!("CARGO_PKG_NAME");

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}
