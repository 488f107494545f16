use crate::core::transaction::SUBSIDY;
use crate::mining::pow::{DEFAULT_DIFFICULTY_BITS, DEFAULT_MAX_NONCE};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

pub const GENESIS_COINBASE_DATA: &str =
    "The Times 03/Jan/2009 Chancellor on brink of second bailout for banks";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub mining: MiningConfig,
    pub consensus: ConsensusConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub db_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningConfig {
    pub difficulty_bits: u32,
    pub max_nonce: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusConfig {
    pub subsidy: u64,
    pub genesis_message: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: home_dir().join(".minicoin"),
            db_name: "blockchain.db".to_string(),
        }
    }
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            difficulty_bits: DEFAULT_DIFFICULTY_BITS,
            max_nonce: DEFAULT_MAX_NONCE,
        }
    }
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            subsidy: SUBSIDY,
            genesis_message: GENESIS_COINBASE_DATA.to_string(),
        }
    }
}

impl StorageConfig {
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_name)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Reads the config at `config_path`, writing the defaults there first if
    /// the file does not exist yet.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    /// Like `load`, but an unreadable config is logged and replaced by the
    /// defaults.
    pub fn load_or_default() -> Self {
        Self::load_or_default_from(&Self::config_path())
    }

    fn load_or_default_from(config_path: &Path) -> Self {
        match Self::load_from(config_path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!(
                    "Failed to load config from {}, using defaults: {}",
                    config_path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;

        Ok(())
    }

    fn config_path() -> PathBuf {
        home_dir().join(".minicoin").join("config.json")
    }
}

fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| ".".to_string()))
}
