//! Service configuration, stored as JSON under `~/.keyrack/`.

use keyrack_crypto::{CipherMode, CipherSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found")]
    NotFound,
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("could not determine home directory")]
    NoHome,
}

/// Top-level configuration: which cipher strategy the gateway runs and the
/// default page size for listings.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ServiceConfig {
    pub encryption: CipherSettings,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    25
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            encryption: CipherSettings {
                mode: CipherMode::Null,
                key_hex: None,
            },
            page_size: default_page_size(),
        }
    }
}

impl ServiceConfig {
    /// Load from the default path (`~/.keyrack/config.json`).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_path()?)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound
            } else {
                ConfigError::Read(e)
            }
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save to the default path.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::default_path()?)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(dirs::home_dir()
            .ok_or(ConfigError::NoHome)?
            .join(".keyrack")
            .join("config.json"))
    }
}
