//! JSON configuration for the votumd binary

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use votum_core::booth::PollingLocation;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config file")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    pub key: KeyConfig,

    /// Polling locations seeded into the store at startup. An external
    /// administrative process owns these in a full deployment.
    #[serde(default)]
    pub booths: Vec<BoothEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Resource name handed to the key service on every encrypt call
    pub name: String,

    /// Hex-encoded 32-byte key material for the local key service
    pub material: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoothEntry {
    pub booth_id: String,

    #[serde(flatten)]
    pub location: PollingLocation,
}

fn default_listen_address() -> String {
    "0.0.0.0:8260".to_owned()
}

pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let parsed: Config = serde_json::from_reader(reader)?;

    Ok(parsed)
}
