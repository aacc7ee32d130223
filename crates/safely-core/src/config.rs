//! Application configuration management.
//!
//! Holds the candidate endpoint list and the network timing knobs. The
//! defaults match the shipped app: production host first, then the
//! development fallbacks a mobile build might reach the backend through.
//!
//! Configuration is stored at `~/.config/safely/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/data directory paths
const APP_NAME: &str = "safely";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Production backend, probed first.
const PRODUCTION_URL: &str = "https://safely-backend.onrender.com";

/// Android emulator loopback to a backend on the host machine.
const EMULATOR_URL: &str = "http://10.0.2.2:5000";

/// Local development backend.
const LOCAL_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Candidate base URLs in priority order.
    pub endpoints: Vec<String>,
    /// Per-candidate reachability probe deadline.
    pub probe_timeout_secs: u64,
    /// Retry count when only one candidate is configured.
    pub probe_attempts: u32,
    /// Delay between those retries.
    pub probe_interval_secs: u64,
    /// Timeout for ordinary API requests.
    /// 30s allows for a cold backend while failing fast enough for good UX.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints: vec![
                PRODUCTION_URL.to_string(),
                EMULATOR_URL.to_string(),
                LOCAL_URL.to_string(),
            ],
            probe_timeout_secs: 5,
            probe_attempts: 5,
            probe_interval_secs: 2,
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory the session store lives in.
    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}
