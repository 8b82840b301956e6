use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Directory holding settings.json and jobs.json.
    pub data_dir: PathBuf,
    pub request_timeout_secs: u64,
}

#[derive(Deserialize, Default)]
struct RawConfig {
    data_dir: Option<PathBuf>,
    request_timeout_secs: Option<u64>,
}

pub fn config_path() -> PathBuf {
    base_dir().join("config.json")
}

fn base_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("HOOKPOST_HOME") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".hookpost"))
        .unwrap_or_else(|| PathBuf::from(".hookpost"))
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let path = config_path();
        let raw: RawConfig = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)
                .map_err(|e| anyhow!("failed to parse config at {}: {e}", path.display()))?
        } else {
            RawConfig::default()
        };

        let data_dir = raw.data_dir.unwrap_or_else(base_dir);
        fs::create_dir_all(&data_dir)?;

        Ok(Self {
            data_dir,
            request_timeout_secs: raw
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }
}
