use crate::state::GarageInfo;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use time::UtcOffset;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_HISTORY_WEEKS: usize = 8;

/// Garages served when the config lists none: (id, name, alias).
const DEFAULT_GARAGES: [(&str, &str, &str); 4] = [
    ("south", "South", "1"),
    ("west", "West", "2"),
    ("north", "North", "3"),
    ("south_campus", "South Campus", "4"),
];

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub sources: Option<SourcesSection>,
    #[serde(default)]
    pub prediction: Option<PredictionSection>,
    #[serde(default)]
    pub garages: Vec<GarageSection>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
    /// Offset of the garages' wall clock from UTC, in hours. Fixed for the
    /// whole year; daylight-saving changes need a config update.
    #[serde(default)]
    pub utc_offset_hours: i8,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    /// Port to listen on (default: 8080)
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesSection {
    /// Root of the JSON file store (default: data)
    pub data_dir: Option<PathBuf>,
    /// Upper bound for a single upstream read (default: 2000 ms)
    pub fetch_timeout_ms: Option<u64>,
    /// Matching weekdays averaged into a profile (default: 8)
    pub history_weeks: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PredictionSection {
    /// Remote predictor URL; predictions come from the file store when unset.
    pub endpoint: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GarageSection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}

impl Config {
    pub fn log_level(&self) -> &str {
        &self.logging.level
    }

    pub fn utc_offset(&self) -> Result<UtcOffset, ConfigError> {
        UtcOffset::from_hms(self.app.utc_offset_hours, 0, 0)
            .map_err(|err| ConfigError::Invalid(format!("app.utc_offset_hours: {err}")))
    }

    /// Returns the server port (default: 8080)
    pub fn server_port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.sources
            .as_ref()
            .and_then(|s| s.data_dir.clone())
            .filter(|path| !path.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
    }

    pub fn fetch_timeout(&self) -> Duration {
        let millis = self
            .sources
            .as_ref()
            .and_then(|s| s.fetch_timeout_ms)
            .unwrap_or(DEFAULT_FETCH_TIMEOUT_MS);
        Duration::from_millis(millis)
    }

    pub fn history_weeks(&self) -> usize {
        self.sources
            .as_ref()
            .and_then(|s| s.history_weeks)
            .unwrap_or(DEFAULT_HISTORY_WEEKS)
    }

    /// Remote predictor endpoint; an empty string counts as unset.
    pub fn prediction_endpoint(&self) -> Option<&str> {
        let endpoint = self.prediction.as_ref()?.endpoint.as_deref()?;
        if endpoint.trim().is_empty() {
            None
        } else {
            Some(endpoint)
        }
    }

    /// Remote predictor timeout, falling back to the fetch timeout.
    pub fn prediction_timeout(&self) -> Duration {
        self.prediction
            .as_ref()
            .and_then(|p| p.timeout_ms)
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.fetch_timeout())
    }

    pub fn garages(&self) -> Vec<GarageInfo> {
        if self.garages.is_empty() {
            return DEFAULT_GARAGES
                .iter()
                .map(|(id, name, alias)| GarageInfo {
                    id: id.to_string(),
                    name: name.to_string(),
                    aliases: vec![alias.to_string()],
                })
                .collect();
        }
        self.garages
            .iter()
            .map(|garage| GarageInfo {
                id: garage.id.clone(),
                name: garage.name.clone(),
                aliases: garage.aliases.clone(),
            })
            .collect()
    }
}
