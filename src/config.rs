use crate::engine::MatchPolicy;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_LEDGER_PATH: &str = "data/trades.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub ledger_path: PathBuf,
    pub match_policy: MatchPolicy,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from(DEFAULT_LEDGER_PATH),
            match_policy: MatchPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let ledger_path = match env_map.get("LEDGER_PATH").map(|s| s.trim()) {
            Some("") => {
                return Err(ConfigError::InvalidValue(
                    "LEDGER_PATH".to_string(),
                    "must not be empty".to_string(),
                ))
            }
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_LEDGER_PATH),
        };

        let match_policy = env_map
            .get("LOT_MATCH_POLICY")
            .map(|s| s.as_str())
            .unwrap_or("single-open")
            .parse::<MatchPolicy>()
            .map_err(|e| ConfigError::InvalidValue("LOT_MATCH_POLICY".to_string(), e))?;

        Ok(Config {
            ledger_path,
            match_policy,
        })
    }

    /// Replace the ledger path, e.g. from a command-line flag.
    pub fn with_ledger_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.ledger_path = path;
        }
        self
    }
}
