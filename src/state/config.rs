//! Store configuration.
//!
//! All fields are optional in TOML; anything missing falls back to the
//! defaults below.
//!
//! ```toml
//! default_score = 20
//! seed_players = 4
//! min_players = 2
//! quick_adjustments = [-5, -1, 1, 5]
//! batch_window_ms = 250
//! ```

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use super::game::DEFAULT_SCORE;

/// Players created when a store starts empty.
pub const DEFAULT_SEED_PLAYERS: usize = 2;

/// Fewest players `remove_last_player` will leave behind.
pub const DEFAULT_MIN_PLAYERS: usize = 2;

/// Adjustment buttons offered on each player card.
pub const DEFAULT_QUICK_ADJUSTMENTS: [i64; 7] = [-10, -5, -2, -1, 1, 2, 5];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub default_score: i64,
    pub seed_players: usize,
    pub min_players: usize,
    pub quick_adjustments: Vec<i64>,
    /// Coalescing window for rapid adjustments; 0 applies them immediately
    pub batch_window_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_score: DEFAULT_SCORE,
            seed_players: DEFAULT_SEED_PLAYERS,
            min_players: DEFAULT_MIN_PLAYERS,
            quick_adjustments: DEFAULT_QUICK_ADJUSTMENTS.to_vec(),
            batch_window_ms: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Quick adjustments must be non-zero")]
    ZeroAdjustment,
}

impl StoreConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        debug!("Parsed store config: {:?}", config);
        Ok(config)
    }

    /// Load from a file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        info!(
            "Loaded store config from {} (default_score={}, seed_players={})",
            path.display(),
            config.default_score,
            config.seed_players
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quick_adjustments.contains(&0) {
            return Err(ConfigError::ZeroAdjustment);
        }
        Ok(())
    }

    /// Builder-style default score override.
    pub fn with_default_score(mut self, score: i64) -> Self {
        self.default_score = score;
        self
    }

    /// Builder-style seed count override.
    pub fn with_seed_players(mut self, count: usize) -> Self {
        self.seed_players = count;
        self
    }

    pub fn batch_window(&self) -> Duration {
        Duration::from_millis(self.batch_window_ms)
    }
}
