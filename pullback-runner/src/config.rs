//! Serializable run configuration, loaded from TOML.
//!
//! ```toml
//! [strategy]
//! rsi_threshold = 55.0
//!
//! [backtest]
//! initial_capital = 25000.0
//! stride = 5
//! ```
//!
//! Every field is optional and falls back to the reference defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use pullback_core::EvaluatorConfig;

use crate::backtest::{BacktestError, BacktestParams};

/// Unique identifier for a run configuration (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid strategy setting `{field}`: {reason}")]
    InvalidStrategy { field: &'static str, reason: String },

    #[error(transparent)]
    Backtest(#[from] BacktestError),
}

/// Everything needed to reproduce an evaluation or backtest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub strategy: EvaluatorConfig,
    pub backtest: BacktestParams,
}

impl RunConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no run can use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.strategy;
        if s.structure_lookback == 0 {
            return Err(invalid("structure_lookback", "must be at least 1"));
        }
        if s.stop_swing_lows == 0 {
            return Err(invalid("stop_swing_lows", "must be at least 1"));
        }
        if !(s.fallback_stop_fraction > 0.0 && s.fallback_stop_fraction <= 1.0) {
            return Err(invalid("fallback_stop_fraction", "must be in (0, 1]"));
        }
        if !(s.pullback_floor_fraction > 0.0 && s.pullback_floor_fraction.is_finite()) {
            return Err(invalid("pullback_floor_fraction", "must be positive"));
        }
        if !(0.0..=100.0).contains(&s.rsi_threshold) {
            return Err(invalid("rsi_threshold", "must be within [0, 100]"));
        }
        if !s.min_risk_pct.is_finite() {
            return Err(invalid("min_risk_pct", "must be finite"));
        }
        self.backtest.validate()?;
        Ok(())
    }

    /// Deterministic hash of this configuration.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidStrategy {
        field,
        reason: reason.to_string(),
    }
}
