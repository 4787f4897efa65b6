//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file; every section falls back
//! to built-in defaults so a minimal file (or none at all) still runs.

use serde::Deserialize;
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

use crate::domain::MarketDef;
use crate::error::{ConfigError, Result};
use crate::service::{EnsembleConfig, RiskConfig, ScannerConfig, ValidatorConfig};

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub ensemble: EnsembleConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub arbitrage: ScannerConfig,
    /// Markets to track from startup. More can be registered at
    /// runtime.
    #[serde(default)]
    pub markets: Vec<MarketDef>,
    /// Broadcast buffer size for feed subscribers.
    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,
}

fn default_feed_capacity() -> usize {
    256
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let config: Self = toml::from_str(&content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let ensemble = &self.ensemble;
        if ensemble.min_weight <= 0.0 || ensemble.min_weight > ensemble.max_weight {
            return Err(invalid(
                "ensemble.min_weight",
                "must be positive and no greater than max_weight",
            ));
        }
        if ensemble.z <= 0.0 {
            return Err(invalid("ensemble.z", "must be positive"));
        }
        if ensemble.fallback_sigma < 0.0 {
            return Err(invalid("ensemble.fallback_sigma", "must be non-negative"));
        }
        let priors = &ensemble.prior_weights;
        if priors.historical <= 0.0 || priors.market_derived <= 0.0 || priors.sentiment <= 0.0 {
            return Err(invalid("ensemble.prior_weights", "must all be positive"));
        }

        let risk = &self.risk;
        if risk.bankroll <= rust_decimal::Decimal::ZERO {
            return Err(invalid("risk.bankroll", "must be positive"));
        }
        if risk.kelly_multiplier <= 0.0 || risk.kelly_multiplier > 1.0 {
            return Err(invalid("risk.kelly_multiplier", "must be in (0, 1]"));
        }
        if risk.profiles.is_empty() {
            return Err(invalid("risk.profiles", "at least one profile required"));
        }
        if !risk.profiles.contains_key(&risk.active_profile) {
            return Err(ConfigError::InvalidValue {
                field: "risk.active_profile",
                reason: format!("unknown profile: {}", risk.active_profile),
            }
            .into());
        }
        for (name, profile) in &risk.profiles {
            let fraction = profile.max_stake_fraction_of_bankroll;
            if fraction <= rust_decimal::Decimal::ZERO || fraction > rust_decimal::Decimal::ONE {
                return Err(ConfigError::InvalidValue {
                    field: "risk.profiles.max_stake_fraction_of_bankroll",
                    reason: format!("profile {name}: must be in (0, 1]"),
                }
                .into());
            }
        }

        let arbitrage = &self.arbitrage;
        if arbitrage.min_margin < rust_decimal::Decimal::ZERO {
            return Err(invalid("arbitrage.min_margin", "must be non-negative"));
        }
        if arbitrage.total_stake <= rust_decimal::Decimal::ZERO {
            return Err(invalid("arbitrage.total_stake", "must be positive"));
        }
        if arbitrage.scan_interval_secs == 0 {
            return Err(invalid("arbitrage.scan_interval_secs", "must be positive"));
        }

        if self.validator.max_age_secs <= 0 {
            return Err(invalid("validator.max_age_secs", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.validator.min_confidence) {
            return Err(invalid("validator.min_confidence", "must be in [0, 1]"));
        }
        if self.feed_capacity == 0 {
            return Err(invalid("feed_capacity", "must be positive"));
        }

        Ok(())
    }

    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.logging.level));

        match self.logging.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
    .into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            validator: ValidatorConfig::default(),
            ensemble: EnsembleConfig::default(),
            risk: RiskConfig::default(),
            arbitrage: ScannerConfig::default(),
            markets: Vec::new(),
            feed_capacity: default_feed_capacity(),
        }
    }
}
