use thiserror::Error;

use crate::domain::{EventId, MarketId};

/// Configuration-related errors. Fatal at startup, never at runtime.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Aggregation errors, contained to one (event, market) key.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnsembleError {
    #[error("no valid model outputs to aggregate for {event_id}/{market_id}")]
    InsufficientSignal {
        event_id: EventId,
        market_id: MarketId,
    },
}

/// Risk manager misuse errors. Stake clipping is not an error; it is
/// reported through the assessment's limiting factor and warnings.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    #[error("unknown risk profile: {profile_id}")]
    UnknownProfile { profile_id: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ensemble(#[from] EnsembleError),

    #[error(transparent)]
    Risk(#[from] RiskError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
