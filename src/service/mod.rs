//! Stateless-ish services wired together by the app layer.

pub mod ensemble;
pub mod publisher;
pub mod risk;
pub mod scanner;
pub mod validator;

pub use ensemble::{EnsembleAggregator, EnsembleConfig, PriorWeights};
pub use publisher::{FeedEntry, FeedEvent, FeedPayload, FeedSource, OpportunityPublisher};
pub use risk::{RiskConfig, RiskManager};
pub use scanner::{ArbitrageScanner, ScannerConfig};
pub use validator::{PredictionValidator, ValidatorConfig};
