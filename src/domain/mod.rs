//! Exchange-agnostic domain types and pure math.

mod arbitrage;
mod ids;
mod market;
mod output;
mod position;
mod prediction;
mod quote;
mod risk;
mod snapshot;
mod validation;

pub use arbitrage::{detect_surebet, ArbitrageLeg, ArbitrageOpportunity, ArbitrageStatus};
pub use ids::{BookmakerId, EventId, MarketId, MarketKey, ModelId, Selection};
pub use market::{
    MarketContext, MarketDef, MarketKind, MarketRegistry, PositionContext, ValueBounds,
};
pub use output::{ModelKind, ModelOutput};
pub use position::{Position, PositionBook, PositionId, PositionStatus};
pub use prediction::{
    AggregatedPrediction, ModelContribution, TopFactor, UncertaintyInterval,
};
pub use quote::{OddsQuote, QuoteKey};
pub use risk::{
    ExitThresholds, LimitingFactor, Recommendation, RiskAssessment, RiskLevel, RiskProfile,
    RiskWarning,
};
pub use snapshot::SnapshotStore;
pub use validation::{ValidatedOutput, ValidationIssue};
