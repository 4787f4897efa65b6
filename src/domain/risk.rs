//! Risk profiles, assessments, and recommendations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{EventId, MarketId, MarketKey, Selection};

/// Coarse risk appetite attached to profiles and assessments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Named risk policy. Mutated only by explicit configuration updates;
/// positions reference a profile by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskProfile {
    pub risk_level: RiskLevel,
    /// Hard cap on a single stake as a fraction of bankroll.
    pub max_stake_fraction_of_bankroll: Decimal,
    /// Maximum stake at risk against a single event.
    pub max_exposure_per_event: Decimal,
    /// Maximum stake at risk against a single market type.
    pub max_exposure_per_market_type: Decimal,
    pub max_concurrent_positions: usize,
    /// Fraction of stake lost at which an exit is advised.
    pub stop_loss_fraction: Decimal,
    /// Fraction of stake gained at which taking profit is advised.
    pub take_profit_fraction: Decimal,
}

/// Which constraint bound the recommended stake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitingFactor {
    /// The Kelly fraction itself was binding; no limit clipped it.
    None,
    StakeFraction,
    EventExposure,
    MarketTypeExposure,
    ConcurrentPositions,
    /// No usable odds; stake forced to zero.
    MissingOdds,
    /// Odds were quoted at or below 1.0; there is no payout to size
    /// against.
    NoPayout,
}

/// Non-fatal conditions surfaced alongside an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RiskWarning {
    /// No fresh quote was available for the priced selection.
    MissingOdds,
    /// The prediction offers no positive edge at current odds.
    NoEdge,
    /// Concurrent position limit already reached.
    PositionLimitReached { open: usize, max: usize },
    /// Prediction value is not probability-like; cannot derive a win
    /// probability.
    ValueNotProbabilistic { value: f64 },
}

/// Ephemeral result of one stake-sizing attempt. Not persisted beyond
/// the recommendation's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub recommended_stake: Decimal,
    /// Unclipped Kelly fraction in [0, 1], before the multiplier.
    pub kelly_fraction: f64,
    pub risk_level: RiskLevel,
    pub limiting_factor: LimitingFactor,
    pub warnings: Vec<RiskWarning>,
    pub computed_at: DateTime<Utc>,
}

impl RiskAssessment {
    /// Zero-stake assessment for the "no recommendation" paths.
    pub fn zero(
        limiting_factor: LimitingFactor,
        warnings: Vec<RiskWarning>,
        computed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            recommended_stake: Decimal::ZERO,
            kelly_fraction: 0.0,
            risk_level: RiskLevel::Low,
            limiting_factor,
            warnings,
            computed_at,
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.recommended_stake > Decimal::ZERO
    }
}

/// A risk-backed betting recommendation, ready for the opportunity
/// feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub event_id: EventId,
    pub market_id: MarketId,
    /// The selection being priced (the market's primary outcome).
    pub selection: Selection,
    /// Best available decimal odds used for sizing, if any.
    pub odds: Option<Decimal>,
    /// Expected value of the recommended stake at those odds.
    pub expected_value: Decimal,
    pub assessment: RiskAssessment,
    pub computed_at: DateTime<Utc>,
}

impl Recommendation {
    pub fn market_key(&self) -> MarketKey {
        MarketKey {
            event_id: self.event_id.clone(),
            market_id: self.market_id.clone(),
        }
    }
}

/// Advisory exit levels implied by a profile's stop-loss and
/// take-profit fractions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitThresholds {
    /// Equity level at which the position should be cut.
    pub stop_loss: Decimal,
    /// Equity level at which profit should be taken.
    pub take_profit: Decimal,
}
