//! Kelly-based stake sizing under portfolio exposure limits.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::{
    AggregatedPrediction, ExitThresholds, LimitingFactor, MarketDef, Position, PositionBook,
    Recommendation, RiskAssessment, RiskLevel, RiskProfile, RiskWarning,
};
use crate::error::RiskError;

/// Risk manager configuration: bankroll, Kelly damping, and the named
/// profile set.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    #[serde(default = "default_bankroll")]
    pub bankroll: Decimal,

    /// Fraction of the full Kelly stake actually recommended.
    #[serde(default = "default_kelly_multiplier")]
    pub kelly_multiplier: f64,

    #[serde(default = "default_active_profile")]
    pub active_profile: String,

    #[serde(default = "default_profiles")]
    pub profiles: BTreeMap<String, RiskProfile>,
}

fn default_bankroll() -> Decimal {
    Decimal::from(10_000)
}

fn default_kelly_multiplier() -> f64 {
    0.25
}

fn default_active_profile() -> String {
    "balanced".to_string()
}

fn default_profiles() -> BTreeMap<String, RiskProfile> {
    BTreeMap::from([(
        "balanced".to_string(),
        RiskProfile {
            risk_level: RiskLevel::Medium,
            max_stake_fraction_of_bankroll: dec!(0.05),
            max_exposure_per_event: dec!(500),
            max_exposure_per_market_type: dec!(2000),
            max_concurrent_positions: 20,
            stop_loss_fraction: dec!(0.5),
            take_profit_fraction: dec!(1.0),
        },
    )])
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            bankroll: default_bankroll(),
            kelly_multiplier: default_kelly_multiplier(),
            active_profile: default_active_profile(),
            profiles: default_profiles(),
        }
    }
}

/// Converts an aggregated prediction into a bounded stake
/// recommendation. Pure given its inputs; exposure state is read from
/// the position book passed in by the caller.
pub struct RiskManager {
    config: RiskConfig,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn profile(&self, profile_id: &str) -> Result<&RiskProfile, RiskError> {
        self.config
            .profiles
            .get(profile_id)
            .ok_or_else(|| RiskError::UnknownProfile {
                profile_id: profile_id.to_string(),
            })
    }

    pub fn active_profile_id(&self) -> &str {
        &self.config.active_profile
    }

    pub fn bankroll(&self) -> Decimal {
        self.config.bankroll
    }

    /// Size a stake for `prediction` at the given decimal odds.
    ///
    /// Never fails: unusable inputs produce a zero-stake assessment
    /// with warnings so callers can always render "no recommendation".
    pub fn assess(
        &self,
        prediction: &AggregatedPrediction,
        market: &MarketDef,
        odds: Option<Decimal>,
        profile: &RiskProfile,
        positions: &PositionBook,
        bankroll: Decimal,
        now: DateTime<Utc>,
    ) -> RiskAssessment {
        let Some(odds) = odds else {
            return RiskAssessment::zero(
                LimitingFactor::MissingOdds,
                vec![RiskWarning::MissingOdds],
                now,
            );
        };

        let p = prediction.final_value;
        if !(0.0..=1.0).contains(&p) {
            warn!(
                market = %prediction.market_key(),
                value = p,
                "Prediction value is not probability-like; no stake"
            );
            return RiskAssessment::zero(
                LimitingFactor::MissingOdds,
                vec![RiskWarning::ValueNotProbabilistic { value: p }],
                now,
            );
        }

        // Net fractional odds; a quote at or below evens-for-nothing
        // carries no payout to size against.
        let b = decimal_to_f64(odds) - 1.0;
        if b <= 0.0 {
            return RiskAssessment::zero(LimitingFactor::NoPayout, vec![RiskWarning::NoEdge], now);
        }

        let kelly_fraction = ((b * p - (1.0 - p)) / b).clamp(0.0, 1.0);
        let mut warnings = Vec::new();

        if kelly_fraction == 0.0 {
            warnings.push(RiskWarning::NoEdge);
        }

        let damped = kelly_fraction * self.config.kelly_multiplier;
        let mut stake = bankroll * f64_to_decimal(damped);
        let mut limiting_factor = LimitingFactor::None;

        // Clips applied in fixed order; the last one that actually
        // reduced the stake is the binding constraint.
        let stake_cap = bankroll * profile.max_stake_fraction_of_bankroll;
        if stake > stake_cap {
            stake = stake_cap;
            limiting_factor = LimitingFactor::StakeFraction;
        }

        let event_remaining = (profile.max_exposure_per_event
            - positions.exposure_for_event(&prediction.event_id))
        .max(Decimal::ZERO);
        if stake > event_remaining {
            stake = event_remaining;
            limiting_factor = LimitingFactor::EventExposure;
        }

        let kind_remaining = (profile.max_exposure_per_market_type
            - positions.exposure_for_kind(market.kind))
        .max(Decimal::ZERO);
        if stake > kind_remaining {
            stake = kind_remaining;
            limiting_factor = LimitingFactor::MarketTypeExposure;
        }

        if positions.open_count() >= profile.max_concurrent_positions {
            stake = Decimal::ZERO;
            limiting_factor = LimitingFactor::ConcurrentPositions;
            warnings.push(RiskWarning::PositionLimitReached {
                open: positions.open_count(),
                max: profile.max_concurrent_positions,
            });
        }

        let risk_level = derive_risk_level(kelly_fraction, prediction.confidence);

        debug!(
            market = %prediction.market_key(),
            kelly_fraction,
            stake = %stake,
            ?limiting_factor,
            "Stake sized"
        );

        RiskAssessment {
            recommended_stake: stake.round_dp(2),
            kelly_fraction,
            risk_level,
            limiting_factor,
            warnings,
            computed_at: now,
        }
    }

    /// Produce a feed-ready recommendation for the market's primary
    /// selection. `None` when the market declares no outcomes.
    pub fn recommend(
        &self,
        prediction: &AggregatedPrediction,
        market: &MarketDef,
        odds: Option<Decimal>,
        positions: &PositionBook,
        bankroll: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Option<Recommendation>, RiskError> {
        let Some(selection) = market.primary_selection() else {
            return Ok(None);
        };
        let profile = self.profile(&self.config.active_profile)?;

        let assessment = self.assess(prediction, market, odds, profile, positions, bankroll, now);
        let expected_value = match odds {
            Some(odds) if assessment.is_actionable() => {
                let p = prediction.final_value;
                let b = decimal_to_f64(odds) - 1.0;
                assessment.recommended_stake * f64_to_decimal(b * p - (1.0 - p))
            }
            _ => Decimal::ZERO,
        };

        Ok(Some(Recommendation {
            event_id: prediction.event_id.clone(),
            market_id: prediction.market_id.clone(),
            selection: selection.clone(),
            odds,
            expected_value: expected_value.round_dp(4),
            assessment,
            computed_at: now,
        }))
    }

    /// Advisory stop-loss / take-profit equity levels for an open
    /// position under `profile`.
    pub fn exit_thresholds(&self, position: &Position, profile: &RiskProfile) -> ExitThresholds {
        ExitThresholds {
            stop_loss: position.stake * (Decimal::ONE - profile.stop_loss_fraction),
            take_profit: position.stake * (Decimal::ONE + profile.take_profit_fraction),
        }
    }
}

fn derive_risk_level(kelly_fraction: f64, confidence: f64) -> RiskLevel {
    if kelly_fraction >= 0.15 && confidence >= 0.7 {
        RiskLevel::High
    } else if kelly_fraction >= 0.05 && confidence >= 0.4 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn decimal_to_f64(value: Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    value.to_f64().unwrap_or(0.0)
}

fn f64_to_decimal(value: f64) -> Decimal {
    Decimal::from_f64_retain(value).unwrap_or(Decimal::ZERO)
}
