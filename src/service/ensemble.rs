//! Dynamic-weight ensemble aggregation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::domain::{
    AggregatedPrediction, MarketContext, MarketKey, ModelContribution, ModelKind,
    PositionContext, TopFactor, UncertaintyInterval, ValidatedOutput,
};
use crate::error::EnsembleError;

/// Prior weight per model type, before confidence and context
/// adjustment.
#[derive(Debug, Clone, Deserialize)]
pub struct PriorWeights {
    #[serde(default = "default_prior")]
    pub historical: f64,
    #[serde(default = "default_prior")]
    pub market_derived: f64,
    #[serde(default = "default_sentiment_prior")]
    pub sentiment: f64,
}

fn default_prior() -> f64 {
    1.0
}

fn default_sentiment_prior() -> f64 {
    0.6
}

impl Default for PriorWeights {
    fn default() -> Self {
        Self {
            historical: default_prior(),
            market_derived: default_prior(),
            sentiment: default_sentiment_prior(),
        }
    }
}

impl PriorWeights {
    pub fn for_kind(&self, kind: ModelKind) -> f64 {
        match kind {
            ModelKind::Historical => self.historical,
            ModelKind::MarketDerived => self.market_derived,
            ModelKind::Sentiment => self.sentiment,
        }
    }
}

/// Configuration for the ensemble aggregator.
#[derive(Debug, Clone, Deserialize)]
pub struct EnsembleConfig {
    #[serde(default)]
    pub prior_weights: PriorWeights,

    /// Clip band applied to adjusted weights before normalization, so
    /// no model is zeroed out or dominates.
    #[serde(default = "default_min_weight")]
    pub min_weight: f64,
    #[serde(default = "default_max_weight")]
    pub max_weight: f64,

    /// Interval half-width multiplier on the weighted standard
    /// deviation (~1.64 for an 80% interval).
    #[serde(default = "default_z")]
    pub z: f64,

    /// Extra widening applied when fewer than two models contribute.
    #[serde(default = "default_single_input_widening")]
    pub single_input_widening: f64,

    /// Floor on the dispersion used for the degenerate single-model
    /// interval, in market units.
    #[serde(default = "default_fallback_sigma")]
    pub fallback_sigma: f64,

    /// How many merged feature attributions to report.
    #[serde(default = "default_top_factors")]
    pub top_factors: usize,

    /// Weight discount for market-sensitive models in inefficient
    /// markets.
    #[serde(default = "default_inefficiency_discount")]
    pub inefficiency_discount: f64,

    /// Weight boost for historically-stable models in volatile
    /// markets.
    #[serde(default = "default_stability_gain")]
    pub stability_gain: f64,

    /// Confidence penalty per unit of portfolio concentration on the
    /// event.
    #[serde(default = "default_concentration_penalty")]
    pub concentration_penalty: f64,
}

fn default_min_weight() -> f64 {
    0.1
}

fn default_max_weight() -> f64 {
    2.0
}

fn default_z() -> f64 {
    1.64
}

fn default_single_input_widening() -> f64 {
    1.5
}

fn default_fallback_sigma() -> f64 {
    0.1
}

fn default_top_factors() -> usize {
    5
}

fn default_inefficiency_discount() -> f64 {
    0.3
}

fn default_stability_gain() -> f64 {
    0.25
}

fn default_concentration_penalty() -> f64 {
    0.3
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            prior_weights: PriorWeights::default(),
            min_weight: default_min_weight(),
            max_weight: default_max_weight(),
            z: default_z(),
            single_input_widening: default_single_input_widening(),
            fallback_sigma: default_fallback_sigma(),
            top_factors: default_top_factors(),
            inefficiency_discount: default_inefficiency_discount(),
            stability_gain: default_stability_gain(),
            concentration_penalty: default_concentration_penalty(),
        }
    }
}

/// Combines validated model outputs into one calibrated prediction.
///
/// Pure function of its inputs: safe to run concurrently on different
/// (event, market) keys, and recomputation for the same inputs yields
/// the same result.
pub struct EnsembleAggregator {
    config: EnsembleConfig,
}

impl EnsembleAggregator {
    pub fn new(config: EnsembleConfig) -> Self {
        Self { config }
    }

    /// Aggregate the valid subset of `validated` into a single
    /// prediction for `key`.
    pub fn aggregate(
        &self,
        key: &MarketKey,
        validated: &[ValidatedOutput],
        market_ctx: &MarketContext,
        position_ctx: &PositionContext,
        now: DateTime<Utc>,
    ) -> Result<AggregatedPrediction, EnsembleError> {
        // Stable order by model id: deterministic tie-break when two
        // models carry identical adjusted weight.
        let mut inputs: Vec<&ValidatedOutput> =
            validated.iter().filter(|v| v.is_valid).collect();
        inputs.sort_by(|a, b| a.output.model_id.cmp(&b.output.model_id));

        if inputs.is_empty() {
            return Err(EnsembleError::InsufficientSignal {
                event_id: key.event_id.clone(),
                market_id: key.market_id.clone(),
            });
        }

        // Adjusted weight: prior x confidence x context, clipped.
        let clipped: Vec<f64> = inputs
            .iter()
            .map(|v| {
                let output = &v.output;
                let prior = self.config.prior_weights.for_kind(output.kind);
                let confidence_factor = 0.5 + output.confidence;
                let context_factor = self.context_factor(output.kind, market_ctx);
                (prior * confidence_factor * context_factor)
                    .clamp(self.config.min_weight, self.config.max_weight)
            })
            .collect();

        let total: f64 = clipped.iter().sum();
        let weights: Vec<f64> = clipped.iter().map(|w| w / total).collect();

        let final_value: f64 = inputs
            .iter()
            .zip(&weights)
            .map(|(v, w)| w * v.output.predicted_value)
            .sum();

        let weighted_variance: f64 = inputs
            .iter()
            .zip(&weights)
            .map(|(v, w)| w * (v.output.predicted_value - final_value).powi(2))
            .sum();
        let sigma = weighted_variance.sqrt();

        let half_width = if inputs.len() >= 2 {
            self.config.z * sigma
        } else {
            self.config.z
                * self.config.single_input_widening
                * sigma.max(self.config.fallback_sigma)
        };
        let interval = UncertaintyInterval::around(final_value, half_width);

        let model_contributions: Vec<ModelContribution> = inputs
            .iter()
            .zip(&weights)
            .map(|(v, w)| ModelContribution {
                model_id: v.output.model_id.clone(),
                weight: *w,
                confidence: v.output.confidence,
                value: v.output.predicted_value,
            })
            .collect();

        let top_factors = self.merge_top_factors(&inputs, &weights);
        let confidence =
            self.output_confidence(&inputs, &weights, final_value, sigma, position_ctx);

        debug!(
            market = %key,
            models = inputs.len(),
            final_value,
            confidence,
            "Aggregated prediction"
        );

        Ok(AggregatedPrediction {
            event_id: key.event_id.clone(),
            market_id: key.market_id.clone(),
            final_value,
            confidence,
            interval,
            model_contributions,
            top_factors,
            computed_at: now,
        })
    }

    /// Multiplicative context factor per model kind.
    ///
    /// Market-sensitive models are discounted as observed efficiency
    /// drops; stable models gain weight as volatility rises.
    fn context_factor(&self, kind: ModelKind, ctx: &MarketContext) -> f64 {
        let factor = if kind.is_market_sensitive() {
            1.0 - self.config.inefficiency_discount * (1.0 - ctx.efficiency.clamp(0.0, 1.0))
        } else {
            1.0 + self.config.stability_gain * ctx.volatility.clamp(0.0, 1.0)
        };
        factor.max(0.01)
    }

    /// Merge per-model attributions scaled by ensemble weight and keep
    /// the top N by absolute magnitude.
    fn merge_top_factors(&self, inputs: &[&ValidatedOutput], weights: &[f64]) -> Vec<TopFactor> {
        let mut merged: BTreeMap<String, f64> = BTreeMap::new();
        for (v, w) in inputs.iter().zip(weights) {
            if let Some(attrs) = &v.output.feature_attributions {
                for (name, contribution) in attrs {
                    *merged.entry(name.clone()).or_insert(0.0) += w * contribution;
                }
            }
        }

        let mut factors: Vec<TopFactor> = merged
            .into_iter()
            .map(|(name, contribution)| TopFactor { name, contribution })
            .collect();
        // Magnitude descending; BTreeMap iteration already fixed name
        // order for exact ties.
        factors.sort_by(|a, b| {
            b.contribution
                .abs()
                .partial_cmp(&a.contribution.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        factors.truncate(self.config.top_factors);
        factors
    }

    /// Output confidence from weighted input confidence, model
    /// agreement, and input count, scaled down under portfolio
    /// concentration. Always in [0, 1].
    fn output_confidence(
        &self,
        inputs: &[&ValidatedOutput],
        weights: &[f64],
        final_value: f64,
        sigma: f64,
        position_ctx: &PositionContext,
    ) -> f64 {
        let weighted_confidence: f64 = inputs
            .iter()
            .zip(weights)
            .map(|(v, w)| w * v.output.confidence)
            .sum();

        let scale = final_value.abs().max(1.0);
        let agreement = (1.0 - sigma / scale).clamp(0.0, 1.0);

        let count_ceiling = 1.0 - 0.3 / inputs.len() as f64;
        let concentration_scale = 1.0
            - self.config.concentration_penalty * position_ctx.concentration.clamp(0.0, 1.0);

        ((0.6 * weighted_confidence + 0.4 * agreement) * count_ceiling * concentration_scale)
            .clamp(0.0, 1.0)
    }
}
