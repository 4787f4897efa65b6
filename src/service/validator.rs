//! Model output validation ahead of the ensemble.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::domain::{MarketDef, ModelOutput, ValidatedOutput, ValidationIssue, ValueBounds};

/// Configuration for the prediction validator.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidatorConfig {
    /// Maximum model output age before it is rejected as stale.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: i64,

    /// Confidence floor below which an output is low-signal.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Allowed gap between the attribution sum and the predicted move
    /// from baseline, in market units.
    #[serde(default = "default_attribution_tolerance")]
    pub attribution_tolerance: f64,

    /// Bounds applied when the market is unknown to the registry.
    #[serde(default = "default_bounds")]
    pub default_bounds: ValueBounds,
}

fn default_max_age_secs() -> i64 {
    300 // 5 minutes
}

fn default_min_confidence() -> f64 {
    0.05
}

fn default_attribution_tolerance() -> f64 {
    0.15
}

fn default_bounds() -> ValueBounds {
    ValueBounds::new(0.0, 1.0)
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_max_age_secs(),
            min_confidence: default_min_confidence(),
            attribution_tolerance: default_attribution_tolerance(),
            default_bounds: default_bounds(),
        }
    }
}

/// Screens individual model outputs before they reach the ensemble.
///
/// Rules run in a fixed order and every violation is recorded; the
/// first excluding rule decides the primary violation. Pure: no I/O,
/// no shared state.
pub struct PredictionValidator {
    config: ValidatorConfig,
}

impl PredictionValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Validate one output against freshness, bounds, confidence, and
    /// attribution consistency.
    pub fn validate(
        &self,
        output: ModelOutput,
        market: Option<&MarketDef>,
        now: DateTime<Utc>,
    ) -> ValidatedOutput {
        let bounds = market
            .map(MarketDef::effective_bounds)
            .unwrap_or(self.config.default_bounds);

        let mut violations = Vec::new();

        let age_secs = output.age(now).num_seconds();
        if age_secs > self.config.max_age_secs {
            violations.push(ValidationIssue::Stale {
                age_secs,
                max_age_secs: self.config.max_age_secs,
            });
        }

        if !bounds.contains(output.predicted_value) {
            violations.push(ValidationIssue::OutOfBounds {
                value: output.predicted_value,
                lower: bounds.lower,
                upper: bounds.upper,
            });
        }

        if output.confidence < self.config.min_confidence {
            violations.push(ValidationIssue::LowSignal {
                confidence: output.confidence,
                floor: self.config.min_confidence,
            });
        }

        if let Some(sum) = output.attribution_sum() {
            let expected = output.predicted_value - bounds.midpoint();
            let deviation = (sum - expected).abs();
            if deviation > self.config.attribution_tolerance {
                violations.push(ValidationIssue::InconsistentAttribution {
                    deviation,
                    tolerance: self.config.attribution_tolerance,
                });
            }
        }

        let is_valid = !violations.iter().any(ValidationIssue::excludes);
        if !is_valid {
            debug!(
                model_id = %output.model_id,
                market = %output.market_key(),
                ?violations,
                "Model output excluded from aggregation"
            );
        }

        ValidatedOutput {
            output,
            is_valid,
            violations,
            validated_at: now,
        }
    }
}
