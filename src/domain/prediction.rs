//! Aggregated prediction types produced by the ensemble.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{EventId, MarketId, MarketKey, ModelId};

/// Uncertainty interval around the final value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyInterval {
    pub lower: f64,
    pub upper: f64,
}

impl UncertaintyInterval {
    /// Build an interval centered on `value` with the given half-width,
    /// guaranteeing `lower <= value <= upper`.
    pub fn around(value: f64, half_width: f64) -> Self {
        let half_width = half_width.max(0.0);
        Self {
            lower: value - half_width,
            upper: value + half_width,
        }
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// Per-model share of the final prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelContribution {
    pub model_id: ModelId,
    /// Normalized weight; all contributions sum to 1.0.
    pub weight: f64,
    pub confidence: f64,
    pub value: f64,
}

/// A ranked feature attribution merged across models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopFactor {
    pub name: String,
    /// Weight-scaled signed contribution in market units.
    pub contribution: f64,
}

/// One calibrated prediction per (event, market).
///
/// Superseded, never mutated: each recomputation for a key produces a
/// fresh value and callers always read the latest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedPrediction {
    pub event_id: EventId,
    pub market_id: MarketId,
    pub final_value: f64,
    /// Output confidence in [0, 1].
    pub confidence: f64,
    pub interval: UncertaintyInterval,
    pub model_contributions: Vec<ModelContribution>,
    pub top_factors: Vec<TopFactor>,
    pub computed_at: DateTime<Utc>,
}

impl AggregatedPrediction {
    pub fn market_key(&self) -> MarketKey {
        MarketKey {
            event_id: self.event_id.clone(),
            market_id: self.market_id.clone(),
        }
    }

    /// Sum of normalized contribution weights.
    pub fn weight_sum(&self) -> f64 {
        self.model_contributions.iter().map(|c| c.weight).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_around_contains_center() {
        let interval = UncertaintyInterval::around(0.6, 0.1);
        assert!(interval.contains(0.6));
        assert!((interval.lower - 0.5).abs() < 1e-12);
        assert!((interval.upper - 0.7).abs() < 1e-12);
    }

    #[test]
    fn interval_negative_half_width_collapses_to_point() {
        let interval = UncertaintyInterval::around(0.5, -1.0);
        assert_eq!(interval.lower, 0.5);
        assert_eq!(interval.upper, 0.5);
        assert!(interval.contains(0.5));
    }

    #[test]
    fn interval_width() {
        let interval = UncertaintyInterval::around(10.0, 2.5);
        assert!((interval.width() - 5.0).abs() < 1e-12);
    }
}
