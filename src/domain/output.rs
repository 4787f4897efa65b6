//! Raw model output records as emitted by model-serving collaborators.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{EventId, MarketId, MarketKey, ModelId};

/// Broad class of a prediction model, used to look up its configured
/// prior weight and its sensitivity to market conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Models trained on historical team/player performance.
    Historical,
    /// Models that derive estimates from market odds movement.
    MarketDerived,
    /// Models that score social/news sentiment.
    Sentiment,
}

impl ModelKind {
    /// Market-sensitive models react to current odds and flow; their
    /// weight is discounted in inefficient markets.
    pub fn is_market_sensitive(self) -> bool {
        matches!(self, ModelKind::MarketDerived | ModelKind::Sentiment)
    }
}

/// One model's opinion for one (event, market) pair.
///
/// Immutable once created; consumed exactly once by the validator.
/// `feature_attributions` maps feature name to signed contribution in
/// market units, relative to the market's baseline value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelOutput {
    pub model_id: ModelId,
    pub kind: ModelKind,
    pub event_id: EventId,
    pub market_id: MarketId,
    /// Point estimate in market units (a probability for moneyline
    /// markets, points for totals, etc.).
    pub predicted_value: f64,
    /// The model's own confidence in [0, 1].
    pub confidence: f64,
    pub produced_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_attributions: Option<BTreeMap<String, f64>>,
}

impl ModelOutput {
    /// The (event, market) key this output belongs to.
    pub fn market_key(&self) -> MarketKey {
        MarketKey {
            event_id: self.event_id.clone(),
            market_id: self.market_id.clone(),
        }
    }

    /// Age of this output relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.produced_at
    }

    /// Signed sum of all feature attributions, if any were reported.
    pub fn attribution_sum(&self) -> Option<f64> {
        self.feature_attributions
            .as_ref()
            .map(|attrs| attrs.values().sum())
    }
}
