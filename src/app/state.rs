//! Shared application state.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::domain::{
    AggregatedPrediction, MarketContext, MarketKey, MarketRegistry, ModelId, PositionBook,
    Recommendation, SnapshotStore, ValidatedOutput,
};

/// Validated outputs retained per (event, market) key.
const AUDIT_CAPACITY: usize = 64;

/// Shared state accessible by all services.
///
/// Per-key maps shard through `DashMap`; the position book and bankroll
/// are coarse-grained behind `RwLock` since every stake decision reads
/// the whole book anyway.
#[derive(Default)]
pub struct AppState {
    /// Latest quote per (event, market, bookmaker, selection). Shared
    /// with the arbitrage scanner.
    pub snapshots: Arc<SnapshotStore>,
    /// Tracked market definitions. Shared with the arbitrage scanner.
    pub registry: Arc<MarketRegistry>,
    /// Bounded per-market audit trail of validated model outputs.
    audit: DashMap<MarketKey, Vec<ValidatedOutput>>,
    /// Observed market conditions, defaulting to neutral.
    contexts: DashMap<MarketKey, MarketContext>,
    /// Latest aggregated prediction per market.
    predictions: DashMap<MarketKey, Arc<AggregatedPrediction>>,
    /// Latest risk recommendation per market.
    recommendations: DashMap<MarketKey, Arc<Recommendation>>,
    positions: RwLock<PositionBook>,
    bankroll: RwLock<Decimal>,
}

impl AppState {
    pub fn new(bankroll: Decimal) -> Self {
        Self {
            bankroll: RwLock::new(bankroll),
            ..Self::default()
        }
    }

    /// Record a validated output in the audit trail.
    ///
    /// A resubmission with the same (model, produced_at) replaces the
    /// existing entry instead of appending, so replays do not inflate
    /// the trail. The trail is capped; oldest entries fall off first.
    pub fn record_validated(&self, key: MarketKey, validated: ValidatedOutput) {
        let mut trail = self.audit.entry(key).or_default();
        let slot = trail.iter_mut().find(|existing| {
            existing.output.model_id == validated.output.model_id
                && existing.output.produced_at == validated.output.produced_at
        });
        match slot {
            Some(existing) => *existing = validated,
            None => {
                trail.push(validated);
                if trail.len() > AUDIT_CAPACITY {
                    let excess = trail.len() - AUDIT_CAPACITY;
                    trail.drain(..excess);
                }
            }
        }
    }

    /// The freshest valid output per model for a market, for feeding
    /// the ensemble. One entry per model: the one with the latest
    /// `produced_at`.
    pub fn fresh_valid(
        &self,
        key: &MarketKey,
        now: DateTime<Utc>,
        max_age_secs: i64,
    ) -> Vec<ValidatedOutput> {
        let Some(trail) = self.audit.get(key) else {
            return Vec::new();
        };

        let mut latest: std::collections::BTreeMap<ModelId, &ValidatedOutput> =
            std::collections::BTreeMap::new();
        for validated in trail.iter() {
            if !validated.is_valid {
                continue;
            }
            if validated.output.age(now).num_seconds() > max_age_secs {
                continue;
            }
            let entry = latest
                .entry(validated.output.model_id.clone())
                .or_insert(validated);
            if validated.output.produced_at > entry.output.produced_at {
                *entry = validated;
            }
        }
        latest.into_values().cloned().collect()
    }

    /// Full audit trail for a market, invalid entries included.
    pub fn audit_trail(&self, key: &MarketKey) -> Vec<ValidatedOutput> {
        self.audit
            .get(key)
            .map(|trail| trail.clone())
            .unwrap_or_default()
    }

    pub fn market_context(&self, key: &MarketKey) -> MarketContext {
        self.contexts
            .get(key)
            .map(|entry| *entry.value())
            .unwrap_or_default()
    }

    pub fn set_market_context(&self, key: MarketKey, context: MarketContext) {
        self.contexts.insert(key, context);
    }

    pub fn store_prediction(&self, prediction: Arc<AggregatedPrediction>) {
        self.predictions.insert(prediction.market_key(), prediction);
    }

    pub fn latest_prediction(&self, key: &MarketKey) -> Option<Arc<AggregatedPrediction>> {
        self.predictions
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn store_recommendation(&self, recommendation: Arc<Recommendation>) {
        self.recommendations
            .insert(recommendation.market_key(), recommendation);
    }

    pub fn latest_recommendation(&self, key: &MarketKey) -> Option<Arc<Recommendation>> {
        self.recommendations
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn positions(&self) -> parking_lot::RwLockReadGuard<'_, PositionBook> {
        self.positions.read()
    }

    pub fn positions_mut(&self) -> parking_lot::RwLockWriteGuard<'_, PositionBook> {
        self.positions.write()
    }

    pub fn bankroll(&self) -> Decimal {
        *self.bankroll.read()
    }

    pub fn set_bankroll(&self, bankroll: Decimal) {
        *self.bankroll.write() = bankroll;
    }
}
