//! Market definitions, registry, and context signals.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::ids::{EventId, MarketId, MarketKey, Selection};

/// Market type, used for exposure bucketing and default value bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketKind {
    /// Win probability market; predicted values live in [0, 1].
    Moneyline,
    /// Point spread market.
    Spread,
    /// Total points market.
    Total,
}

impl MarketKind {
    /// Default plausible value range for predictions on this kind.
    pub fn default_bounds(self) -> ValueBounds {
        match self {
            MarketKind::Moneyline => ValueBounds::new(0.0, 1.0),
            MarketKind::Spread => ValueBounds::new(-60.0, 60.0),
            MarketKind::Total => ValueBounds::new(0.0, 300.0),
        }
    }
}

/// Plausible range for predicted values on a market.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueBounds {
    pub lower: f64,
    pub upper: f64,
}

impl ValueBounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    /// Baseline value a model's feature attributions are measured
    /// against.
    pub fn midpoint(&self) -> f64 {
        (self.lower + self.upper) / 2.0
    }
}

/// Static definition of a tracked market: its full outcome space and
/// the plausible range for model predictions.
///
/// Outcome order is meaningful: the first selection is the one priced
/// by risk recommendations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDef {
    pub event_id: EventId,
    pub market_id: MarketId,
    pub kind: MarketKind,
    pub outcomes: Vec<Selection>,
    #[serde(default)]
    pub bounds: Option<ValueBounds>,
}

impl MarketDef {
    pub fn market_key(&self) -> MarketKey {
        MarketKey {
            event_id: self.event_id.clone(),
            market_id: self.market_id.clone(),
        }
    }

    /// Effective bounds: explicit if set, otherwise the kind default.
    pub fn effective_bounds(&self) -> ValueBounds {
        self.bounds.unwrap_or_else(|| self.kind.default_bounds())
    }

    /// The selection risk recommendations are priced against.
    pub fn primary_selection(&self) -> Option<&Selection> {
        self.outcomes.first()
    }
}

/// Registry of tracked markets, keyed by (event, market).
///
/// Shared read-mostly state; per-key writes via `DashMap`.
#[derive(Debug, Default)]
pub struct MarketRegistry {
    defs: DashMap<MarketKey, Arc<MarketDef>>,
}

impl MarketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a market definition.
    pub fn register(&self, def: MarketDef) {
        self.defs.insert(def.market_key(), Arc::new(def));
    }

    pub fn get(&self, key: &MarketKey) -> Option<Arc<MarketDef>> {
        self.defs.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Snapshot of all tracked market keys, in stable order.
    pub fn keys(&self) -> Vec<MarketKey> {
        let mut keys: Vec<_> = self.defs.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

/// Observed market conditions feeding the ensemble's context
/// adjustment. Neutral defaults leave weights untouched.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MarketContext {
    /// Observed liquidity/efficiency in [0, 1]; 1.0 = fully efficient.
    pub efficiency: f64,
    /// Observed volatility in [0, 1]; 0.0 = calm.
    pub volatility: f64,
}

impl Default for MarketContext {
    fn default() -> Self {
        Self {
            efficiency: 1.0,
            volatility: 0.0,
        }
    }
}

/// Betting-side context for a market: how concentrated the portfolio
/// already is on the underlying event.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PositionContext {
    /// Fraction of bankroll already committed to this event, in [0, 1].
    pub concentration: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_def(outcomes: &[&str]) -> MarketDef {
        MarketDef {
            event_id: EventId::from("evt-1"),
            market_id: MarketId::from("moneyline"),
            kind: MarketKind::Moneyline,
            outcomes: outcomes.iter().map(|s| Selection::from(*s)).collect(),
            bounds: None,
        }
    }

    #[test]
    fn moneyline_defaults_to_probability_bounds() {
        let def = make_def(&["home", "away"]);
        let bounds = def.effective_bounds();
        assert!(bounds.contains(0.0));
        assert!(bounds.contains(1.0));
        assert!(!bounds.contains(1.1));
        assert!((bounds.midpoint() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn explicit_bounds_override_kind_default() {
        let mut def = make_def(&["over", "under"]);
        def.kind = MarketKind::Total;
        def.bounds = Some(ValueBounds::new(100.0, 260.0));
        assert!(!def.effective_bounds().contains(50.0));
    }

    #[test]
    fn primary_selection_is_first_outcome() {
        let def = make_def(&["home", "away", "draw"]);
        assert_eq!(def.primary_selection().unwrap().as_str(), "home");
    }

    #[test]
    fn registry_register_and_get() {
        let registry = MarketRegistry::new();
        registry.register(make_def(&["home", "away"]));

        let key = MarketKey::new("evt-1", "moneyline");
        let def = registry.get(&key).unwrap();
        assert_eq!(def.outcomes.len(), 2);
        assert_eq!(registry.keys(), vec![key]);
    }

    #[test]
    fn registry_replaces_existing_definition() {
        let registry = MarketRegistry::new();
        registry.register(make_def(&["home", "away"]));
        registry.register(make_def(&["home", "away", "draw"]));

        let key = MarketKey::new("evt-1", "moneyline");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&key).unwrap().outcomes.len(), 3);
    }
}
