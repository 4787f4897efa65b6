//! Cross-bookmaker surebet scanning over the quote snapshot store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::{
    detect_surebet, ArbitrageOpportunity, MarketKey, MarketRegistry, OddsQuote, SnapshotStore,
};

/// Arbitrage scanner configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    /// Minimum profit margin for an opportunity to surface.
    #[serde(default = "default_min_margin")]
    pub min_margin: Decimal,

    /// Quotes older than this are ignored during a scan.
    #[serde(default = "default_quote_max_age_secs")]
    pub quote_max_age_secs: i64,

    /// Cadence of the background scan loop.
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    /// Notional stake to split across the legs of each opportunity.
    #[serde(default = "default_total_stake")]
    pub total_stake: Decimal,
}

fn default_min_margin() -> Decimal {
    dec!(0.005)
}

fn default_quote_max_age_secs() -> i64 {
    300
}

fn default_scan_interval_secs() -> u64 {
    5
}

fn default_total_stake() -> Decimal {
    dec!(100)
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            min_margin: default_min_margin(),
            quote_max_age_secs: default_quote_max_age_secs(),
            scan_interval_secs: default_scan_interval_secs(),
            total_stake: default_total_stake(),
        }
    }
}

/// Scans the latest quotes for guaranteed-profit combinations.
///
/// Reads are snapshot-consistent per market: each scan takes the
/// store's current view and evaluates it without holding locks across
/// markets.
pub struct ArbitrageScanner {
    config: ScannerConfig,
    snapshots: Arc<SnapshotStore>,
    registry: Arc<MarketRegistry>,
}

impl ArbitrageScanner {
    pub fn new(
        config: ScannerConfig,
        snapshots: Arc<SnapshotStore>,
        registry: Arc<MarketRegistry>,
    ) -> Self {
        Self {
            config,
            snapshots,
            registry,
        }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Scan one market. Returns `None` when the market is unknown, an
    /// outcome has no fresh quote, or the best-odds combination carries
    /// no margin.
    pub fn scan_market(&self, key: &MarketKey, now: DateTime<Utc>) -> Option<ArbitrageOpportunity> {
        let def = self.registry.get(key)?;
        let fresh = self
            .snapshots
            .fresh_quotes_for_market(key, now, self.config.quote_max_age_secs);

        // Best available odds per outcome; every outcome must be
        // priced or the combination is not a surebet.
        let mut best: Vec<OddsQuote> = Vec::with_capacity(def.outcomes.len());
        for outcome in &def.outcomes {
            let quote = fresh
                .iter()
                .filter(|q| &q.selection == outcome)
                .max_by_key(|q| q.decimal_odds)?;
            best.push(quote.clone());
        }

        let opportunity = detect_surebet(&best, self.config.total_stake, self.config.min_margin, now);
        match &opportunity {
            Some(opp) => info!(
                market = %key,
                margin = %opp.profit_margin,
                profit = %opp.guaranteed_profit,
                legs = opp.legs.len(),
                "Surebet detected"
            ),
            None => debug!(market = %key, quotes = fresh.len(), "No surebet"),
        }
        opportunity
    }

    /// Scan every registered market, in stable key order.
    pub fn scan_all(&self, now: DateTime<Utc>) -> Vec<(MarketKey, Option<ArbitrageOpportunity>)> {
        self.registry
            .keys()
            .into_iter()
            .map(|key| {
                let found = self.scan_market(&key, now);
                (key, found)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookmakerId, EventId, MarketDef, MarketId, MarketKind, Selection};
    use chrono::Duration;

    fn quote(bookmaker: &str, selection: &str, odds: Decimal, at: DateTime<Utc>) -> OddsQuote {
        OddsQuote {
            bookmaker_id: BookmakerId::from(bookmaker),
            event_id: EventId::from("evt-1"),
            market_id: MarketId::from("moneyline"),
            selection: Selection::from(selection),
            decimal_odds: odds,
            observed_at: at,
        }
    }

    fn scanner_with(outcomes: &[&str]) -> ArbitrageScanner {
        let registry = Arc::new(MarketRegistry::new());
        registry.register(MarketDef {
            event_id: EventId::from("evt-1"),
            market_id: MarketId::from("moneyline"),
            kind: MarketKind::Moneyline,
            outcomes: outcomes.iter().map(|s| Selection::from(*s)).collect(),
            bounds: None,
        });
        ArbitrageScanner::new(
            ScannerConfig::default(),
            Arc::new(SnapshotStore::new()),
            registry,
        )
    }

    #[test]
    fn detects_two_way_surebet_from_best_quotes() {
        let scanner = scanner_with(&["home", "away"]);
        let now = Utc::now();

        scanner.snapshots.upsert_quote(quote("bk-a", "home", dec!(2.10), now));
        scanner.snapshots.upsert_quote(quote("bk-a", "away", dec!(1.80), now));
        scanner.snapshots.upsert_quote(quote("bk-b", "home", dec!(1.95), now));
        scanner.snapshots.upsert_quote(quote("bk-b", "away", dec!(2.15), now));

        let key = MarketKey::new("evt-1", "moneyline");
        let opp = scanner.scan_market(&key, now).unwrap();

        assert_eq!(opp.legs.len(), 2);
        // Best odds per outcome come from different bookmakers.
        assert_eq!(opp.legs[0].quote.bookmaker_id.as_str(), "bk-a");
        assert_eq!(opp.legs[1].quote.bookmaker_id.as_str(), "bk-b");
        assert!(opp.profit_margin > dec!(0.05));
    }

    #[test]
    fn uncovered_outcome_blocks_detection() {
        let scanner = scanner_with(&["home", "draw", "away"]);
        let now = Utc::now();

        scanner.snapshots.upsert_quote(quote("bk-a", "home", dec!(3.50), now));
        scanner.snapshots.upsert_quote(quote("bk-b", "away", dec!(3.60), now));
        // No quote for "draw".

        let key = MarketKey::new("evt-1", "moneyline");
        assert!(scanner.scan_market(&key, now).is_none());
    }

    #[test]
    fn stale_quotes_do_not_participate() {
        let scanner = scanner_with(&["home", "away"]);
        let now = Utc::now();

        scanner.snapshots.upsert_quote(quote("bk-a", "home", dec!(2.10), now));
        scanner
            .snapshots
            .upsert_quote(quote("bk-b", "away", dec!(2.15), now - Duration::seconds(600)));

        let key = MarketKey::new("evt-1", "moneyline");
        assert!(scanner.scan_market(&key, now).is_none());
    }

    #[test]
    fn unknown_market_is_skipped() {
        let scanner = scanner_with(&["home", "away"]);
        let key = MarketKey::new("evt-404", "moneyline");
        assert!(scanner.scan_market(&key, Utc::now()).is_none());
    }

    #[test]
    fn single_bookmaker_pricing_all_outcomes_is_not_a_surebet() {
        let scanner = scanner_with(&["home", "away"]);
        let now = Utc::now();

        scanner.snapshots.upsert_quote(quote("bk-a", "home", dec!(2.10), now));
        scanner.snapshots.upsert_quote(quote("bk-a", "away", dec!(2.15), now));

        let key = MarketKey::new("evt-1", "moneyline");
        assert!(scanner.scan_market(&key, now).is_none());
    }

    #[test]
    fn scan_all_visits_every_registered_market() {
        let scanner = scanner_with(&["home", "away"]);
        let results = scanner.scan_all(Utc::now());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, MarketKey::new("evt-1", "moneyline"));
        assert!(results[0].1.is_none());
    }
}
