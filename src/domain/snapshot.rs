//! Last-writer-wins snapshot store for bookmaker quotes.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::ids::MarketKey;
use super::quote::{OddsQuote, QuoteKey};

/// Latest known quote per (event, market, bookmaker, selection).
///
/// Append-only stream semantics collapsed to one slot per key: an
/// upsert overwrites any prior quote for the same key and no history
/// is retained. Per-key writes go through `DashMap` shards, so readers
/// never block writers and writers on different keys never block each
/// other.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    quotes: DashMap<QuoteKey, OddsQuote>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest quote for its key, replacing any prior one.
    pub fn upsert_quote(&self, quote: OddsQuote) {
        self.quotes.insert(quote.key(), quote);
    }

    pub fn get(&self, key: &QuoteKey) -> Option<OddsQuote> {
        self.quotes.get(key).map(|entry| entry.value().clone())
    }

    /// All latest quotes for one (event, market), across bookmakers
    /// and selections, in stable (bookmaker, selection) order.
    pub fn quotes_for_market(&self, key: &MarketKey) -> Vec<OddsQuote> {
        let mut quotes: Vec<_> = self
            .quotes
            .iter()
            .filter(|entry| {
                let q = entry.value();
                q.event_id == key.event_id && q.market_id == key.market_id
            })
            .map(|entry| entry.value().clone())
            .collect();
        quotes.sort_by(|a, b| {
            (&a.bookmaker_id, &a.selection).cmp(&(&b.bookmaker_id, &b.selection))
        });
        quotes
    }

    /// Like [`quotes_for_market`](Self::quotes_for_market), but only
    /// quotes younger than `max_age_secs`.
    pub fn fresh_quotes_for_market(
        &self,
        key: &MarketKey,
        now: DateTime<Utc>,
        max_age_secs: i64,
    ) -> Vec<OddsQuote> {
        self.quotes_for_market(key)
            .into_iter()
            .filter(|q| q.is_fresh(now, max_age_secs))
            .collect()
    }

    /// Age of a quote relative to `now`.
    pub fn quote_age(&self, quote: &OddsQuote, now: DateTime<Utc>) -> chrono::Duration {
        quote.age(now)
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}
