//! Bookmaker odds quotes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{BookmakerId, EventId, MarketId, MarketKey, Selection};

/// Identity of a quote within the snapshot store: one slot per
/// (event, market, bookmaker, selection).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteKey {
    pub event_id: EventId,
    pub market_id: MarketId,
    pub bookmaker_id: BookmakerId,
    pub selection: Selection,
}

/// A single bookmaker price for one selection of a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsQuote {
    pub bookmaker_id: BookmakerId,
    pub event_id: EventId,
    pub market_id: MarketId,
    pub selection: Selection,
    pub decimal_odds: Decimal,
    pub observed_at: DateTime<Utc>,
}

impl OddsQuote {
    pub fn key(&self) -> QuoteKey {
        QuoteKey {
            event_id: self.event_id.clone(),
            market_id: self.market_id.clone(),
            bookmaker_id: self.bookmaker_id.clone(),
            selection: self.selection.clone(),
        }
    }

    pub fn market_key(&self) -> MarketKey {
        MarketKey {
            event_id: self.event_id.clone(),
            market_id: self.market_id.clone(),
        }
    }

    /// Age of this quote relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.observed_at
    }

    /// Whether the quote is younger than `max_age_secs`.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age_secs: i64) -> bool {
        self.age(now).num_seconds() <= max_age_secs
    }

    /// The market's embedded probability estimate: `1 / decimal_odds`.
    pub fn implied_probability(&self) -> Option<Decimal> {
        if self.decimal_odds <= Decimal::ZERO {
            return None;
        }
        Some(Decimal::ONE / self.decimal_odds)
    }
}
