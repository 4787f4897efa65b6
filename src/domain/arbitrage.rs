//! Surebet detection math and arbitrage opportunity types.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ids::{EventId, MarketId, MarketKey};
use super::quote::OddsQuote;

/// Lifecycle of a surfaced opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArbitrageStatus {
    Pending,
    Expired,
    Executed,
}

/// One leg of a surebet: a quote plus the stake allocated to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrageLeg {
    pub quote: OddsQuote,
    pub stake: Decimal,
}

impl ArbitrageLeg {
    /// Payout if this leg's outcome occurs.
    pub fn payout(&self) -> Decimal {
        self.stake * self.quote.decimal_odds
    }
}

/// A guaranteed-profit combination across bookmakers.
///
/// Invariants: `profit_margin > 0`; legs reference distinct bookmakers
/// and mutually exclusive outcomes covering the market's full outcome
/// space. Superseded, never mutated, on each fresh scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    pub id: Uuid,
    pub event_id: EventId,
    pub market_id: MarketId,
    pub legs: Vec<ArbitrageLeg>,
    /// Guaranteed return fraction: `1 - S` where `S = sum(1/odds_i)`.
    pub profit_margin: Decimal,
    pub total_stake: Decimal,
    /// Net profit regardless of outcome: `total_stake * (1 - S) / S`.
    pub guaranteed_profit: Decimal,
    pub discovered_at: DateTime<Utc>,
    pub status: ArbitrageStatus,
}

impl ArbitrageOpportunity {
    pub fn market_key(&self) -> MarketKey {
        MarketKey {
            event_id: self.event_id.clone(),
            market_id: self.market_id.clone(),
        }
    }
}

/// Evaluate one quote per outcome for a guaranteed profit.
///
/// `best_quotes` must hold the best available quote for every outcome
/// of the market, one entry per outcome. Returns `None` unless the
/// arbitrage indicator `S = sum(1/odds_i)` is below one by at least
/// `min_margin`. Stakes are allocated proportionally to `1/odds_i` so
/// the payout is identical whichever outcome occurs.
pub fn detect_surebet(
    best_quotes: &[OddsQuote],
    total_stake: Decimal,
    min_margin: Decimal,
    now: DateTime<Utc>,
) -> Option<ArbitrageOpportunity> {
    if best_quotes.len() < 2 || total_stake <= Decimal::ZERO {
        return None;
    }

    // Legs must come from distinct bookmakers.
    let bookmakers: HashSet<_> = best_quotes.iter().map(|q| &q.bookmaker_id).collect();
    if bookmakers.len() != best_quotes.len() {
        return None;
    }

    let mut inverse_sum = Decimal::ZERO;
    for quote in best_quotes {
        inverse_sum += quote.implied_probability()?;
    }

    let margin = Decimal::ONE - inverse_sum;
    if margin < min_margin || margin <= Decimal::ZERO {
        return None;
    }

    let legs = best_quotes
        .iter()
        .map(|quote| ArbitrageLeg {
            quote: quote.clone(),
            stake: total_stake * (Decimal::ONE / quote.decimal_odds) / inverse_sum,
        })
        .collect();

    let first = &best_quotes[0];
    Some(ArbitrageOpportunity {
        id: Uuid::new_v4(),
        event_id: first.event_id.clone(),
        market_id: first.market_id.clone(),
        legs,
        profit_margin: margin,
        total_stake,
        guaranteed_profit: total_stake * margin / inverse_sum,
        discovered_at: now,
        status: ArbitrageStatus::Pending,
    })
}
