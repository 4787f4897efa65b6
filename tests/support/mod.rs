//! Shared builders for integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use oddsmith::config::Config;
use oddsmith::domain::{
    BookmakerId, EventId, MarketDef, MarketId, MarketKey, MarketKind, ModelId, ModelKind,
    ModelOutput, OddsQuote, Selection,
};
use rust_decimal::Decimal;

pub fn moneyline_market(event: &str) -> MarketDef {
    MarketDef {
        event_id: EventId::from(event),
        market_id: MarketId::from("moneyline"),
        kind: MarketKind::Moneyline,
        outcomes: vec![Selection::from("home"), Selection::from("away")],
        bounds: None,
    }
}

pub fn three_way_market(event: &str) -> MarketDef {
    MarketDef {
        event_id: EventId::from(event),
        market_id: MarketId::from("moneyline"),
        kind: MarketKind::Moneyline,
        outcomes: vec![
            Selection::from("home"),
            Selection::from("draw"),
            Selection::from("away"),
        ],
        bounds: None,
    }
}

pub fn market_key(event: &str) -> MarketKey {
    MarketKey::new(event, "moneyline")
}

pub fn quote(
    event: &str,
    bookmaker: &str,
    selection: &str,
    odds: Decimal,
    at: DateTime<Utc>,
) -> OddsQuote {
    OddsQuote {
        bookmaker_id: BookmakerId::from(bookmaker),
        event_id: EventId::from(event),
        market_id: MarketId::from("moneyline"),
        selection: Selection::from(selection),
        decimal_odds: odds,
        observed_at: at,
    }
}

pub fn model_output(
    event: &str,
    model: &str,
    kind: ModelKind,
    value: f64,
    confidence: f64,
    at: DateTime<Utc>,
) -> ModelOutput {
    ModelOutput {
        model_id: ModelId::from(model),
        kind,
        event_id: EventId::from(event),
        market_id: MarketId::from("moneyline"),
        predicted_value: value,
        confidence,
        produced_at: at,
        feature_attributions: None,
    }
}

pub fn config_with_markets(markets: Vec<MarketDef>) -> Config {
    let mut config = Config::default();
    config.markets = markets;
    config
}
