//! Pipeline orchestration: quotes and model outputs in, ranked
//! opportunities out.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::app::state::AppState;
use crate::config::Config;
use crate::domain::{
    AggregatedPrediction, MarketDef, MarketKey, ModelOutput, OddsQuote, PositionContext,
    PositionId, PositionStatus, Recommendation, Selection,
};
use crate::error::{EnsembleError, Result};
use crate::service::{
    ArbitrageScanner, EnsembleAggregator, FeedEntry, FeedEvent, FeedSource, OpportunityPublisher,
    PredictionValidator, RiskManager,
};

/// Wires the validator, ensemble, risk manager, scanner, and publisher
/// around shared state.
///
/// Quote and model submissions are synchronous; the arbitrage scan
/// runs on its own cadence via [`run_scan_loop`](Self::run_scan_loop).
pub struct Engine {
    state: Arc<AppState>,
    validator: PredictionValidator,
    aggregator: EnsembleAggregator,
    risk: RiskManager,
    scanner: ArbitrageScanner,
    publisher: Arc<OpportunityPublisher>,
    prediction_max_age_secs: i64,
    quote_max_age_secs: i64,
    scan_interval: Duration,
}

impl Engine {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let state = Arc::new(AppState::new(config.risk.bankroll));
        for def in config.markets {
            state.registry.register(def);
        }

        let risk = RiskManager::new(config.risk);
        // Fail fast on a dangling profile reference.
        risk.profile(risk.active_profile_id())?;

        let scanner = ArbitrageScanner::new(
            config.arbitrage,
            Arc::clone(&state.snapshots),
            Arc::clone(&state.registry),
        );

        Ok(Self {
            state,
            validator: PredictionValidator::new(config.validator.clone()),
            aggregator: EnsembleAggregator::new(config.ensemble),
            risk,
            prediction_max_age_secs: config.validator.max_age_secs,
            quote_max_age_secs: scanner.config().quote_max_age_secs,
            scan_interval: Duration::from_secs(scanner.config().scan_interval_secs),
            scanner,
            publisher: Arc::new(OpportunityPublisher::new(config.feed_capacity)),
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn register_market(&self, def: MarketDef) {
        info!(market = %def.market_key(), outcomes = def.outcomes.len(), "Market registered");
        self.state.registry.register(def);
    }

    /// Ingest one bookmaker quote. Last writer wins per quote key; the
    /// scan loop picks it up on the next tick.
    pub fn submit_odds_quote(&self, quote: OddsQuote) {
        self.state.snapshots.upsert_quote(quote);
    }

    pub fn set_market_context(&self, key: MarketKey, context: crate::domain::MarketContext) {
        self.state.set_market_context(key, context);
    }

    /// Ingest one model output: validate, audit, re-aggregate the
    /// market, and refresh its recommendation.
    ///
    /// Returns `None` when no valid fresh signal remains for the
    /// market (the output was rejected and nothing else is live).
    pub fn submit_model_output(
        &self,
        output: ModelOutput,
        now: DateTime<Utc>,
    ) -> Result<Option<Arc<AggregatedPrediction>>> {
        let key = output.market_key();
        let def = self.state.registry.get(&key);

        let validated = self.validator.validate(output, def.as_deref(), now);
        self.state.record_validated(key.clone(), validated);

        self.recompute_market(&key, now)
    }

    fn recompute_market(
        &self,
        key: &MarketKey,
        now: DateTime<Utc>,
    ) -> Result<Option<Arc<AggregatedPrediction>>> {
        let fresh = self
            .state
            .fresh_valid(key, now, self.prediction_max_age_secs);

        let market_ctx = self.state.market_context(key);
        let position_ctx = self.position_context(key);

        let prediction = match self.aggregator.aggregate(
            key,
            &fresh,
            &market_ctx,
            &position_ctx,
            now,
        ) {
            Ok(prediction) => Arc::new(prediction),
            Err(EnsembleError::InsufficientSignal { .. }) => {
                debug!(market = %key, "No valid signal; prediction unchanged");
                return Ok(None);
            }
        };
        self.state.store_prediction(Arc::clone(&prediction));

        if let Some(def) = self.state.registry.get(key) {
            self.refresh_recommendation(&prediction, &def, now)?;
        } else {
            warn!(market = %key, "Market not registered; skipping recommendation");
        }

        Ok(Some(prediction))
    }

    fn refresh_recommendation(
        &self,
        prediction: &AggregatedPrediction,
        def: &MarketDef,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let odds = def
            .primary_selection()
            .and_then(|selection| self.best_odds(&prediction.market_key(), selection, now));

        let recommendation = {
            let positions = self.state.positions();
            self.risk.recommend(
                prediction,
                def,
                odds,
                &positions,
                self.state.bankroll(),
                now,
            )?
        };

        if let Some(recommendation) = recommendation {
            let recommendation = Arc::new(recommendation);
            self.state
                .store_recommendation(Arc::clone(&recommendation));
            self.publisher.publish_recommendation(recommendation);
        }
        Ok(())
    }

    /// Best fresh decimal odds for one selection of a market.
    fn best_odds(
        &self,
        key: &MarketKey,
        selection: &Selection,
        now: DateTime<Utc>,
    ) -> Option<Decimal> {
        self.state
            .snapshots
            .fresh_quotes_for_market(key, now, self.quote_max_age_secs)
            .into_iter()
            .filter(|q| &q.selection == selection)
            .map(|q| q.decimal_odds)
            .max()
    }

    /// Fraction of bankroll already committed to the market's event.
    fn position_context(&self, key: &MarketKey) -> PositionContext {
        let bankroll = self.state.bankroll();
        if bankroll <= Decimal::ZERO {
            return PositionContext { concentration: 1.0 };
        }
        let exposure = self.state.positions().exposure_for_event(&key.event_id);
        let concentration = (exposure / bankroll).to_f64().unwrap_or(1.0);
        PositionContext {
            concentration: concentration.clamp(0.0, 1.0),
        }
    }

    /// One pass over every registered market: publish new surebets and
    /// expire ones that no longer hold.
    pub fn scan_once(&self, now: DateTime<Utc>) {
        for (key, found) in self.scanner.scan_all(now) {
            match found {
                Some(opportunity) => {
                    self.publisher.publish_arbitrage(Arc::new(opportunity));
                }
                None => {
                    self.publisher.expire(&key, FeedSource::Arbitrage);
                }
            }
        }
    }

    /// Background scan loop. Ticks are skipped, not bunched, when a
    /// pass overruns the interval.
    pub async fn run_scan_loop(&self) {
        let mut ticker = tokio::time::interval(self.scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = self.scan_interval.as_secs(), "Arbitrage scan loop started");
        loop {
            ticker.tick().await;
            self.scan_once(Utc::now());
        }
    }

    /// Open a position against a registered market, using the active
    /// risk profile for attribution. `None` when the market is
    /// unknown.
    pub fn open_position(
        &self,
        key: &MarketKey,
        stake: Decimal,
        odds: Decimal,
        now: DateTime<Utc>,
    ) -> Option<PositionId> {
        let def = self.state.registry.get(key)?;
        let position = crate::domain::Position::open(
            key.event_id.clone(),
            key.market_id.clone(),
            def.kind,
            self.risk.active_profile_id(),
            stake,
            odds,
            now,
        );
        let id = position.id;
        self.state.positions_mut().push(position);
        info!(position = %id, market = %key, stake = %stake, "Position opened");
        Some(id)
    }

    /// Settle a position and roll its outcome into the bankroll.
    pub fn settle_position(
        &self,
        id: PositionId,
        status: PositionStatus,
        now: DateTime<Utc>,
    ) -> bool {
        let (stake, odds) = {
            let mut book = self.state.positions_mut();
            let Some(terms) = book
                .open_positions()
                .find(|p| p.id == id)
                .map(|p| (p.stake, p.odds_at_placement))
            else {
                return false;
            };
            if !book.settle(id, status, now) {
                return false;
            }
            terms
        };

        match status {
            PositionStatus::Won => {
                self.state
                    .set_bankroll(self.state.bankroll() + stake * (odds - Decimal::ONE));
            }
            PositionStatus::Lost => {
                self.state.set_bankroll(self.state.bankroll() - stake);
            }
            PositionStatus::Void | PositionStatus::Pending => {}
        }
        info!(position = %id, ?status, bankroll = %self.state.bankroll(), "Position settled");
        true
    }

    pub fn latest_prediction(&self, key: &MarketKey) -> Option<Arc<AggregatedPrediction>> {
        self.state.latest_prediction(key)
    }

    pub fn latest_recommendation(&self, key: &MarketKey) -> Option<Arc<Recommendation>> {
        self.state.latest_recommendation(key)
    }

    pub fn ranked_opportunities(&self) -> Vec<FeedEntry> {
        self.publisher.ranked()
    }

    pub fn subscribe_opportunities(&self) -> tokio::sync::broadcast::Receiver<FeedEvent> {
        self.publisher.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookmakerId, EventId, MarketId, MarketKind, ModelId, ModelKind};
    use rust_decimal_macros::dec;

    fn engine() -> Engine {
        let mut config = Config::default();
        config.markets.push(MarketDef {
            event_id: EventId::from("evt-1"),
            market_id: MarketId::from("moneyline"),
            kind: MarketKind::Moneyline,
            outcomes: vec![Selection::from("home"), Selection::from("away")],
            bounds: None,
        });
        Engine::new(config).unwrap()
    }

    fn output(model: &str, value: f64, confidence: f64, at: DateTime<Utc>) -> ModelOutput {
        ModelOutput {
            model_id: ModelId::from(model),
            kind: ModelKind::Historical,
            event_id: EventId::from("evt-1"),
            market_id: MarketId::from("moneyline"),
            predicted_value: value,
            confidence,
            produced_at: at,
            feature_attributions: None,
        }
    }

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

    fn key() -> MarketKey {
        MarketKey::new("evt-1", "moneyline")
    }

    #[test]
    fn model_output_flows_to_prediction_and_recommendation() {
        let engine = engine();
        let now = Utc::now();

        engine.submit_odds_quote(quote("bk-a", "home", dec!(2.0), now));
        let prediction = engine
            .submit_model_output(output("elo", 0.55, 0.8, now), now)
            .unwrap()
            .unwrap();

        assert!((prediction.final_value - 0.55).abs() < 1e-9);
        assert_eq!(engine.latest_prediction(&key()).unwrap().final_value, 0.55);

        let recommendation = engine.latest_recommendation(&key()).unwrap();
        assert_eq!(recommendation.selection.as_str(), "home");
        assert_eq!(recommendation.odds, Some(dec!(2.0)));
        assert!(recommendation.assessment.is_actionable());
    }

    #[test]
    fn rejected_only_output_yields_no_prediction() {
        let engine = engine();
        let now = Utc::now();

        // Out of bounds for a moneyline market.
        let result = engine
            .submit_model_output(output("elo", 1.4, 0.8, now), now)
            .unwrap();
        assert!(result.is_none());
        assert!(engine.latest_prediction(&key()).is_none());
        // The rejection is still audited.
        assert_eq!(engine.state().audit_trail(&key()).len(), 1);
    }

    #[test]
    fn missing_odds_recommendation_is_zero_stake() {
        let engine = engine();
        let now = Utc::now();

        engine
            .submit_model_output(output("elo", 0.55, 0.8, now), now)
            .unwrap();

        let recommendation = engine.latest_recommendation(&key()).unwrap();
        assert!(!recommendation.assessment.is_actionable());
    }

    #[test]
    fn scan_once_publishes_and_expires() {
        let engine = engine();
        let now = Utc::now();

        engine.submit_odds_quote(quote("bk-a", "home", dec!(2.10), now));
        engine.submit_odds_quote(quote("bk-b", "away", dec!(2.15), now));
        engine.scan_once(now);
        assert_eq!(engine.ranked_opportunities().len(), 1);

        // Odds tighten; the opportunity disappears on the next pass.
        engine.submit_odds_quote(quote("bk-b", "away", dec!(1.80), now));
        engine.scan_once(now);
        assert!(engine.ranked_opportunities().is_empty());
    }

    #[test]
    fn settlement_moves_the_bankroll() {
        let engine = engine();
        let now = Utc::now();
        let starting = engine.state().bankroll();

        let id = engine
            .open_position(&key(), dec!(100), dec!(2.5), now)
            .unwrap();
        assert!(engine.settle_position(id, PositionStatus::Won, now));
        assert_eq!(engine.state().bankroll(), starting + dec!(150.0));

        let id = engine
            .open_position(&key(), dec!(100), dec!(2.5), now)
            .unwrap();
        assert!(engine.settle_position(id, PositionStatus::Lost, now));
        assert_eq!(engine.state().bankroll(), starting + dec!(50.0));

        // Settled positions cannot settle again.
        assert!(!engine.settle_position(id, PositionStatus::Won, now));
    }

    #[test]
    fn unknown_market_cannot_take_positions() {
        let engine = engine();
        let unknown = MarketKey::new("evt-404", "moneyline");
        assert!(engine
            .open_position(&unknown, dec!(10), dec!(2.0), Utc::now())
            .is_none());
    }
}
