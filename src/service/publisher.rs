//! Ranked opportunity feed with broadcast change notifications.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::{ArbitrageOpportunity, MarketKey, Recommendation};

/// Which pipeline produced a feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedSource {
    Recommendation,
    Arbitrage,
}

/// The opportunity behind a feed entry.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FeedPayload {
    Recommendation(Arc<Recommendation>),
    Arbitrage(Arc<ArbitrageOpportunity>),
}

/// One live entry in the opportunity feed. At most one entry exists
/// per (market, source) at any time; newer computations supersede it.
#[derive(Debug, Clone, Serialize)]
pub struct FeedEntry {
    pub market_key: MarketKey,
    pub source: FeedSource,
    /// Ranking score: expected value for recommendations, guaranteed
    /// profit for arbitrage.
    pub score: Decimal,
    pub computed_at: DateTime<Utc>,
    pub payload: FeedPayload,
}

/// Change notification pushed to feed subscribers.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    New(FeedEntry),
    Updated(FeedEntry),
    Expired {
        market_key: MarketKey,
        source: FeedSource,
    },
}

/// Publishes recommendations and arbitrage finds to a ranked in-memory
/// feed and a broadcast channel.
///
/// Out-of-order publishes resolve by `computed_at`: an entry older than
/// the live one is dropped, so subscribers never observe time moving
/// backwards for a (market, source) slot.
pub struct OpportunityPublisher {
    entries: DashMap<(MarketKey, FeedSource), FeedEntry>,
    events: broadcast::Sender<FeedEvent>,
}

impl OpportunityPublisher {
    pub fn new(channel_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(channel_capacity);
        Self {
            entries: DashMap::new(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }

    pub fn publish_recommendation(&self, recommendation: Arc<Recommendation>) {
        let entry = FeedEntry {
            market_key: recommendation.market_key(),
            source: FeedSource::Recommendation,
            score: recommendation.expected_value,
            computed_at: recommendation.computed_at,
            payload: FeedPayload::Recommendation(recommendation),
        };
        self.publish(entry);
    }

    pub fn publish_arbitrage(&self, opportunity: Arc<ArbitrageOpportunity>) {
        let entry = FeedEntry {
            market_key: opportunity.market_key(),
            source: FeedSource::Arbitrage,
            score: opportunity.guaranteed_profit,
            computed_at: opportunity.discovered_at,
            payload: FeedPayload::Arbitrage(opportunity),
        };
        self.publish(entry);
    }

    fn publish(&self, entry: FeedEntry) {
        use dashmap::mapref::entry::Entry;

        let key = (entry.market_key.clone(), entry.source);
        let event = match self.entries.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(entry.clone());
                FeedEvent::New(entry)
            }
            Entry::Occupied(mut slot) => {
                if entry.computed_at < slot.get().computed_at {
                    debug!(
                        market = %entry.market_key,
                        source = ?entry.source,
                        "Dropping superseded feed entry"
                    );
                    return;
                }
                slot.insert(entry.clone());
                FeedEvent::Updated(entry)
            }
        };
        // Send fails only when nobody is subscribed.
        let _ = self.events.send(event);
    }

    /// Remove a live entry and notify subscribers. No-op for keys with
    /// no live entry.
    pub fn expire(&self, market_key: &MarketKey, source: FeedSource) -> bool {
        let removed = self
            .entries
            .remove(&(market_key.clone(), source))
            .is_some();
        if removed {
            let _ = self.events.send(FeedEvent::Expired {
                market_key: market_key.clone(),
                source,
            });
        }
        removed
    }

    pub fn get(&self, market_key: &MarketKey, source: FeedSource) -> Option<FeedEntry> {
        self.entries
            .get(&(market_key.clone(), source))
            .map(|entry| entry.value().clone())
    }

    /// All live entries, best score first. Ties break on recency, then
    /// market key for a stable order.
    pub fn ranked(&self) -> Vec<FeedEntry> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then(b.computed_at.cmp(&a.computed_at))
                .then(a.market_key.cmp(&b.market_key))
        });
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ArbitrageStatus, EventId, LimitingFactor, MarketId, RiskAssessment, RiskLevel, Selection,
    };
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn recommendation(event: &str, ev: Decimal, at: DateTime<Utc>) -> Arc<Recommendation> {
        Arc::new(Recommendation {
            event_id: EventId::from(event),
            market_id: MarketId::from("moneyline"),
            selection: Selection::from("home"),
            odds: Some(dec!(2.0)),
            expected_value: ev,
            assessment: RiskAssessment {
                recommended_stake: dec!(100),
                kelly_fraction: 0.1,
                risk_level: RiskLevel::Medium,
                limiting_factor: LimitingFactor::None,
                warnings: vec![],
                computed_at: at,
            },
            computed_at: at,
        })
    }

    fn arbitrage(event: &str, profit: Decimal, at: DateTime<Utc>) -> Arc<ArbitrageOpportunity> {
        Arc::new(ArbitrageOpportunity {
            id: Uuid::new_v4(),
            event_id: EventId::from(event),
            market_id: MarketId::from("moneyline"),
            legs: vec![],
            profit_margin: dec!(0.05),
            total_stake: dec!(100),
            guaranteed_profit: profit,
            discovered_at: at,
            status: ArbitrageStatus::Pending,
        })
    }

    #[test]
    fn first_publish_is_new_then_updated() {
        let publisher = OpportunityPublisher::new(16);
        let mut rx = publisher.subscribe();
        let t0 = Utc::now();

        publisher.publish_recommendation(recommendation("evt-1", dec!(10), t0));
        publisher.publish_recommendation(recommendation(
            "evt-1",
            dec!(12),
            t0 + Duration::seconds(1),
        ));

        assert!(matches!(rx.try_recv().unwrap(), FeedEvent::New(_)));
        assert!(matches!(rx.try_recv().unwrap(), FeedEvent::Updated(_)));
        assert_eq!(publisher.len(), 1);
    }

    #[test]
    fn older_entry_never_supersedes_newer() {
        let publisher = OpportunityPublisher::new(16);
        let t0 = Utc::now();

        publisher.publish_recommendation(recommendation("evt-1", dec!(12), t0));
        publisher.publish_recommendation(recommendation(
            "evt-1",
            dec!(99),
            t0 - Duration::seconds(30),
        ));

        let key = MarketKey::new("evt-1", "moneyline");
        let live = publisher.get(&key, FeedSource::Recommendation).unwrap();
        assert_eq!(live.score, dec!(12));
    }

    #[test]
    fn sources_occupy_independent_slots() {
        let publisher = OpportunityPublisher::new(16);
        let now = Utc::now();

        publisher.publish_recommendation(recommendation("evt-1", dec!(10), now));
        publisher.publish_arbitrage(arbitrage("evt-1", dec!(6), now));

        assert_eq!(publisher.len(), 2);
    }

    #[test]
    fn ranked_orders_by_score_descending() {
        let publisher = OpportunityPublisher::new(16);
        let now = Utc::now();

        publisher.publish_recommendation(recommendation("evt-1", dec!(10), now));
        publisher.publish_recommendation(recommendation("evt-2", dec!(25), now));
        publisher.publish_arbitrage(arbitrage("evt-3", dec!(15), now));

        let scores: Vec<_> = publisher.ranked().iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![dec!(25), dec!(15), dec!(10)]);
    }

    #[test]
    fn subscriber_receives_events_across_await_points() {
        tokio_test::block_on(async {
            let publisher = OpportunityPublisher::new(16);
            let mut rx = publisher.subscribe();

            publisher.publish_arbitrage(arbitrage("evt-1", dec!(6), Utc::now()));

            match rx.recv().await.unwrap() {
                FeedEvent::New(entry) => assert_eq!(entry.source, FeedSource::Arbitrage),
                other => panic!("expected New, got {other:?}"),
            }
        });
    }

    #[test]
    fn feed_entry_serializes_for_transport() {
        let publisher = OpportunityPublisher::new(16);
        publisher.publish_arbitrage(arbitrage("evt-1", dec!(6), Utc::now()));

        let key = MarketKey::new("evt-1", "moneyline");
        let entry = publisher.get(&key, FeedSource::Arbitrage).unwrap();
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["source"], "arbitrage");
        assert_eq!(json["market_key"]["event_id"], "evt-1");
        assert_eq!(json["payload"]["guaranteed_profit"], "6");
    }

    #[test]
    fn expire_removes_and_notifies() {
        let publisher = OpportunityPublisher::new(16);
        let now = Utc::now();
        publisher.publish_arbitrage(arbitrage("evt-1", dec!(6), now));
        let mut rx = publisher.subscribe();

        let key = MarketKey::new("evt-1", "moneyline");
        assert!(publisher.expire(&key, FeedSource::Arbitrage));
        assert!(publisher.is_empty());
        assert!(matches!(
            rx.try_recv().unwrap(),
            FeedEvent::Expired {
                source: FeedSource::Arbitrage,
                ..
            }
        ));

        // Second expire is a no-op.
        assert!(!publisher.expire(&key, FeedSource::Arbitrage));
    }
}
