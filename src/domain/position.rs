//! Active bet positions and portfolio exposure queries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ids::{EventId, MarketId};
use super::market::MarketKind;

/// Unique position identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionId(Uuid);

impl PositionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for PositionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pos-{}", self.0)
    }
}

/// Settlement state of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    Pending,
    Won,
    Lost,
    Void,
}

/// An active bet. Stake and odds are immutable after creation; only
/// settlement mutates the status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub event_id: EventId,
    pub market_id: MarketId,
    pub market_kind: MarketKind,
    /// Id of the risk profile that sized this position.
    pub profile_id: String,
    pub stake: Decimal,
    pub odds_at_placement: Decimal,
    pub status: PositionStatus,
    pub opened_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Position {
    pub fn open(
        event_id: EventId,
        market_id: MarketId,
        market_kind: MarketKind,
        profile_id: impl Into<String>,
        stake: Decimal,
        odds_at_placement: Decimal,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PositionId::generate(),
            event_id,
            market_id,
            market_kind,
            profile_id: profile_id.into(),
            stake,
            odds_at_placement,
            status: PositionStatus::Pending,
            opened_at,
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Pending
    }

    /// Settle the position. A settled position never reopens.
    pub fn settle(&mut self, status: PositionStatus, at: DateTime<Utc>) {
        if !self.is_open() || status == PositionStatus::Pending {
            return;
        }
        self.status = status;
        self.closed_at = Some(at);
    }
}

/// In-memory book of positions with the exposure queries the risk
/// manager needs. The owner wraps it in a lock.
#[derive(Debug, Default)]
pub struct PositionBook {
    positions: Vec<Position>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, position: Position) -> PositionId {
        let id = position.id;
        self.positions.push(position);
        id
    }

    pub fn settle(&mut self, id: PositionId, status: PositionStatus, at: DateTime<Utc>) -> bool {
        match self.positions.iter_mut().find(|p| p.id == id) {
            Some(position) if position.is_open() => {
                position.settle(status, at);
                true
            }
            _ => false,
        }
    }

    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| p.is_open())
    }

    pub fn open_count(&self) -> usize {
        self.open_positions().count()
    }

    /// Stake currently at risk against one event.
    pub fn exposure_for_event(&self, event_id: &EventId) -> Decimal {
        self.open_positions()
            .filter(|p| &p.event_id == event_id)
            .map(|p| p.stake)
            .sum()
    }

    /// Stake currently at risk against one market type.
    pub fn exposure_for_kind(&self, kind: MarketKind) -> Decimal {
        self.open_positions()
            .filter(|p| p.market_kind == kind)
            .map(|p| p.stake)
            .sum()
    }

    pub fn total_exposure(&self) -> Decimal {
        self.open_positions().map(|p| p.stake).sum()
    }
}
