//! Domain identifier types with proper encapsulation.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        ///
        /// The inner String is private so all construction goes through
        /// the defined constructors.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new id from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

string_id! {
    /// Sporting event identifier.
    EventId
}

string_id! {
    /// Market identifier within an event.
    MarketId
}

string_id! {
    /// Bookmaker identifier.
    BookmakerId
}

string_id! {
    /// Prediction model identifier.
    ModelId
}

string_id! {
    /// A named outcome within a market (e.g. "home", "away", "draw").
    Selection
}

/// Composite key for everything computed per (event, market).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarketKey {
    pub event_id: EventId,
    pub market_id: MarketId,
}

impl MarketKey {
    pub fn new(event_id: impl Into<EventId>, market_id: impl Into<MarketId>) -> Self {
        Self {
            event_id: event_id.into(),
            market_id: market_id.into(),
        }
    }
}

impl fmt::Display for MarketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.event_id, self.market_id)
    }
}

impl From<(&str, &str)> for MarketKey {
    fn from((event, market): (&str, &str)) -> Self {
        Self::new(event, market)
    }
}
