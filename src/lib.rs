//! Oddsmith - sports betting prediction ensemble and surebet scanner.
//!
//! This crate turns a stream of model predictions and bookmaker odds
//! into a ranked feed of betting opportunities:
//!
//! - **Validation** screens each model output for staleness, plausible
//!   range, and signal strength before it can influence anything.
//! - **Ensemble aggregation** combines the surviving outputs into one
//!   calibrated prediction per market, with dynamic weights that react
//!   to observed market efficiency and volatility.
//! - **Risk sizing** converts a prediction plus the best available
//!   odds into a fractional-Kelly stake, clipped by per-event,
//!   per-market-type, and concurrency limits.
//! - **Arbitrage scanning** watches the latest cross-bookmaker quotes
//!   for combinations that guarantee profit regardless of outcome.
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML files
//! - [`domain`] - Exchange-agnostic types: quotes, predictions,
//!   positions, surebet math
//! - [`service`] - Validator, ensemble, risk manager, scanner, and
//!   feed publisher
//! - [`app`] - Shared state and the [`app::Engine`] facade wiring the
//!   pipeline together
//! - [`error`] - Error types for the crate
//!
//! # Example
//!
//! ```no_run
//! use oddsmith::app::Engine;
//! use oddsmith::config::Config;
//!
//! let engine = Engine::new(Config::default()).unwrap();
//! let ranked = engine.ranked_opportunities();
//! assert!(ranked.is_empty());
//! ```

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
