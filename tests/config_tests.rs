//! Configuration loading and validation tests.

use std::io::Write;

use oddsmith::config::Config;
use oddsmith::error::{ConfigError, Error};
use rust_decimal_macros::dec;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn empty_file_falls_back_to_defaults() {
    let file = write_config("");
    let config = Config::load(file.path()).unwrap();

    assert_eq!(config.logging.level, "info");
    assert_eq!(config.risk.bankroll, dec!(10000));
    assert_eq!(config.risk.active_profile, "balanced");
    assert_eq!(config.arbitrage.min_margin, dec!(0.005));
    assert!(config.markets.is_empty());
}

#[test]
fn full_config_round_trips() {
    let file = write_config(
        r#"
[logging]
level = "debug"
format = "json"

[validator]
max_age_secs = 120
min_confidence = 0.1

[ensemble]
min_weight = 0.2
max_weight = 1.5

[ensemble.prior_weights]
historical = 1.2
market_derived = 1.0
sentiment = 0.4

[risk]
bankroll = "25000"
kelly_multiplier = 0.5
active_profile = "aggressive"

[risk.profiles.aggressive]
risk_level = "high"
max_stake_fraction_of_bankroll = "0.1"
max_exposure_per_event = "2000"
max_exposure_per_market_type = "5000"
max_concurrent_positions = 50
stop_loss_fraction = "0.7"
take_profit_fraction = "2.0"

[arbitrage]
min_margin = "0.01"
scan_interval_secs = 2
total_stake = "500"

[[markets]]
event_id = "evt-1"
market_id = "moneyline"
kind = "moneyline"
outcomes = ["home", "away"]

[[markets]]
event_id = "evt-1"
market_id = "total"
kind = "total"
outcomes = ["over", "under"]
bounds = { lower = 120.0, upper = 260.0 }
"#,
    );

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.logging.format, "json");
    assert_eq!(config.validator.max_age_secs, 120);
    assert_eq!(config.ensemble.prior_weights.sentiment, 0.4);
    assert_eq!(config.risk.bankroll, dec!(25000));
    assert_eq!(config.risk.kelly_multiplier, 0.5);
    assert_eq!(
        config.risk.profiles["aggressive"].max_concurrent_positions,
        50
    );
    assert_eq!(config.arbitrage.total_stake, dec!(500));
    assert_eq!(config.markets.len(), 2);
    assert_eq!(config.markets[1].outcomes.len(), 2);
    assert!(config.markets[1].bounds.is_some());
}

#[test]
fn unparseable_toml_is_a_parse_error() {
    let file = write_config("[risk\nbankroll = ");
    match Config::load(file.path()) {
        Err(Error::Config(ConfigError::Parse(_))) => {}
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn missing_file_is_a_read_error() {
    match Config::load("/nonexistent/oddsmith.toml") {
        Err(Error::Config(ConfigError::ReadFile(_))) => {}
        other => panic!("expected read error, got {other:?}"),
    }
}

#[test]
fn unknown_active_profile_is_rejected() {
    let file = write_config(
        r#"
[risk]
active_profile = "reckless"
"#,
    );
    match Config::load(file.path()) {
        Err(Error::Config(ConfigError::InvalidValue { field, .. })) => {
            assert_eq!(field, "risk.active_profile");
        }
        other => panic!("expected invalid value, got {other:?}"),
    }
}

#[test]
fn kelly_multiplier_outside_unit_interval_is_rejected() {
    let file = write_config(
        r#"
[risk]
kelly_multiplier = 1.5
"#,
    );
    match Config::load(file.path()) {
        Err(Error::Config(ConfigError::InvalidValue { field, .. })) => {
            assert_eq!(field, "risk.kelly_multiplier");
        }
        other => panic!("expected invalid value, got {other:?}"),
    }
}

#[test]
fn inverted_weight_clip_band_is_rejected() {
    let file = write_config(
        r#"
[ensemble]
min_weight = 3.0
max_weight = 2.0
"#,
    );
    match Config::load(file.path()) {
        Err(Error::Config(ConfigError::InvalidValue { field, .. })) => {
            assert_eq!(field, "ensemble.min_weight");
        }
        other => panic!("expected invalid value, got {other:?}"),
    }
}

#[test]
fn zero_scan_interval_is_rejected() {
    let file = write_config(
        r#"
[arbitrage]
scan_interval_secs = 0
"#,
    );
    match Config::load(file.path()) {
        Err(Error::Config(ConfigError::InvalidValue { field, .. })) => {
            assert_eq!(field, "arbitrage.scan_interval_secs");
        }
        other => panic!("expected invalid value, got {other:?}"),
    }
}

#[test]
fn negative_bankroll_is_rejected() {
    let file = write_config(
        r#"
[risk]
bankroll = "-100"
"#,
    );
    match Config::load(file.path()) {
        Err(Error::Config(ConfigError::InvalidValue { field, .. })) => {
            assert_eq!(field, "risk.bankroll");
        }
        other => panic!("expected invalid value, got {other:?}"),
    }
}
