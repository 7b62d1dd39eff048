//! Feed configuration from environment variables

use crate::feed_core::aggregator::{DEFAULT_BACKLOG_CAP, DEFAULT_DISPLAY_CAP};
use crate::feed_core::auto_join::AutoJoinCriteria;
use crate::feed_core::expiry::DEFAULT_FEED_EXPIRY_MS;
use crate::feed_core::games::is_known_game;
use crate::feed_core::ledger::DEFAULT_REACH_CAP;
use std::collections::HashSet;
use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// Settings consumed by the feed engine and runtime
///
/// Loaded from environment variables with the same defaults the overlay ships with.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    /// Time-to-live for reach and found entries
    pub feed_expiry_ms: i64,

    pub max_displayed_donations: usize,

    pub max_displayed_reach: usize,

    /// Raw found events kept for recomputation
    pub found_backlog_cap: usize,

    /// Whether auto-join starts armed
    pub auto_join_enabled: bool,

    pub auto_join_min_robux: u64,

    /// Game names; empty means no filter
    pub auto_join_game_filters: HashSet<String>,

    pub auto_join_skip_full: bool,

    /// Expiry sweep period
    pub sweep_interval_ms: u64,

    /// Inbound event channel size
    pub channel_buffer: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            feed_expiry_ms: DEFAULT_FEED_EXPIRY_MS,
            max_displayed_donations: DEFAULT_DISPLAY_CAP,
            max_displayed_reach: DEFAULT_REACH_CAP,
            found_backlog_cap: DEFAULT_BACKLOG_CAP,
            auto_join_enabled: false,
            auto_join_min_robux: 0,
            auto_join_game_filters: HashSet::from(["Main".to_string()]),
            auto_join_skip_full: false,
            sweep_interval_ms: 1_000,
            channel_buffer: 1_024,
        }
    }
}

fn parse_var<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            var,
            value: raw.clone(),
        }),
        Err(_) => Ok(default),
    }
}

fn parse_bool(var: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(var) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue { var, value: raw }),
        },
        Err(_) => Ok(default),
    }
}

/// Comma-separated game names. An explicitly empty value disables the filter.
fn parse_game_filters(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .inspect(|name| {
            if !is_known_game(name) {
                log::warn!("Unknown game in AUTO_JOIN_GAME_FILTERS: {}", name);
            }
        })
        .map(str::to_string)
        .collect()
}

impl FeedConfig {
    /// Load configuration, rejecting unparseable values
    ///
    /// Environment variables:
    /// - `FEED_EXPIRY_MS` (default: 300000)
    /// - `MAX_DISPLAYED_DONATIONS` (default: 20)
    /// - `MAX_DISPLAYED_REACH` (default: 20)
    /// - `FOUND_BACKLOG_CAP` (default: 500)
    /// - `AUTO_JOIN_ENABLED` (default: false)
    /// - `AUTO_JOIN_MIN_ROBUX` (default: 0)
    /// - `AUTO_JOIN_GAME_FILTERS` (default: Main)
    /// - `AUTO_JOIN_SKIP_FULL` (default: false)
    /// - `SWEEP_INTERVAL_MS` (default: 1000)
    /// - `FEED_CHANNEL_BUFFER` (default: 1024)
    pub fn try_from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let feed_expiry_ms: i64 = parse_var("FEED_EXPIRY_MS", defaults.feed_expiry_ms)?;
        if feed_expiry_ms <= 0 {
            return Err(ConfigError::InvalidValue {
                var: "FEED_EXPIRY_MS",
                value: feed_expiry_ms.to_string(),
            });
        }

        let sweep_interval_ms: u64 = parse_var("SWEEP_INTERVAL_MS", defaults.sweep_interval_ms)?;
        if sweep_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                var: "SWEEP_INTERVAL_MS",
                value: "0".to_string(),
            });
        }

        let channel_buffer: usize = parse_var("FEED_CHANNEL_BUFFER", defaults.channel_buffer)?;
        if channel_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                var: "FEED_CHANNEL_BUFFER",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            feed_expiry_ms,
            max_displayed_donations: parse_var(
                "MAX_DISPLAYED_DONATIONS",
                defaults.max_displayed_donations,
            )?,
            max_displayed_reach: parse_var("MAX_DISPLAYED_REACH", defaults.max_displayed_reach)?,
            found_backlog_cap: parse_var("FOUND_BACKLOG_CAP", defaults.found_backlog_cap)?,
            auto_join_enabled: parse_bool("AUTO_JOIN_ENABLED", defaults.auto_join_enabled)?,
            auto_join_min_robux: parse_var("AUTO_JOIN_MIN_ROBUX", defaults.auto_join_min_robux)?,
            auto_join_game_filters: env::var("AUTO_JOIN_GAME_FILTERS")
                .map(|raw| parse_game_filters(&raw))
                .unwrap_or(defaults.auto_join_game_filters),
            auto_join_skip_full: parse_bool("AUTO_JOIN_SKIP_FULL", defaults.auto_join_skip_full)?,
            sweep_interval_ms,
            channel_buffer,
        })
    }

    /// Load configuration, falling back to defaults on bad input
    pub fn from_env() -> Self {
        Self::try_from_env().unwrap_or_else(|e| {
            log::warn!("Invalid feed configuration ({}), using defaults", e);
            Self::default()
        })
    }

    pub fn auto_join_criteria(&self) -> AutoJoinCriteria {
        AutoJoinCriteria {
            min_amount: self.auto_join_min_robux,
            game_filter: self.auto_join_game_filters.clone(),
            skip_full_servers: self.auto_join_skip_full,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 10] = [
        "FEED_EXPIRY_MS",
        "MAX_DISPLAYED_DONATIONS",
        "MAX_DISPLAYED_REACH",
        "FOUND_BACKLOG_CAP",
        "AUTO_JOIN_ENABLED",
        "AUTO_JOIN_MIN_ROBUX",
        "AUTO_JOIN_GAME_FILTERS",
        "AUTO_JOIN_SKIP_FULL",
        "SWEEP_INTERVAL_MS",
        "FEED_CHANNEL_BUFFER",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    // Env vars are process-global, so every scenario runs inside one test.
    #[test]
    fn test_config_from_env() {
        clear_env();
        let config = FeedConfig::try_from_env().unwrap();
        assert_eq!(config, FeedConfig::default());
        assert_eq!(config.feed_expiry_ms, 300_000);
        assert!(config.auto_join_game_filters.contains("Main"));

        env::set_var("FEED_EXPIRY_MS", "60000");
        env::set_var("MAX_DISPLAYED_DONATIONS", "5");
        env::set_var("AUTO_JOIN_ENABLED", "true");
        env::set_var("AUTO_JOIN_MIN_ROBUX", "1000");
        env::set_var("AUTO_JOIN_GAME_FILTERS", "Main, Voice Chat");
        env::set_var("AUTO_JOIN_SKIP_FULL", "1");
        let config = FeedConfig::try_from_env().unwrap();
        assert_eq!(config.feed_expiry_ms, 60_000);
        assert_eq!(config.max_displayed_donations, 5);
        assert!(config.auto_join_enabled);
        assert!(config.auto_join_skip_full);
        let criteria = config.auto_join_criteria();
        assert_eq!(criteria.min_amount, 1000);
        assert_eq!(criteria.game_filter.len(), 2);
        assert!(criteria.game_filter.contains("Voice Chat"));

        env::set_var("AUTO_JOIN_GAME_FILTERS", "");
        assert!(FeedConfig::try_from_env().unwrap().auto_join_game_filters.is_empty());

        env::set_var("AUTO_JOIN_MIN_ROBUX", "lots");
        assert_eq!(
            FeedConfig::try_from_env(),
            Err(ConfigError::InvalidValue {
                var: "AUTO_JOIN_MIN_ROBUX",
                value: "lots".to_string(),
            })
        );
        assert_eq!(FeedConfig::from_env(), FeedConfig::default());

        env::set_var("AUTO_JOIN_MIN_ROBUX", "0");
        env::set_var("FEED_EXPIRY_MS", "0");
        assert!(FeedConfig::try_from_env().is_err());

        clear_env();
    }
}
