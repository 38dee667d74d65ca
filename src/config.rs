//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::cache::CacheConfig;

/// How long cached reads survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
    /// Each cycle has private entries, dropped when that cycle ends
    PerCycle,
    /// Entries survive across cycles until a matching tag is invalidated
    #[default]
    UntilInvalidated,
}

impl FromStr for CacheMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-cycle" | "per_cycle" | "cycle" => Ok(CacheMode::PerCycle),
            "until-invalidated" | "until_invalidated" | "invalidated" => {
                Ok(CacheMode::UntilInvalidated)
            }
            other => Err(format!("unknown cache mode '{}'", other)),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// SQLite database file
    pub database_path: String,
    /// Read cache lifetime policy
    pub cache_mode: CacheMode,
    /// Revalidation window in seconds, 0 disables it
    pub revalidate_secs: u64,
    /// Insert demo users, posts and news on an empty database
    pub seed_demo_data: bool,
    /// User the feed is rendered for when the request names none
    pub default_user_id: i64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `DATABASE_PATH` - SQLite file (default: revalidate.db)
    /// - `CACHE_MODE` - `per-cycle` or `until-invalidated` (default: until-invalidated)
    /// - `REVALIDATE_SECS` - Revalidation window in seconds (default: 0, disabled)
    /// - `SEED_DEMO_DATA` - Seed demo rows (default: true)
    /// - `DEFAULT_USER_ID` - Feed user (default: 2)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            database_path: env::var("DATABASE_PATH").unwrap_or(defaults.database_path),
            cache_mode: parse_var("CACHE_MODE").unwrap_or(defaults.cache_mode),
            revalidate_secs: parse_var("REVALIDATE_SECS").unwrap_or(defaults.revalidate_secs),
            seed_demo_data: parse_var("SEED_DEMO_DATA").unwrap_or(defaults.seed_demo_data),
            default_user_id: parse_var("DEFAULT_USER_ID").unwrap_or(defaults.default_user_id),
        }
    }

    /// Builds the read cache settings.
    pub fn cache_config(&self) -> CacheConfig {
        let revalidate = match self.revalidate_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        CacheConfig {
            mode: self.cache_mode,
            revalidate,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            database_path: "revalidate.db".to_string(),
            cache_mode: CacheMode::UntilInvalidated,
            revalidate_secs: 0,
            seed_demo_data: true,
            default_user_id: 2,
        }
    }
}
