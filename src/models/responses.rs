//! Response DTOs for the revalidate API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheStats, Scope};
use crate::config::CacheMode;
use crate::data::{Meal, Message, NewsItem, Post};

/// Response body for GET /messages
#[derive(Debug, Clone, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

/// Response body for POST /messages
#[derive(Debug, Clone, Serialize)]
pub struct MessageCreatedResponse {
    pub id: i64,
    pub message: String,
}

impl MessageCreatedResponse {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            message: format!("Message {} stored", id),
        }
    }
}

/// Response body for GET /meals
#[derive(Debug, Clone, Serialize)]
pub struct MealsResponse {
    pub meals: Vec<Meal>,
}

/// Response body for POST /meals
#[derive(Debug, Clone, Serialize)]
pub struct MealCreatedResponse {
    pub slug: String,
}

/// Response body for GET /feed
#[derive(Debug, Clone, Serialize)]
pub struct FeedResponse {
    /// User the like state was computed for
    pub user_id: i64,
    pub posts: Vec<Post>,
}

/// Response body for the news listings
#[derive(Debug, Clone, Serialize)]
pub struct NewsListResponse {
    pub news: Vec<NewsItem>,
}

/// Response body for POST /news
#[derive(Debug, Clone, Serialize)]
pub struct NewsCreatedResponse {
    pub id: i64,
    pub slug: String,
}

/// Response body for POST /revalidate
#[derive(Debug, Clone, Serialize)]
pub struct RevalidateResponse {
    /// Scopes in display form, e.g. `/archive/**`
    pub scopes: Vec<String>,
    /// Entries removed from the cache
    pub removed: usize,
}

impl RevalidateResponse {
    pub fn new(scopes: &[Scope], removed: usize) -> Self {
        Self {
            scopes: scopes.iter().map(Scope::to_string).collect(),
            removed,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub mode: CacheMode,
    /// Revalidation window in seconds, if any
    pub revalidate_secs: Option<u64>,
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate ((hits + coalesced) / reads)
    pub hit_rate: f64,
    /// Cycles currently in flight
    pub active_cycles: usize,
}

impl StatsResponse {
    pub fn new(
        mode: CacheMode,
        revalidate_secs: Option<u64>,
        stats: CacheStats,
        active_cycles: usize,
    ) -> Self {
        Self {
            mode,
            revalidate_secs,
            hit_rate: stats.hit_rate(),
            stats,
            active_cycles,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revalidate_response_formats_scopes() {
        let resp = RevalidateResponse::new(&[Scope::exact("messages"), Scope::subtree("archive")], 3);
        assert_eq!(resp.scopes, vec!["/messages", "/archive/**"]);
        assert_eq!(resp.removed, 3);
    }

    #[test]
    fn test_stats_response_flattens_counters() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();

        let resp = StatsResponse::new(CacheMode::PerCycle, None, stats, 0);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["mode"], "per-cycle");
        assert_eq!(json["hits"], 1);
        assert_eq!(json["misses"], 1);
        assert!((resp.hit_rate - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
