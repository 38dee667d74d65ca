//! Messages
//!
//! The message board: one memoized listing, one mutation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::cache::{QueryKey, Scope, Tag};
use crate::context::RequestContext;
use crate::error::{CacheError, Result};
use crate::store::decode_rows;

pub const MESSAGES_TAG: &str = "messages";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub text: String,
}

/// All messages in insertion order.
///
/// The layout and the page both read this in the same cycle; only the first
/// read reaches the store.
pub async fn get_messages(ctx: &RequestContext) -> Result<Arc<Vec<Message>>> {
    ctx.read(
        QueryKey::new("all-messages"),
        &[Tag::new(MESSAGES_TAG)],
        |store| async move {
            let rows = store
                .query("SELECT id, text FROM messages ORDER BY id", Vec::new())
                .await?;
            decode_rows(rows)
        },
    )
    .await
}

/// Stores a message and invalidates the listing. Returns the new id.
pub async fn add_message(ctx: &RequestContext, text: &str) -> Result<i64> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CacheError::InvalidRequest(
            "Message cannot be empty".to_string(),
        ));
    }

    let outcome = ctx
        .mutate(
            "INSERT INTO messages (text) VALUES (?1)",
            vec![json!(text)],
            &[Scope::exact(MESSAGES_TAG)],
        )
        .await?;

    outcome
        .inserted_id
        .ok_or_else(|| CacheError::Internal("insert returned no row id".to_string()))
}
