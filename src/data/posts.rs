//! Feed
//!
//! Posts with per-user like state. The whole feed lives under the `feed` tag
//! and each post under `feed/<id>`, so a like invalidates the feed subtree.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::cache::{QueryKey, Scope, Tag};
use crate::context::RequestContext;
use crate::error::{CacheError, Result};
use crate::store::{bool_from_int, decode_rows};

pub const FEED_TAG: &str = "feed";

const POST_COLUMNS: &str = "
    SELECT posts.id, posts.image_url, posts.title, posts.content, posts.created_at,
           users.first_name AS user_first_name,
           COUNT(likes.post_id) AS likes,
           EXISTS(SELECT 1 FROM likes WHERE likes.post_id = posts.id AND likes.user_id = ?1) AS is_liked
    FROM posts
    INNER JOIN users ON posts.user_id = users.id
    LEFT JOIN likes ON posts.id = likes.post_id";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub created_at: String,
    pub user_first_name: String,
    pub likes: i64,
    #[serde(deserialize_with = "bool_from_int")]
    pub is_liked: bool,
}

fn post_tag(post_id: i64) -> Tag {
    Tag::new(FEED_TAG).child(post_id.to_string())
}

/// The feed as seen by `user_id`, newest first.
pub async fn get_posts(ctx: &RequestContext, user_id: i64) -> Result<Arc<Vec<Post>>> {
    ctx.read(
        QueryKey::new("posts").arg(user_id),
        &[Tag::new(FEED_TAG)],
        |store| async move {
            let statement = format!(
                "{POST_COLUMNS} GROUP BY posts.id ORDER BY posts.created_at DESC"
            );
            let rows = store.query(&statement, vec![json!(user_id)]).await?;
            decode_rows(rows)
        },
    )
    .await
}

/// One post as seen by `user_id`.
pub async fn get_post(ctx: &RequestContext, post_id: i64, user_id: i64) -> Result<Arc<Post>> {
    ctx.read(
        QueryKey::new("post").arg(post_id).arg(user_id),
        &[post_tag(post_id)],
        |store| async move {
            let statement = format!("{POST_COLUMNS} WHERE posts.id = ?2 GROUP BY posts.id");
            let rows = store
                .query(&statement, vec![json!(user_id), json!(post_id)])
                .await?;
            decode_rows::<Post>(rows)?
                .into_iter()
                .next()
                .ok_or_else(|| CacheError::NotFound(format!("post {post_id}")))
        },
    )
    .await
}

/// Flips `user_id`'s like on a post and returns the post after the write.
pub async fn toggle_like(ctx: &RequestContext, post_id: i64, user_id: i64) -> Result<Arc<Post>> {
    let current = get_post(ctx, post_id, user_id).await?;

    let statement = if current.is_liked {
        "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2"
    } else {
        "INSERT INTO likes (user_id, post_id) VALUES (?1, ?2)"
    };
    ctx.mutate(
        statement,
        vec![json!(user_id), json!(post_id)],
        &[Scope::subtree(FEED_TAG)],
    )
    .await?;

    get_post(ctx, post_id, user_id).await
}
