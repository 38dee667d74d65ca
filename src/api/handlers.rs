//! API Handlers
//!
//! HTTP request handlers. Every handler runs in its own cycle: it opens a
//! [`RequestContext`] and the cycle ends when the context drops.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::cache::{Invalidator, ReadCache};
use crate::config::Config;
use crate::context::RequestContext;
use crate::data::{meals, messages, news, posts, ArchiveView, Meal, NewsItem, Post};
use crate::error::{CacheError, Result};
use crate::models::{
    FeedResponse, HealthResponse, MealCreatedResponse, MealsResponse, MessageCreatedResponse,
    MessagesResponse, NewMealRequest, NewMessageRequest, NewNewsRequest, NewsCreatedResponse,
    NewsListResponse, RevalidateRequest, RevalidateResponse, StatsResponse, UserQuery,
};
use crate::store::StoreAccessor;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Read cache shared by all cycles
    pub cache: Arc<ReadCache>,
    pub store: Arc<dyn StoreAccessor>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(cache: ReadCache, store: Arc<dyn StoreAccessor>, config: Config) -> Self {
        Self {
            cache: Arc::new(cache),
            store,
            config: Arc::new(config),
        }
    }

    /// Creates the state from configuration, with a cache built from
    /// `config.cache_config()`.
    pub fn from_config(config: Config, store: Arc<dyn StoreAccessor>) -> Self {
        let cache = ReadCache::new(config.cache_config());
        Self::new(cache, store, config)
    }

    /// Starts a new cycle.
    pub fn begin_request(&self) -> RequestContext {
        RequestContext::begin(&self.cache, Arc::clone(&self.store))
    }

    fn user_or_default(&self, query: UserQuery) -> i64 {
        query.user.unwrap_or(self.config.default_user_id)
    }
}

// == Messages ==

/// Handler for GET /messages
pub async fn list_messages_handler(
    State(state): State<AppState>,
) -> Result<Json<MessagesResponse>> {
    let ctx = state.begin_request();
    let messages = messages::get_messages(&ctx).await?;
    Ok(Json(MessagesResponse {
        messages: messages.to_vec(),
    }))
}

/// Handler for POST /messages
pub async fn create_message_handler(
    State(state): State<AppState>,
    Json(req): Json<NewMessageRequest>,
) -> Result<(StatusCode, Json<MessageCreatedResponse>)> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ctx = state.begin_request();
    let id = messages::add_message(&ctx, &req.text).await?;
    Ok((StatusCode::CREATED, Json(MessageCreatedResponse::new(id))))
}

// == Meals ==

/// Handler for GET /meals
pub async fn list_meals_handler(State(state): State<AppState>) -> Result<Json<MealsResponse>> {
    let ctx = state.begin_request();
    let meals = meals::get_meals(&ctx).await?;
    Ok(Json(MealsResponse {
        meals: meals.to_vec(),
    }))
}

/// Handler for GET /meals/:slug
pub async fn meal_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Meal>> {
    let ctx = state.begin_request();
    let meal = meals::get_meal(&ctx, &slug).await?;
    Ok(Json(Meal::clone(&meal)))
}

/// Handler for POST /meals
pub async fn create_meal_handler(
    State(state): State<AppState>,
    Json(req): Json<NewMealRequest>,
) -> Result<(StatusCode, Json<MealCreatedResponse>)> {
    let ctx = state.begin_request();
    let slug = meals::save_meal(&ctx, req.into()).await?;
    info!(slug = %slug, "Meal shared");
    Ok((StatusCode::CREATED, Json(MealCreatedResponse { slug })))
}

// == Feed ==

/// Handler for GET /feed
pub async fn feed_handler(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<FeedResponse>> {
    let user_id = state.user_or_default(query);
    let ctx = state.begin_request();
    let posts = posts::get_posts(&ctx, user_id).await?;
    Ok(Json(FeedResponse {
        user_id,
        posts: posts.to_vec(),
    }))
}

/// Handler for POST /feed/:id/like
///
/// Returns the post after the toggle so clients can settle their guess.
pub async fn like_handler(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Post>> {
    let user_id = state.user_or_default(query);
    let ctx = state.begin_request();
    let post = posts::toggle_like(&ctx, post_id, user_id).await?;
    Ok(Json(Post::clone(&post)))
}

// == News ==

/// Handler for GET /news
pub async fn news_handler(State(state): State<AppState>) -> Result<Json<NewsListResponse>> {
    let ctx = state.begin_request();
    let news = news::get_all_news(&ctx).await?;
    Ok(Json(NewsListResponse {
        news: news.to_vec(),
    }))
}

/// Handler for GET /latest-news
pub async fn latest_news_handler(
    State(state): State<AppState>,
) -> Result<Json<NewsListResponse>> {
    let ctx = state.begin_request();
    let news = news::get_latest_news(&ctx).await?;
    Ok(Json(NewsListResponse {
        news: news.to_vec(),
    }))
}

/// Handler for GET /news/:slug
pub async fn news_item_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<NewsItem>> {
    let ctx = state.begin_request();
    let item = news::get_news_item(&ctx, &slug).await?;
    Ok(Json(NewsItem::clone(&item)))
}

/// Handler for POST /news
pub async fn create_news_handler(
    State(state): State<AppState>,
    Json(req): Json<NewNewsRequest>,
) -> Result<(StatusCode, Json<NewsCreatedResponse>)> {
    let slug = req.slug.trim().to_string();
    let ctx = state.begin_request();
    let id = news::add_news(&ctx, req.into()).await?;
    Ok((StatusCode::CREATED, Json(NewsCreatedResponse { id, slug })))
}

// == Archive ==

/// Handler for GET /archive
pub async fn archive_handler(State(state): State<AppState>) -> Result<Json<ArchiveView>> {
    let ctx = state.begin_request();
    Ok(Json(news::archive_filter(&ctx, None, None).await?))
}

/// Handler for GET /archive/:year
pub async fn archive_year_handler(
    State(state): State<AppState>,
    Path(year): Path<String>,
) -> Result<Json<ArchiveView>> {
    let ctx = state.begin_request();
    Ok(Json(news::archive_filter(&ctx, Some(&year), None).await?))
}

/// Handler for GET /archive/:year/:month
pub async fn archive_month_handler(
    State(state): State<AppState>,
    Path((year, month)): Path<(String, String)>,
) -> Result<Json<ArchiveView>> {
    let ctx = state.begin_request();
    Ok(Json(
        news::archive_filter(&ctx, Some(&year), Some(&month)).await?,
    ))
}

// == Admin ==

/// Handler for POST /revalidate
///
/// On-demand invalidation for data changed outside this server.
pub async fn revalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<RevalidateRequest>,
) -> Result<Json<RevalidateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let invalidator = Invalidator::new(Arc::clone(&state.cache));
    let removed = invalidator.on_mutation_success(&req.scopes);
    info!(scopes = req.scopes.len(), removed, "Manual revalidation");

    Ok(Json(RevalidateResponse::new(&req.scopes, removed)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let config = state.cache.config();
    Json(StatsResponse::new(
        config.mode,
        config.revalidate.map(|window| window.as_secs()),
        state.cache.stats(),
        state.cache.active_cycles(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
