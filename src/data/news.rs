//! News and archive
//!
//! Tag layout:
//! - `news` and `news/<slug>` for listings and single items
//! - `archive`, `archive/<year>` and `archive/<year>/<month>` for the archive
//!
//! Publishing invalidates both subtrees.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::cache::{QueryKey, Scope, Tag};
use crate::context::RequestContext;
use crate::error::{CacheError, Result};
use crate::store::decode_rows;

pub const NEWS_TAG: &str = "news";
pub const ARCHIVE_TAG: &str = "archive";

const LATEST_COUNT: i64 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub date: String,
    pub image: String,
}

/// A news item to publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNewsItem {
    pub slug: String,
    pub title: String,
    pub content: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub image: String,
}

/// Navigation links plus the news matching an archive filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveView {
    pub year: Option<String>,
    pub month: Option<String>,
    pub links: Vec<String>,
    pub news: Vec<NewsItem>,
}

fn archive_year_tag(year: &str) -> Tag {
    Tag::new(ARCHIVE_TAG).child(year)
}

async fn load_news(
    ctx: &RequestContext,
    key: QueryKey,
    tag: Tag,
    statement: &'static str,
    params: Vec<Value>,
) -> Result<Arc<Vec<NewsItem>>> {
    ctx.read(key, &[tag], move |store| async move {
        let rows = store.query(statement, params).await?;
        decode_rows(rows)
    })
    .await
}

// == Listings ==

pub async fn get_all_news(ctx: &RequestContext) -> Result<Arc<Vec<NewsItem>>> {
    load_news(
        ctx,
        QueryKey::new("all-news"),
        Tag::new(NEWS_TAG),
        "SELECT * FROM news ORDER BY date DESC",
        Vec::new(),
    )
    .await
}

/// The three most recent items.
pub async fn get_latest_news(ctx: &RequestContext) -> Result<Arc<Vec<NewsItem>>> {
    load_news(
        ctx,
        QueryKey::new("latest-news"),
        Tag::new(NEWS_TAG),
        "SELECT * FROM news ORDER BY date DESC LIMIT ?1",
        vec![json!(LATEST_COUNT)],
    )
    .await
}

pub async fn get_news_item(ctx: &RequestContext, slug: &str) -> Result<Arc<NewsItem>> {
    let slug = slug.to_string();
    ctx.read(
        QueryKey::new("news-item").arg(&slug),
        &[Tag::new(NEWS_TAG).child(&slug)],
        |store| async move {
            let rows = store
                .query("SELECT * FROM news WHERE slug = ?1", vec![json!(slug)])
                .await?;
            decode_rows::<NewsItem>(rows)?
                .into_iter()
                .next()
                .ok_or_else(|| CacheError::NotFound(format!("news item '{slug}'")))
        },
    )
    .await
}

// == Archive ==

/// Years that have news, newest first.
pub async fn get_available_years(ctx: &RequestContext) -> Result<Arc<Vec<String>>> {
    ctx.read(
        QueryKey::new("news-years"),
        &[Tag::new(ARCHIVE_TAG)],
        |store| async move {
            let rows = store
                .query(
                    "SELECT DISTINCT strftime('%Y', date) AS year FROM news ORDER BY year DESC",
                    Vec::new(),
                )
                .await?;
            Ok(column_strings(rows, "year"))
        },
    )
    .await
}

/// Two-digit months of `year` that have news, newest first.
pub async fn get_available_months(ctx: &RequestContext, year: &str) -> Result<Arc<Vec<String>>> {
    let year = year.to_string();
    ctx.read(
        QueryKey::new("news-months").arg(&year),
        &[archive_year_tag(&year)],
        |store| async move {
            let rows = store
                .query(
                    "SELECT DISTINCT strftime('%m', date) AS month FROM news
                     WHERE strftime('%Y', date) = ?1 ORDER BY month DESC",
                    vec![json!(year)],
                )
                .await?;
            Ok(column_strings(rows, "month"))
        },
    )
    .await
}

pub async fn get_news_for_year(ctx: &RequestContext, year: &str) -> Result<Arc<Vec<NewsItem>>> {
    load_news(
        ctx,
        QueryKey::new("news-for-year").arg(year),
        archive_year_tag(year),
        "SELECT * FROM news WHERE strftime('%Y', date) = ?1 ORDER BY date DESC",
        vec![json!(year)],
    )
    .await
}

pub async fn get_news_for_year_and_month(
    ctx: &RequestContext,
    year: &str,
    month: &str,
) -> Result<Arc<Vec<NewsItem>>> {
    load_news(
        ctx,
        QueryKey::new("news-for-month").arg(year).arg(month),
        archive_year_tag(year).child(month),
        "SELECT * FROM news WHERE strftime('%Y', date) = ?1 AND strftime('%m', date) = ?2
         ORDER BY date DESC",
        vec![json!(year), json!(month)],
    )
    .await
}

/// Resolves an archive filter.
///
/// No year lists the available years; a year lists its months; a year and
/// month lists nothing further. Years or months without news are rejected.
pub async fn archive_filter(
    ctx: &RequestContext,
    year: Option<&str>,
    month: Option<&str>,
) -> Result<ArchiveView> {
    let years = get_available_years(ctx).await?;

    let Some(year) = year else {
        if month.is_some() {
            return Err(CacheError::InvalidRequest(
                "Invalid filter: month given without a year".to_string(),
            ));
        }
        return Ok(ArchiveView {
            year: None,
            month: None,
            links: years.to_vec(),
            news: Vec::new(),
        });
    };

    if !years.iter().any(|y| y == year) {
        return Err(invalid_filter(year, month));
    }
    let months = get_available_months(ctx, year).await?;

    match month {
        None => {
            let news = get_news_for_year(ctx, year).await?;
            Ok(ArchiveView {
                year: Some(year.to_string()),
                month: None,
                links: months.to_vec(),
                news: news.to_vec(),
            })
        }
        Some(raw) => {
            let month = normalize_month(raw).ok_or_else(|| invalid_filter(year, Some(raw)))?;
            if !months.contains(&month) {
                return Err(invalid_filter(year, Some(raw)));
            }
            let news = get_news_for_year_and_month(ctx, year, &month).await?;
            Ok(ArchiveView {
                year: Some(year.to_string()),
                month: Some(month),
                links: Vec::new(),
                news: news.to_vec(),
            })
        }
    }
}

// == Publish ==

/// Publishes an item and invalidates every news and archive read.
pub async fn add_news(ctx: &RequestContext, item: NewNewsItem) -> Result<i64> {
    if item.slug.trim().is_empty() || item.title.trim().is_empty() {
        return Err(CacheError::InvalidRequest(
            "News item needs a slug and a title".to_string(),
        ));
    }
    NaiveDate::parse_from_str(&item.date, "%Y-%m-%d").map_err(|e| {
        CacheError::InvalidRequest(format!("Invalid date '{}': {}", item.date, e))
    })?;

    let outcome = ctx
        .mutate(
            "INSERT INTO news (slug, title, content, date, image) VALUES (?1, ?2, ?3, ?4, ?5)",
            vec![
                json!(item.slug.trim()),
                json!(item.title),
                json!(item.content),
                json!(item.date),
                json!(item.image),
            ],
            &[Scope::subtree(NEWS_TAG), Scope::subtree(ARCHIVE_TAG)],
        )
        .await?;

    outcome
        .inserted_id
        .ok_or_else(|| CacheError::Internal("insert returned no row id".to_string()))
}

fn column_strings(rows: Vec<crate::store::Row>, column: &str) -> Vec<String> {
    rows.into_iter()
        .filter_map(|mut row| match row.remove(column) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        })
        .collect()
}

fn normalize_month(raw: &str) -> Option<String> {
    match raw.parse::<u32>() {
        Ok(m) if (1..=12).contains(&m) => Some(format!("{m:02}")),
        _ => None,
    }
}

fn invalid_filter(year: &str, month: Option<&str>) -> CacheError {
    CacheError::InvalidRequest(format!(
        "Invalid filter: Year {} or Month {} does not exist.",
        year,
        month.unwrap_or("-")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ReadCache;
    use crate::store::{SqliteStore, StoreAccessor};

    async fn context() -> (Arc<ReadCache>, RequestContext) {
        let store: Arc<dyn StoreAccessor> = Arc::new(SqliteStore::open_in_memory(true).await.unwrap());
        let cache = Arc::new(ReadCache::default());
        let ctx = RequestContext::begin(&cache, store);
        (cache, ctx)
    }

    fn item(slug: &str, date: &str) -> NewNewsItem {
        NewNewsItem {
            slug: slug.to_string(),
            title: "Title".to_string(),
            content: "Body".to_string(),
            date: date.to_string(),
            image: "img.jpg".to_string(),
        }
    }

    #[tokio::test]
    async fn test_latest_news_is_three_newest() {
        let (_cache, ctx) = context().await;
        let latest = get_latest_news(&ctx).await.unwrap();
        let dates: Vec<&str> = latest.iter().map(|n| n.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-03-01", "2024-01-01", "2022-07-01"]);
    }

    #[tokio::test]
    async fn test_news_item_lookup() {
        let (_cache, ctx) = context().await;
        let hiking = get_news_item(&ctx, "hiking").await.unwrap();
        assert_eq!(hiking.title, "Hiking is the best!");

        let missing = get_news_item(&ctx, "nope").await;
        assert!(matches!(missing, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_archive_navigation() {
        let (_cache, ctx) = context().await;

        let root = archive_filter(&ctx, None, None).await.unwrap();
        assert_eq!(root.links, vec!["2024", "2022", "2021"]);
        assert!(root.news.is_empty());

        let year = archive_filter(&ctx, Some("2022"), None).await.unwrap();
        assert_eq!(year.links, vec!["07", "05"]);
        assert_eq!(year.news.len(), 2);

        let month = archive_filter(&ctx, Some("2022"), Some("5")).await.unwrap();
        assert_eq!(month.month.as_deref(), Some("05"));
        assert!(month.links.is_empty());
        assert_eq!(month.news.len(), 1);
        assert_eq!(month.news[0].slug, "beaver-plague");
    }

    #[tokio::test]
    async fn test_archive_rejects_unknown_filter() {
        let (_cache, ctx) = context().await;

        for (year, month) in [
            (Some("1999"), None),
            (Some("2022"), Some("01")),
            (Some("2022"), Some("13")),
            (Some("2022"), Some("may")),
            (None, Some("05")),
        ] {
            let result = archive_filter(&ctx, year, month).await;
            assert!(
                matches!(result, Err(CacheError::InvalidRequest(_))),
                "{:?}/{:?} should be rejected",
                year,
                month
            );
        }
    }

    #[tokio::test]
    async fn test_add_news_invalidates_news_and_archive() {
        let (cache, ctx) = context().await;
        get_all_news(&ctx).await.unwrap();
        get_news_item(&ctx, "hiking").await.unwrap();
        archive_filter(&ctx, Some("2024"), Some("03")).await.unwrap();
        let cached = cache.len();

        add_news(&ctx, item("fresh", "2025-02-10")).await.unwrap();

        assert_eq!(cache.stats().invalidated as usize, cached);
        assert!(cache.is_empty());

        assert_eq!(get_all_news(&ctx).await.unwrap().len(), 6);
        let root = archive_filter(&ctx, None, None).await.unwrap();
        assert_eq!(root.links[0], "2025");
    }

    #[tokio::test]
    async fn test_add_news_validation() {
        let (cache, ctx) = context().await;

        let bad_date = add_news(&ctx, item("x", "10/02/2025")).await;
        assert!(matches!(bad_date, Err(CacheError::InvalidRequest(_))));

        let duplicate = add_news(&ctx, item("hiking", "2025-02-10")).await;
        assert!(matches!(duplicate, Err(CacheError::MutationFailed(_))));
        assert_eq!(cache.stats().invalidated, 0);
    }
}
