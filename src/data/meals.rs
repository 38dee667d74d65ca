//! Meals
//!
//! Tag layout: `meals` for the listing, `meals/<slug>` for a single meal.
//! Sharing a meal invalidates the whole subtree.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::cache::{QueryKey, Scope, Tag};
use crate::context::RequestContext;
use crate::error::{CacheError, Result};
use crate::store::decode_rows;

pub const MEALS_TAG: &str = "meals";

const DEFAULT_IMAGE_EXTENSION: &str = "jpg";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub image: String,
    pub summary: String,
    pub instructions: String,
    pub creator: String,
    pub creator_email: String,
}

/// A meal shared by a user. The slug and stored image path are derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMeal {
    pub title: String,
    /// Name of the uploaded image file; only its extension is kept
    pub image: String,
    pub summary: String,
    /// Untrusted HTML, sanitized before it is stored
    pub instructions: String,
    pub creator: String,
    pub creator_email: String,
}

// == Reads ==

pub async fn get_meals(ctx: &RequestContext) -> Result<Arc<Vec<Meal>>> {
    ctx.read(
        QueryKey::new("all-meals"),
        &[Tag::new(MEALS_TAG)],
        |store| async move {
            let rows = store
                .query("SELECT * FROM meals ORDER BY id", Vec::new())
                .await?;
            decode_rows(rows)
        },
    )
    .await
}

pub async fn get_meal(ctx: &RequestContext, slug: &str) -> Result<Arc<Meal>> {
    let slug = slug.to_string();
    ctx.read(
        QueryKey::new("meal").arg(&slug),
        &[Tag::new(MEALS_TAG).child(&slug)],
        |store| async move {
            let rows = store
                .query("SELECT * FROM meals WHERE slug = ?1", vec![json!(slug)])
                .await?;
            decode_rows::<Meal>(rows)?
                .into_iter()
                .next()
                .ok_or_else(|| CacheError::NotFound(format!("meal '{slug}'")))
        },
    )
    .await
}

// == Share ==

/// Stores a meal and invalidates every meal read. Returns the generated slug.
///
/// A title that slugifies to an existing slug is rejected by the store's
/// unique constraint and surfaces as `MutationFailed`.
pub async fn save_meal(ctx: &RequestContext, meal: NewMeal) -> Result<String> {
    validate(&meal)?;

    let slug = slug::slugify(&meal.title);
    if slug.is_empty() {
        return Err(CacheError::InvalidRequest(format!(
            "Title '{}' has no characters usable in a slug",
            meal.title
        )));
    }
    let instructions = ammonia::clean(&meal.instructions);
    let image = format!("/images/{}.{}", slug, image_extension(&meal.image));
    debug!(slug = %slug, image = %image, "Saving meal");

    ctx.mutate(
        "INSERT INTO meals (slug, title, image, summary, instructions, creator, creator_email)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        vec![
            json!(slug),
            json!(meal.title.trim()),
            json!(image),
            json!(meal.summary),
            json!(instructions),
            json!(meal.creator),
            json!(meal.creator_email),
        ],
        &[Scope::subtree(MEALS_TAG)],
    )
    .await?;

    Ok(slug)
}

fn validate(meal: &NewMeal) -> Result<()> {
    let required = [
        ("title", &meal.title),
        ("summary", &meal.summary),
        ("instructions", &meal.instructions),
        ("creator", &meal.creator),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(CacheError::InvalidRequest(format!("Meal {field} is required")));
    }
    if !meal.creator_email.contains('@') {
        return Err(CacheError::InvalidRequest(format!(
            "Invalid email '{}'",
            meal.creator_email
        )));
    }
    Ok(())
}

fn image_extension(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => ext,
        _ => DEFAULT_IMAGE_EXTENSION,
    }
}
