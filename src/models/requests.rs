//! Request DTOs for the revalidate API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::cache::Scope;
use crate::data::{NewMeal, NewNewsItem};

/// Request body for POST /messages
#[derive(Debug, Clone, Deserialize)]
pub struct NewMessageRequest {
    pub text: String,
}

impl NewMessageRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.text.trim().is_empty() {
            return Some("Message cannot be empty".to_string());
        }
        if self.text.len() > 1000 {
            return Some("Message exceeds maximum length of 1000 characters".to_string());
        }
        None
    }
}

/// Request body for POST /news
#[derive(Debug, Clone, Deserialize)]
pub struct NewNewsRequest {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(default)]
    pub image: String,
}

impl From<NewNewsRequest> for NewNewsItem {
    fn from(req: NewNewsRequest) -> Self {
        NewNewsItem {
            slug: req.slug,
            title: req.title,
            content: req.content,
            date: req.date,
            image: req.image,
        }
    }
}

/// Request body for POST /meals
#[derive(Debug, Clone, Deserialize)]
pub struct NewMealRequest {
    pub title: String,
    /// Uploaded file name, e.g. `pie.png`
    #[serde(default)]
    pub image: String,
    pub summary: String,
    pub instructions: String,
    pub creator: String,
    pub creator_email: String,
}

impl From<NewMealRequest> for NewMeal {
    fn from(req: NewMealRequest) -> Self {
        NewMeal {
            title: req.title,
            image: req.image,
            summary: req.summary,
            instructions: req.instructions,
            creator: req.creator,
            creator_email: req.creator_email,
        }
    }
}

/// Request body for POST /revalidate
///
/// ```json
/// {"scopes": [{"kind": "exact", "tag": "messages"}, {"kind": "subtree", "tag": "archive"}]}
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RevalidateRequest {
    pub scopes: Vec<Scope>,
}

impl RevalidateRequest {
    pub fn validate(&self) -> Option<String> {
        if self.scopes.is_empty() {
            return Some("At least one scope is required".to_string());
        }
        None
    }
}

/// Query string for endpoints that read on behalf of a user (`?user=2`).
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct UserQuery {
    pub user: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Tag;

    #[test]
    fn test_new_message_validate() {
        let empty = NewMessageRequest {
            text: "  ".to_string(),
        };
        assert!(empty.validate().is_some());

        let ok = NewMessageRequest {
            text: "hi".to_string(),
        };
        assert!(ok.validate().is_none());
    }

    #[test]
    fn test_news_request_defaults() {
        let json = r#"{"slug": "s", "title": "T", "date": "2024-01-01"}"#;
        let req: NewNewsRequest = serde_json::from_str(json).unwrap();
        let item = NewNewsItem::from(req);
        assert_eq!(item.slug, "s");
        assert!(item.content.is_empty());
    }

    #[test]
    fn test_meal_request_image_is_optional() {
        let json = r#"{"title": "Soup", "summary": "Warm", "instructions": "Boil",
                       "creator": "Ana", "creator_email": "ana@example.com"}"#;
        let req: NewMealRequest = serde_json::from_str(json).unwrap();
        let meal = NewMeal::from(req);
        assert_eq!(meal.title, "Soup");
        assert!(meal.image.is_empty());
    }

    #[test]
    fn test_revalidate_request_deserialize() {
        let json = r#"{"scopes": [{"kind": "exact", "tag": "messages"}, {"kind": "subtree", "tag": "feed"}]}"#;
        let req: RevalidateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.scopes[0], Scope::Exact(Tag::new("messages")));
        assert_eq!(req.scopes[1], Scope::Subtree(Tag::new("feed")));
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_revalidate_request_requires_scope() {
        let req: RevalidateRequest = serde_json::from_str(r#"{"scopes": []}"#).unwrap();
        assert!(req.validate().is_some());
    }
}
