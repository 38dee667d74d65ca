//! Data Module
//!
//! Cached reads and invalidating writes for messages, meals, the feed and news.

pub mod meals;
pub mod messages;
pub mod news;
pub mod posts;

pub use meals::{Meal, NewMeal};
pub use messages::Message;
pub use news::{ArchiveView, NewNewsItem, NewsItem};
pub use posts::Post;
