//! Request and Response models for the revalidate API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{
    NewMealRequest, NewMessageRequest, NewNewsRequest, RevalidateRequest, UserQuery,
};
pub use responses::{
    ErrorResponse, FeedResponse, HealthResponse, MealCreatedResponse, MealsResponse,
    MessageCreatedResponse, MessagesResponse, NewsCreatedResponse, NewsListResponse, RevalidateResponse, StatsResponse,
};
