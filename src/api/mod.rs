//! API Module
//!
//! HTTP handlers and routing for the revalidate server.
//!
//! # Endpoints
//! - `GET /messages`, `POST /messages` - Message board
//! - `GET /feed`, `POST /feed/:id/like` - Feed and like toggle
//! - `GET /news`, `GET /latest-news`, `GET /news/:slug`, `POST /news` - News
//! - `GET /archive[/:year[/:month]]` - News archive
//! - `POST /revalidate` - On-demand invalidation
//! - `GET /stats` - Read cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
