//! HTTP route definitions and handlers.
//!
//! This module organizes all HTTP endpoints into logical groups: users and
//! sessions, videos, comments, likes, tweets, playlists and health checks.
//! Everything is mounted under `/api/v1` and speaks the shared JSON
//! envelope.

mod comment_routes;
mod health_routes;
mod like_routes;
mod playlist_routes;
mod tweet_routes;
mod user_routes;
mod video_routes;

use axum::Router;

use crate::state::AppState;

/// Creates the application router with all configured routes.
///
/// Combines all route modules into a single router and attaches
/// the application state for access in handlers.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/users", user_routes::routes())
        .nest("/videos", video_routes::routes())
        .nest("/comments", comment_routes::routes())
        .nest("/likes", like_routes::routes())
        .nest("/tweets", tweet_routes::routes())
        .nest("/playlist", playlist_routes::routes())
        .nest("/healthcheck", health_routes::routes());

    Router::new().nest("/api/v1", api).with_state(state)
}
