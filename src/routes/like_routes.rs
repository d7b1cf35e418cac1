//! Like toggle endpoint handlers.
//!
//! A toggle is two storage steps: flip the like record, then adjust the
//! denormalized counter. The unique like index is the real guard against
//! double-likes under concurrency; the handler treats a duplicate-key
//! rejection as "the like already exists" and does not touch the counter
//! again.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::CurrentUser;
use crate::models::{LikeRecord, LikeTarget, Page, User, VideoWithOwner};
use crate::state::AppState;
use crate::store::{CounterOp, StoreError};
use crate::utils::envelope::{ApiError, ApiResponse};
use crate::utils::params::{pagination, parse_object_id};

/// Registers like routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:id/video-like", post(toggle_video_like))
        .route("/:id/comment-like", post(toggle_comment_like))
        .route("/:id/tweet-like", post(toggle_tweet_like))
        .route("/liked-videos", get(liked_videos))
}

async fn toggle_video_like(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Value>, ApiError> {
    toggle(&state, &user, &id, LikeTarget::Video).await
}

async fn toggle_comment_like(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Value>, ApiError> {
    toggle(&state, &user, &id, LikeTarget::Comment).await
}

async fn toggle_tweet_like(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Value>, ApiError> {
    toggle(&state, &user, &id, LikeTarget::Tweet).await
}

async fn toggle(
    state: &AppState,
    user: &User,
    raw_id: &str,
    target: LikeTarget,
) -> Result<ApiResponse<Value>, ApiError> {
    let target_id = parse_object_id(raw_id, target.label())?;
    let actor = parse_object_id(&user.id, "user")?;

    if state.store.remove_like(target, &target_id, &actor).await? {
        // Clamped so a drifted counter never goes negative.
        let found = state
            .store
            .bump_like_counter(target, &target_id, CounterOp::DecrementClamped)
            .await?;
        if !found {
            // The like is already gone; only the counter target is missing.
            return Err(ApiError::not_found(format!("{} not found", target.label())));
        }
        return Ok(ApiResponse::ok(
            json!({ "liked": false }),
            format!("{} like removed", target.label()),
        ));
    }

    let like = LikeRecord::new(target, target_id, actor);
    match state.store.insert_like(&like).await {
        Ok(()) => {
            let found = state
                .store
                .bump_like_counter(target, &target_id, CounterOp::Increment)
                .await?;
            if !found {
                // The target vanished between insert and counter bump.
                state.store.remove_like(target, &target_id, &actor).await?;
                return Err(ApiError::not_found(format!("{} not found", target.label())));
            }
        }
        // A concurrent toggle created the like first and already bumped
        // the counter; the outcome the caller asked for holds.
        Err(StoreError::Duplicate) => {}
        Err(e) => return Err(e.into()),
    }

    Ok(ApiResponse::ok(
        json!({ "liked": true }),
        format!("{} like added", target.label()),
    ))
}

#[derive(Deserialize)]
struct ListQuery {
    page: Option<u64>,
    limit: Option<u64>,
}

async fn liked_videos(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Page<VideoWithOwner>>, ApiError> {
    let actor = parse_object_id(&user.id, "user")?;
    let (page, limit) = pagination(query.page, query.limit);

    let videos = state.store.list_liked_videos(&actor, page, limit).await?;
    Ok(ApiResponse::ok(videos, "liked videos fetched successfully"))
}
