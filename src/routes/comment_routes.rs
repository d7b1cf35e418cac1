//! Comment endpoint handlers.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::models::{
    Comment, CommentRecord, CommentWithOwner, LikeTarget, OwnerSummary, Page,
};
use crate::state::AppState;
use crate::utils::envelope::{ApiError, ApiResponse};
use crate::utils::params::{pagination, parse_object_id};

/// Registers comment routes. `GET /:id` lists a video's comments;
/// `PATCH`/`DELETE /:id` operate on a comment.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:id/add-comment", post(add_comment))
        .route(
            "/:id",
            get(list_comments).patch(update_comment).delete(delete_comment),
        )
}

#[derive(Deserialize)]
struct CommentBody {
    content: Option<String>,
}

async fn add_comment(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Json(body): Json<CommentBody>,
) -> Result<ApiResponse<CommentWithOwner>, ApiError> {
    let content = body
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("content is required"))?;

    let video = parse_object_id(&video_id, "video")?;
    if !state.store.video_exists(&video).await? {
        return Err(ApiError::not_found("video not found"));
    }

    let owner = parse_object_id(&user.id, "user")?;
    let record = CommentRecord::new(content.trim().to_string(), video, owner);
    state.store.create_comment(&record).await?;

    let comment = CommentWithOwner {
        id: record.id.to_hex(),
        content: record.content.clone(),
        video: record.video.to_hex(),
        likes: record.likes,
        owner: OwnerSummary::from(&user),
        created_at: chrono::Utc::now(),
    };
    Ok(ApiResponse::created(comment, "comment added successfully"))
}

#[derive(Deserialize)]
struct ListQuery {
    page: Option<u64>,
    limit: Option<u64>,
}

async fn list_comments(
    _current: CurrentUser,
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Page<CommentWithOwner>>, ApiError> {
    let video = parse_object_id(&video_id, "video")?;
    let (page, limit) = pagination(query.page, query.limit);

    let comments = state.store.list_comments(&video, page, limit).await?;
    Ok(ApiResponse::ok(comments, "comments fetched successfully"))
}

async fn update_comment(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
    Json(body): Json<CommentBody>,
) -> Result<ApiResponse<Comment>, ApiError> {
    let content = body
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("content is required"))?;

    let id = parse_object_id(&comment_id, "comment")?;
    let owner = parse_object_id(&user.id, "user")?;

    let comment = state
        .store
        .update_comment(&id, &owner, content.trim())
        .await?
        .ok_or_else(|| ApiError::not_found("comment not found"))?;

    Ok(ApiResponse::ok(
        Comment::from(comment),
        "comment updated successfully",
    ))
}

async fn delete_comment(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let id = parse_object_id(&comment_id, "comment")?;
    let owner = parse_object_id(&user.id, "user")?;

    state
        .store
        .delete_comment(&id, &owner)
        .await?
        .ok_or_else(|| ApiError::not_found("comment not found"))?;

    // Likes on the comment go with it.
    state
        .store
        .delete_likes_for_target(LikeTarget::Comment, &id)
        .await?;

    Ok(ApiResponse::ok(
        serde_json::json!({}),
        "comment deleted successfully",
    ))
}
