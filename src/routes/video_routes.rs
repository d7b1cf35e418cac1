//! Video endpoint handlers.

use std::path::{Path as FsPath, PathBuf};

use axum::extract::{Multipart, Path, Query, State};
use axum::routing::{get, patch, post};
use axum::Router;
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::CurrentUser;
use crate::models::{LikeTarget, Page, Video, VideoRecord, VideoWithOwner};
use crate::state::AppState;
use crate::store::{VideoListing, VideoSort, VideoUpdate};
use crate::utils::envelope::{ApiError, ApiResponse};
use crate::utils::params::{pagination, parse_object_id};
use crate::utils::uploads::spool_field;

/// Registers video routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/publish", post(publish_video))
        .route("/user", get(list_user_videos))
        .route("/:videoId", get(get_video).patch(update_video).delete(delete_video))
        .route("/:videoId/toggle-publish", patch(toggle_publish))
}

async fn publish_video(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<ApiResponse<Video>, ApiError> {
    let mut title = None;
    let mut description = None;
    let mut video_path: Option<PathBuf> = None;
    let mut thumbnail_path: Option<PathBuf> = None;

    let temp_dir = state.config.media.temp_dir.clone();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("title") => title = Some(read_text(field).await?),
            Some("description") => description = Some(read_text(field).await?),
            Some("videoFile") | Some("video") => {
                video_path = Some(spool_field(field, FsPath::new(&temp_dir)).await?)
            }
            Some("thumbnail") => {
                thumbnail_path = Some(spool_field(field, FsPath::new(&temp_dir)).await?)
            }
            _ => {}
        }
    }

    let title = title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("title is required"))?;
    let description = description
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("description is required"))?;
    let video_path =
        video_path.ok_or_else(|| ApiError::bad_request("video file is required"))?;
    let thumbnail_path =
        thumbnail_path.ok_or_else(|| ApiError::bad_request("thumbnail file is required"))?;

    let video_asset = match state.media.upload(&video_path).await {
        Ok(asset) => asset,
        Err(e) => {
            tracing::error!("video upload failed: {}", e);
            if let Err(e) = tokio::fs::remove_file(&thumbnail_path).await {
                warn!("failed to remove spooled upload: {}", e);
            }
            return Err(ApiError::internal("failed to upload video"));
        }
    };
    let thumbnail_asset = state.media.upload(&thumbnail_path).await.map_err(|e| {
        tracing::error!("thumbnail upload failed: {}", e);
        ApiError::internal("failed to upload thumbnail")
    })?;

    let owner = parse_object_id(&user.id, "user")?;
    let record = VideoRecord::new(
        title.trim().to_string(),
        description.trim().to_string(),
        video_asset.url.clone(),
        thumbnail_asset.url.clone(),
        video_asset.duration.unwrap_or(0.0),
        owner,
    );
    state.store.create_video(&record).await?;

    info!("published video {} by {}", record.id, user.username);
    Ok(ApiResponse::created(
        Video::from(record),
        "video published successfully",
    ))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart field: {}", e)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoListQuery {
    user_id: Option<String>,
    query: Option<String>,
    sort_by: Option<String>,
    sort_type: Option<String>,
    page: Option<u64>,
    limit: Option<u64>,
}

fn parse_sort(raw: Option<&str>) -> VideoSort {
    match raw {
        Some("title") => VideoSort::Title,
        Some("duration") => VideoSort::Duration,
        Some("views") => VideoSort::Views,
        // Anything else, including client-invented field names, falls back
        // to newest first rather than reaching the store.
        _ => VideoSort::CreatedAt,
    }
}

async fn list_user_videos(
    _current: CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<VideoListQuery>,
) -> Result<ApiResponse<Page<VideoWithOwner>>, ApiError> {
    let owner_raw = query
        .user_id
        .ok_or_else(|| ApiError::bad_request("userId is required"))?;
    let owner = parse_object_id(&owner_raw, "user")?;
    let (page, limit) = pagination(query.page, query.limit);

    let listing = VideoListing {
        owner,
        query: query.query.filter(|q| !q.trim().is_empty()),
        sort_by: parse_sort(query.sort_by.as_deref()),
        descending: query.sort_type.as_deref() != Some("asc"),
        page,
        limit,
    };

    let videos = state.store.list_videos(&listing).await?;
    Ok(ApiResponse::ok(videos, "videos fetched successfully"))
}

async fn get_video(
    _current: CurrentUser,
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<Video>, ApiError> {
    let id = parse_object_id(&video_id, "video")?;
    let video = state
        .store
        .find_video(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("video not found"))?;
    Ok(ApiResponse::ok(Video::from(video), "video fetched successfully"))
}

async fn update_video(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    mut multipart: Multipart,
) -> Result<ApiResponse<Video>, ApiError> {
    let id = parse_object_id(&video_id, "video")?;
    let owner = parse_object_id(&user.id, "user")?;

    let mut update = VideoUpdate::default();
    let mut thumbnail_path: Option<PathBuf> = None;

    let temp_dir = state.config.media.temp_dir.clone();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("title") => update.title = Some(read_text(field).await?),
            Some("description") => update.description = Some(read_text(field).await?),
            Some("thumbnail") => {
                thumbnail_path = Some(spool_field(field, FsPath::new(&temp_dir)).await?)
            }
            _ => {}
        }
    }

    // The previous thumbnail URL is needed for cleanup once it is replaced.
    let old_thumbnail = match &thumbnail_path {
        Some(path) => {
            let existing = state
                .store
                .find_video(&id)
                .await?
                .ok_or_else(|| ApiError::not_found("video not found"))?;
            let asset = state.media.upload(path).await.map_err(|e| {
                tracing::error!("thumbnail upload failed: {}", e);
                ApiError::internal("failed to upload thumbnail")
            })?;
            update.thumbnail = Some(asset.url);
            Some(existing.thumbnail)
        }
        None => None,
    };

    if update.is_empty() {
        return Err(ApiError::bad_request("nothing to update"));
    }

    let video = state
        .store
        .update_video(&id, &owner, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("video not found"))?;

    if let Some(old) = old_thumbnail {
        if let Err(e) = state.media.delete(&old).await {
            warn!("failed to delete replaced thumbnail {}: {}", old, e);
        }
    }

    Ok(ApiResponse::ok(Video::from(video), "video updated successfully"))
}

async fn delete_video(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let id = parse_object_id(&video_id, "video")?;
    let owner = parse_object_id(&user.id, "user")?;

    let video = state
        .store
        .delete_video(&id, &owner)
        .await?
        .ok_or_else(|| ApiError::not_found("video not found"))?;

    // Dependent records go with the video. Media removal is best effort;
    // an unreachable media host must not resurrect the video.
    state.store.delete_likes_for_target(LikeTarget::Video, &id).await?;
    state.store.delete_comments_for_video(&id).await?;
    state.store.pull_video_from_playlists(&id).await?;

    for asset in [&video.video_file, &video.thumbnail] {
        if let Err(e) = state.media.delete(asset).await {
            warn!("failed to delete media asset {}: {}", asset, e);
        }
    }

    info!("deleted video {} by {}", id, user.username);
    Ok(ApiResponse::ok(
        serde_json::json!({}),
        "video deleted successfully",
    ))
}

async fn toggle_publish(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<Video>, ApiError> {
    let id = parse_object_id(&video_id, "video")?;
    let owner = parse_object_id(&user.id, "user")?;

    let video = state
        .store
        .toggle_publish(&id, &owner)
        .await?
        .ok_or_else(|| ApiError::not_found("video not found"))?;

    Ok(ApiResponse::ok(
        Video::from(video),
        "publish status toggled successfully",
    ))
}
