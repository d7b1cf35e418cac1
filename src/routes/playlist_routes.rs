//! Playlist endpoint handlers.

use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::models::{Playlist, PlaylistRecord};
use crate::state::AppState;
use crate::utils::envelope::{ApiError, ApiResponse};
use crate::utils::params::parse_object_id;

/// Registers playlist routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_playlist))
        .route("/playlist", get(user_playlists))
        .route("/:playlistId/playlist", get(get_playlist))
        .route("/:playlistId/video-add/:videoId", post(add_video))
        .route("/:playlistId/video-del/:videoId", delete(remove_video))
}

#[derive(Deserialize)]
struct CreatePlaylistRequest {
    name: Option<String>,
    description: Option<String>,
}

async fn create_playlist(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(body): Json<CreatePlaylistRequest>,
) -> Result<ApiResponse<Playlist>, ApiError> {
    let name = body
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("name is required"))?;
    let description = body
        .description
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("description is required"))?;

    let owner = parse_object_id(&user.id, "user")?;
    let record = PlaylistRecord::new(name.trim().to_string(), description.trim().to_string(), owner);
    state.store.create_playlist(&record).await?;

    Ok(ApiResponse::created(
        Playlist::from(record),
        "playlist created successfully",
    ))
}

async fn user_playlists(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<Playlist>>, ApiError> {
    let owner = parse_object_id(&user.id, "user")?;
    let playlists = state.store.list_user_playlists(&owner).await?;
    Ok(ApiResponse::ok(
        playlists.into_iter().map(Playlist::from).collect(),
        "playlists fetched successfully",
    ))
}

async fn get_playlist(
    _current: CurrentUser,
    State(state): State<AppState>,
    Path(playlist_id): Path<String>,
) -> Result<ApiResponse<Playlist>, ApiError> {
    let id = parse_object_id(&playlist_id, "playlist")?;
    let playlist = state
        .store
        .find_playlist(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("playlist not found"))?;
    Ok(ApiResponse::ok(
        Playlist::from(playlist),
        "playlist fetched successfully",
    ))
}

async fn add_video(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path((playlist_id, video_id)): Path<(String, String)>,
) -> Result<ApiResponse<Playlist>, ApiError> {
    let playlist = parse_object_id(&playlist_id, "playlist")?;
    let video = parse_object_id(&video_id, "video")?;
    let owner = parse_object_id(&user.id, "user")?;

    if !state.store.video_exists(&video).await? {
        return Err(ApiError::not_found("video not found"));
    }

    let updated = state
        .store
        .add_video_to_playlist(&playlist, &owner, &video)
        .await?
        .ok_or_else(|| ApiError::not_found("playlist not found"))?;

    Ok(ApiResponse::ok(
        Playlist::from(updated),
        "video added to playlist",
    ))
}

async fn remove_video(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path((playlist_id, video_id)): Path<(String, String)>,
) -> Result<ApiResponse<Playlist>, ApiError> {
    let playlist = parse_object_id(&playlist_id, "playlist")?;
    let video = parse_object_id(&video_id, "video")?;
    let owner = parse_object_id(&user.id, "user")?;

    let updated = state
        .store
        .remove_video_from_playlist(&playlist, &owner, &video)
        .await?
        .ok_or_else(|| ApiError::not_found("playlist not found"))?;

    Ok(ApiResponse::ok(
        Playlist::from(updated),
        "video removed from playlist",
    ))
}
