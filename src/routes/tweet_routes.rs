//! Tweet endpoint handlers.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::models::{LikeTarget, Tweet, TweetRecord, TweetWithOwner};
use crate::state::AppState;
use crate::utils::envelope::{ApiError, ApiResponse};
use crate::utils::params::parse_object_id;

/// Registers tweet routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_tweet))
        .route("/user-tweets", get(user_tweets))
        .route("/:tweetId", axum::routing::patch(update_tweet).delete(delete_tweet))
}

#[derive(Deserialize)]
struct TweetBody {
    content: Option<String>,
}

async fn create_tweet(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(body): Json<TweetBody>,
) -> Result<ApiResponse<Tweet>, ApiError> {
    let content = body
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("content is required"))?;

    let owner = parse_object_id(&user.id, "user")?;
    let record = TweetRecord::new(content.trim().to_string(), owner);
    state.store.create_tweet(&record).await?;

    Ok(ApiResponse::created(
        Tweet::from(record),
        "tweet created successfully",
    ))
}

async fn user_tweets(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<TweetWithOwner>>, ApiError> {
    let owner = parse_object_id(&user.id, "user")?;
    let tweets = state.store.list_user_tweets(&owner).await?;
    Ok(ApiResponse::ok(tweets, "tweets fetched successfully"))
}

async fn update_tweet(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(tweet_id): Path<String>,
    Json(body): Json<TweetBody>,
) -> Result<ApiResponse<Tweet>, ApiError> {
    let content = body
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("content is required"))?;

    let id = parse_object_id(&tweet_id, "tweet")?;
    let owner = parse_object_id(&user.id, "user")?;

    let tweet = state
        .store
        .update_tweet(&id, &owner, content.trim())
        .await?
        .ok_or_else(|| ApiError::not_found("tweet not found"))?;

    Ok(ApiResponse::ok(
        Tweet::from(tweet),
        "tweet updated successfully",
    ))
}

async fn delete_tweet(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(tweet_id): Path<String>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let id = parse_object_id(&tweet_id, "tweet")?;
    let owner = parse_object_id(&user.id, "user")?;

    state
        .store
        .delete_tweet(&id, &owner)
        .await?
        .ok_or_else(|| ApiError::not_found("tweet not found"))?;

    state
        .store
        .delete_likes_for_target(LikeTarget::Tweet, &id)
        .await?;

    Ok(ApiResponse::ok(
        serde_json::json!({}),
        "tweet deleted successfully",
    ))
}
