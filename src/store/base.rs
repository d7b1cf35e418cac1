use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use super::memory_store::MemoryStore;
use super::mongodb_store::{MongoDbConfig, MongoDbStore};
use crate::models::{
    CommentRecord, CommentWithOwner, LikeRecord, LikeTarget, Page, PlaylistRecord, TweetRecord,
    TweetWithOwner, User, UserRecord, VideoRecord, VideoWithOwner,
};

/// Failures surfaced by a store backend. `Duplicate` is the
/// unique-constraint signal the toggle and registration paths key off.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("a document with the same unique key already exists")]
    Duplicate,
    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Which user image field an update targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageField {
    Avatar,
    CoverImage,
}

impl ImageField {
    pub fn field(&self) -> &'static str {
        match self {
            ImageField::Avatar => "avatar",
            ImageField::CoverImage => "coverImage",
        }
    }
}

/// Counter adjustments for a like target. Decrements clamp at zero so
/// counter/record drift can never drive the counter negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CounterOp {
    Increment,
    DecrementClamped,
}

/// Sort keys accepted by the video listing (a whitelist, never a raw
/// client-supplied field name).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VideoSort {
    CreatedAt,
    Title,
    Duration,
    Views,
}

impl VideoSort {
    pub fn field(&self) -> &'static str {
        match self {
            VideoSort::CreatedAt => "createdAt",
            VideoSort::Title => "title",
            VideoSort::Duration => "duration",
            VideoSort::Views => "views",
        }
    }
}

/// Parameters of a paginated video listing.
#[derive(Debug)]
pub struct VideoListing {
    pub owner: ObjectId,
    /// Case-insensitive text match against title or description.
    pub query: Option<String>,
    pub sort_by: VideoSort,
    pub descending: bool,
    pub page: u64,
    pub limit: u64,
}

/// Partial update of a video's editable fields.
#[derive(Debug, Default)]
pub struct VideoUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
}

impl VideoUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.thumbnail.is_none()
    }
}

/// The Store trait abstracts document persistence for every collection.
///
/// Owner-scoped mutations take the owner id and return `None` when no
/// document matched, without distinguishing "absent" from "not yours";
/// handlers map that to 404.
#[async_trait]
pub trait Store: Send + Sync {
    // -- users

    /// Inserts a new user; `Duplicate` if the handle or email is taken.
    async fn create_user(&self, user: &UserRecord) -> StoreResult<()>;
    async fn find_user_by_id(&self, id: &ObjectId) -> StoreResult<Option<UserRecord>>;
    /// Lookup by handle (case-normalized) or email.
    async fn find_user_by_login(&self, identifier: &str) -> StoreResult<Option<UserRecord>>;
    /// Loads a user through a projection that excludes credential material.
    async fn find_user_public(&self, id: &ObjectId) -> StoreResult<Option<User>>;
    /// Overwrites (or clears, with `None`) the stored refresh token.
    async fn set_refresh_token(&self, id: &ObjectId, token: Option<&str>) -> StoreResult<bool>;
    /// Atomic compare-and-swap of the stored refresh token. Returns false
    /// if the presented value no longer matches (rotation must not happen).
    async fn rotate_refresh_token(
        &self,
        id: &ObjectId,
        presented: &str,
        next: &str,
    ) -> StoreResult<bool>;
    async fn update_account(
        &self,
        id: &ObjectId,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Option<User>>;
    async fn update_password(&self, id: &ObjectId, password_hash: &str) -> StoreResult<bool>;
    async fn update_user_image(
        &self,
        id: &ObjectId,
        field: ImageField,
        url: &str,
    ) -> StoreResult<Option<User>>;

    // -- videos

    async fn create_video(&self, video: &VideoRecord) -> StoreResult<()>;
    async fn find_video(&self, id: &ObjectId) -> StoreResult<Option<VideoRecord>>;
    async fn video_exists(&self, id: &ObjectId) -> StoreResult<bool>;
    async fn list_videos(&self, listing: &VideoListing) -> StoreResult<Page<VideoWithOwner>>;
    async fn update_video(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
        update: &VideoUpdate,
    ) -> StoreResult<Option<VideoRecord>>;
    async fn delete_video(&self, id: &ObjectId, owner: &ObjectId)
        -> StoreResult<Option<VideoRecord>>;
    /// Flips `isPublished` in a single server-side update.
    async fn toggle_publish(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
    ) -> StoreResult<Option<VideoRecord>>;
    async fn pull_video_from_playlists(&self, video: &ObjectId) -> StoreResult<()>;

    // -- comments

    async fn create_comment(&self, comment: &CommentRecord) -> StoreResult<()>;
    async fn update_comment(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
        content: &str,
    ) -> StoreResult<Option<CommentRecord>>;
    async fn delete_comment(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
    ) -> StoreResult<Option<CommentRecord>>;
    async fn list_comments(
        &self,
        video: &ObjectId,
        page: u64,
        limit: u64,
    ) -> StoreResult<Page<CommentWithOwner>>;
    async fn delete_comments_for_video(&self, video: &ObjectId) -> StoreResult<()>;

    // -- tweets

    async fn create_tweet(&self, tweet: &TweetRecord) -> StoreResult<()>;
    async fn list_user_tweets(&self, owner: &ObjectId) -> StoreResult<Vec<TweetWithOwner>>;
    async fn update_tweet(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
        content: &str,
    ) -> StoreResult<Option<TweetRecord>>;
    async fn delete_tweet(&self, id: &ObjectId, owner: &ObjectId)
        -> StoreResult<Option<TweetRecord>>;

    // -- likes

    /// Deletes the (target, actor) like if present; true when one existed.
    async fn remove_like(
        &self,
        target: LikeTarget,
        target_id: &ObjectId,
        liked_by: &ObjectId,
    ) -> StoreResult<bool>;
    /// Inserts a like; `Duplicate` when a concurrent toggle already did.
    async fn insert_like(&self, like: &LikeRecord) -> StoreResult<()>;
    /// Adjusts the target's denormalized counter; false if the target
    /// document no longer exists.
    async fn bump_like_counter(
        &self,
        target: LikeTarget,
        target_id: &ObjectId,
        op: CounterOp,
    ) -> StoreResult<bool>;
    async fn delete_likes_for_target(
        &self,
        target: LikeTarget,
        target_id: &ObjectId,
    ) -> StoreResult<()>;
    async fn list_liked_videos(
        &self,
        liked_by: &ObjectId,
        page: u64,
        limit: u64,
    ) -> StoreResult<Page<VideoWithOwner>>;

    // -- playlists

    async fn create_playlist(&self, playlist: &PlaylistRecord) -> StoreResult<()>;
    async fn find_playlist(&self, id: &ObjectId) -> StoreResult<Option<PlaylistRecord>>;
    async fn list_user_playlists(&self, owner: &ObjectId) -> StoreResult<Vec<PlaylistRecord>>;
    async fn add_video_to_playlist(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
        video: &ObjectId,
    ) -> StoreResult<Option<PlaylistRecord>>;
    async fn remove_video_from_playlist(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
        video: &ObjectId,
    ) -> StoreResult<Option<PlaylistRecord>>;
}

/// Selects and configures the store backend.
#[derive(Deserialize, Serialize, JsonSchema, Debug)]
#[serde(tag = "backend")]
pub enum StoreConfig {
    #[serde(rename = "mongo")]
    MongoDb(MongoDbConfig),
    /// Volatile in-process tables; for tests and local hacking only.
    #[serde(rename = "memory")]
    Memory,
}

/// Creates a concrete store implementation based on the StoreConfig.
pub async fn create_store(config: &StoreConfig) -> Arc<dyn Store> {
    match config {
        StoreConfig::MongoDb(mongo_config) => match MongoDbStore::new(mongo_config).await {
            Ok(store) => {
                info!("Successfully created MongoDB store.");
                Arc::new(store)
            }
            Err(e) => {
                error!("Failed to create MongoDB store: {}", e);
                std::process::exit(1);
            }
        },
        StoreConfig::Memory => {
            info!("Using in-memory store.");
            Arc::new(MemoryStore::new())
        }
    }
}
