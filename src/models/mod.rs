//! Document records (bson shapes) and their public JSON views.
//!
//! Every collection entity comes in two flavors: a `*Record` struct matching
//! the stored document (ObjectIds, bson timestamps, camelCase field names)
//! and a view struct with hex-string ids and RFC3339 timestamps for the
//! wire. Credential material never appears in a view.

pub mod comment;
pub mod like;
pub mod playlist;
pub mod tweet;
pub mod user;
pub mod video;

pub use comment::{Comment, CommentRecord, CommentWithOwner, CommentWithOwnerRecord};
pub use like::{LikeRecord, LikeTarget};
pub use playlist::{Playlist, PlaylistRecord};
pub use tweet::{Tweet, TweetRecord, TweetWithOwner, TweetWithOwnerRecord};
pub use user::{OwnerSummary, OwnerSummaryRecord, SanitizedUserRecord, User, UserRecord};
pub use video::{Video, VideoRecord, VideoWithOwner, VideoWithOwnerRecord};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Converts a stored bson timestamp into a wire timestamp.
pub(crate) fn wire_time(dt: mongodb::bson::DateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis()).unwrap_or_default()
}

/// One page of a paginated listing, in the shape clients expect from
/// paginated aggregations.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub docs: Vec<T>,
    pub total_docs: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(docs: Vec<T>, total_docs: u64, page: u64, limit: u64) -> Self {
        let total_pages = if total_docs == 0 {
            0
        } else {
            (total_docs + limit - 1) / limit
        };
        Page {
            docs,
            total_docs,
            page,
            limit,
            total_pages,
        }
    }
}
