use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

use super::user::{OwnerSummary, OwnerSummaryRecord};
use super::wire_time;

/// Stored shape of a video document (collection `videos`).
///
/// `likes` is a denormalized counter kept consistent with the `likes`
/// collection by the toggle handlers; it is derived state and can be
/// recomputed by a recount if it ever drifts.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    pub video_file: String,
    pub thumbnail: String,
    pub duration: f64,
    pub views: i64,
    pub likes: i64,
    pub is_published: bool,
    pub owner: ObjectId,
    pub created_at: DateTime,
}

impl VideoRecord {
    pub fn new(
        title: String,
        description: String,
        video_file: String,
        thumbnail: String,
        duration: f64,
        owner: ObjectId,
    ) -> Self {
        VideoRecord {
            id: ObjectId::new(),
            title,
            description,
            video_file,
            thumbnail,
            duration,
            views: 0,
            likes: 0,
            is_published: true,
            owner,
            created_at: DateTime::now(),
        }
    }
}

/// Public JSON view of a video.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub title: String,
    pub description: String,
    pub video_file: String,
    pub thumbnail: String,
    pub duration: f64,
    pub views: i64,
    pub likes: i64,
    pub is_published: bool,
    pub owner: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<VideoRecord> for Video {
    fn from(record: VideoRecord) -> Self {
        Video {
            id: record.id.to_hex(),
            title: record.title,
            description: record.description,
            video_file: record.video_file,
            thumbnail: record.thumbnail,
            duration: record.duration,
            views: record.views,
            likes: record.likes,
            is_published: record.is_published,
            owner: record.owner.to_hex(),
            created_at: wire_time(record.created_at),
        }
    }
}

/// Aggregation output: a video joined with its owner's summary.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VideoWithOwnerRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    pub video_file: String,
    pub thumbnail: String,
    pub duration: f64,
    pub views: i64,
    pub likes: i64,
    pub is_published: bool,
    pub owner: OwnerSummaryRecord,
    pub created_at: DateTime,
}

/// Wire shape of a joined video listing entry.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VideoWithOwner {
    pub id: String,
    pub title: String,
    pub description: String,
    pub video_file: String,
    pub thumbnail: String,
    pub duration: f64,
    pub views: i64,
    pub likes: i64,
    pub is_published: bool,
    pub owner: OwnerSummary,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<VideoWithOwnerRecord> for VideoWithOwner {
    fn from(record: VideoWithOwnerRecord) -> Self {
        VideoWithOwner {
            id: record.id.to_hex(),
            title: record.title,
            description: record.description,
            video_file: record.video_file,
            thumbnail: record.thumbnail,
            duration: record.duration,
            views: record.views,
            likes: record.likes,
            is_published: record.is_published,
            owner: record.owner.into(),
            created_at: wire_time(record.created_at),
        }
    }
}
