use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

use super::user::{OwnerSummary, OwnerSummaryRecord};
use super::wire_time;

/// Stored shape of a comment document (collection `comments`).
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub content: String,
    pub video: ObjectId,
    pub owner: ObjectId,
    pub likes: i64,
    pub created_at: DateTime,
}

impl CommentRecord {
    pub fn new(content: String, video: ObjectId, owner: ObjectId) -> Self {
        CommentRecord {
            id: ObjectId::new(),
            content,
            video,
            owner,
            likes: 0,
            created_at: DateTime::now(),
        }
    }
}

/// Public JSON view of a comment.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub video: String,
    pub owner: String,
    pub likes: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<CommentRecord> for Comment {
    fn from(record: CommentRecord) -> Self {
        Comment {
            id: record.id.to_hex(),
            content: record.content,
            video: record.video.to_hex(),
            owner: record.owner.to_hex(),
            likes: record.likes,
            created_at: wire_time(record.created_at),
        }
    }
}

/// Aggregation output: a comment joined with its owner's summary.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CommentWithOwnerRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub content: String,
    pub video: ObjectId,
    pub likes: i64,
    pub owner: OwnerSummaryRecord,
    pub created_at: DateTime,
}

/// Wire shape of a joined comment listing entry.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CommentWithOwner {
    pub id: String,
    pub content: String,
    pub video: String,
    pub likes: i64,
    pub owner: OwnerSummary,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<CommentWithOwnerRecord> for CommentWithOwner {
    fn from(record: CommentWithOwnerRecord) -> Self {
        CommentWithOwner {
            id: record.id.to_hex(),
            content: record.content,
            video: record.video.to_hex(),
            likes: record.likes,
            owner: record.owner.into(),
            created_at: wire_time(record.created_at),
        }
    }
}
