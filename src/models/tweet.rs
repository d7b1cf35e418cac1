use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

use super::user::{OwnerSummary, OwnerSummaryRecord};
use super::wire_time;

/// Stored shape of a tweet document (collection `tweets`).
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TweetRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub content: String,
    pub owner: ObjectId,
    pub likes: i64,
    pub created_at: DateTime,
}

impl TweetRecord {
    pub fn new(content: String, owner: ObjectId) -> Self {
        TweetRecord {
            id: ObjectId::new(),
            content,
            owner,
            likes: 0,
            created_at: DateTime::now(),
        }
    }
}

/// Public JSON view of a tweet.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    pub id: String,
    pub content: String,
    pub owner: String,
    pub likes: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<TweetRecord> for Tweet {
    fn from(record: TweetRecord) -> Self {
        Tweet {
            id: record.id.to_hex(),
            content: record.content,
            owner: record.owner.to_hex(),
            likes: record.likes,
            created_at: wire_time(record.created_at),
        }
    }
}

/// Aggregation output: a tweet joined with its owner's summary.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TweetWithOwnerRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub content: String,
    pub likes: i64,
    pub owner: OwnerSummaryRecord,
    pub created_at: DateTime,
}

/// Wire shape of a joined tweet listing entry.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TweetWithOwner {
    pub id: String,
    pub content: String,
    pub likes: i64,
    pub owner: OwnerSummary,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<TweetWithOwnerRecord> for TweetWithOwner {
    fn from(record: TweetWithOwnerRecord) -> Self {
        TweetWithOwner {
            id: record.id.to_hex(),
            content: record.content,
            likes: record.likes,
            owner: record.owner.into(),
            created_at: wire_time(record.created_at),
        }
    }
}
