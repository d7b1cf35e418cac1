use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

use super::wire_time;

/// Stored shape of a playlist document (collection `playlists`).
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub videos: Vec<ObjectId>,
    pub owner: ObjectId,
    pub created_at: DateTime,
}

impl PlaylistRecord {
    pub fn new(name: String, description: String, owner: ObjectId) -> Self {
        PlaylistRecord {
            id: ObjectId::new(),
            name,
            description,
            videos: Vec::new(),
            owner,
            created_at: DateTime::now(),
        }
    }
}

/// Public JSON view of a playlist.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub description: String,
    pub videos: Vec<String>,
    pub owner: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<PlaylistRecord> for Playlist {
    fn from(record: PlaylistRecord) -> Self {
        Playlist {
            id: record.id.to_hex(),
            name: record.name,
            description: record.description,
            videos: record.videos.iter().map(|v| v.to_hex()).collect(),
            owner: record.owner.to_hex(),
            created_at: wire_time(record.created_at),
        }
    }
}
