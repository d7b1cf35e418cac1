use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

use super::wire_time;

/// Stored shape of a user document (collection `users`).
///
/// `username` is stored lowercased; `username` and `email` carry unique
/// indexes. `refresh_token` holds the single currently valid refresh token,
/// or nothing when the user is logged out.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    /// Argon2 hash, never the plaintext credential.
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub created_at: DateTime,
}

/// Projection of a user document without credential material. This is what
/// the auth guard loads; `password` and `refreshToken` are excluded at the
/// query level, not post-hoc.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedUserRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub created_at: DateTime,
}

/// Public JSON view of a user.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<SanitizedUserRecord> for User {
    fn from(record: SanitizedUserRecord) -> Self {
        User {
            id: record.id.to_hex(),
            username: record.username,
            email: record.email,
            full_name: record.full_name,
            avatar: record.avatar,
            cover_image: record.cover_image,
            created_at: wire_time(record.created_at),
        }
    }
}

impl From<&UserRecord> for User {
    fn from(record: &UserRecord) -> Self {
        User {
            id: record.id.to_hex(),
            username: record.username.clone(),
            email: record.email.clone(),
            full_name: record.full_name.clone(),
            avatar: record.avatar.clone(),
            cover_image: record.cover_image.clone(),
            created_at: wire_time(record.created_at),
        }
    }
}

/// The owner fields joined into listings (videos, comments, tweets).
#[derive(Deserialize, Clone, Debug)]
pub struct OwnerSummaryRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
    pub avatar: String,
}

/// Wire shape of a joined owner.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: String,
    pub username: String,
    pub avatar: String,
}

impl From<OwnerSummaryRecord> for OwnerSummary {
    fn from(record: OwnerSummaryRecord) -> Self {
        OwnerSummary {
            id: record.id.to_hex(),
            username: record.username,
            avatar: record.avatar,
        }
    }
}

impl From<&User> for OwnerSummary {
    fn from(user: &User) -> Self {
        OwnerSummary {
            id: user.id.clone(),
            username: user.username.clone(),
            avatar: user.avatar.clone(),
        }
    }
}
