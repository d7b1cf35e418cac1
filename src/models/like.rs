use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

/// What a like points at. Each target kind maps to one nullable field on the
/// like document and one counter-bearing collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LikeTarget {
    Video,
    Comment,
    Tweet,
}

impl LikeTarget {
    /// Field name on the like document holding the target id.
    pub fn field(&self) -> &'static str {
        match self {
            LikeTarget::Video => "video",
            LikeTarget::Comment => "comment",
            LikeTarget::Tweet => "tweet",
        }
    }

    /// Collection carrying the denormalized `likes` counter.
    pub fn collection(&self) -> &'static str {
        match self {
            LikeTarget::Video => "videos",
            LikeTarget::Comment => "comments",
            LikeTarget::Tweet => "tweets",
        }
    }

    /// Human-readable name used in messages.
    pub fn label(&self) -> &'static str {
        self.field()
    }
}

/// Stored shape of a like document (collection `likes`).
///
/// Exactly one of `video`/`comment`/`tweet` is set. The pair
/// (target field, `likedBy`) is unique at the storage layer; the existence
/// of this document is the source of truth for "liked" state.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LikeRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tweet: Option<ObjectId>,
    pub liked_by: ObjectId,
    pub created_at: DateTime,
}

impl LikeRecord {
    pub fn new(target: LikeTarget, target_id: ObjectId, liked_by: ObjectId) -> Self {
        let mut record = LikeRecord {
            id: ObjectId::new(),
            video: None,
            comment: None,
            tweet: None,
            liked_by,
            created_at: DateTime::now(),
        };
        match target {
            LikeTarget::Video => record.video = Some(target_id),
            LikeTarget::Comment => record.comment = Some(target_id),
            LikeTarget::Tweet => record.tweet = Some(target_id),
        }
        record
    }

    /// Returns the id this like points at, whatever the target kind.
    pub fn target_id(&self, target: LikeTarget) -> Option<ObjectId> {
        match target {
            LikeTarget::Video => self.video,
            LikeTarget::Comment => self.comment,
            LikeTarget::Tweet => self.tweet,
        }
    }
}
