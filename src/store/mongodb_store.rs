use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, from_document, oid::ObjectId, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{
    ClientOptions, FindOneAndUpdateOptions, FindOneOptions, IndexOptions, ReturnDocument,
};
use mongodb::{Client, Collection, Database, IndexModel};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::base::{
    CounterOp, ImageField, Store, StoreError, StoreResult, VideoListing, VideoUpdate,
};
use crate::models::{
    CommentRecord, CommentWithOwner, CommentWithOwnerRecord, LikeRecord, LikeTarget, Page,
    PlaylistRecord, SanitizedUserRecord, TweetRecord, TweetWithOwner, TweetWithOwnerRecord, User,
    UserRecord, VideoRecord, VideoWithOwner, VideoWithOwnerRecord,
};

/// The config struct for MongoDB connections.
#[derive(Deserialize, Serialize, JsonSchema, Debug)]
pub struct MongoDbConfig {
    pub uri: String,
    pub database: String,
}

/// A concrete `Store` implementation backed by MongoDB.
///
/// Uniqueness invariants (user handle, user email, one like per
/// target+actor) are declared as indexes at startup so they hold under
/// concurrent writers, not just under the sequential handler logic.
pub struct MongoDbStore {
    db: Database,
    users: Collection<UserRecord>,
    users_sanitized: Collection<SanitizedUserRecord>,
    videos: Collection<VideoRecord>,
    comments: Collection<CommentRecord>,
    tweets: Collection<TweetRecord>,
    likes: Collection<LikeRecord>,
    playlists: Collection<PlaylistRecord>,
}

/// Projection applied wherever a user document leaves the credential
/// boundary.
fn sanitized_projection() -> Document {
    doc! { "password": 0, "refreshToken": 0 }
}

fn backend<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// True when the server rejected a write because of a unique index.
fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    match e.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == 11000,
        ErrorKind::Command(ce) => ce.code == 11000,
        _ => false,
    }
}

fn map_write_err(e: mongodb::error::Error) -> StoreError {
    if is_duplicate_key(&e) {
        StoreError::Duplicate
    } else {
        StoreError::Backend(e.to_string())
    }
}

/// Stages joining the `owner` ObjectId into a `{_id, username, avatar}`
/// summary, shared by every listing aggregation.
fn owner_lookup_stages() -> Vec<Document> {
    vec![
        doc! { "$lookup": {
            "from": "users",
            "localField": "owner",
            "foreignField": "_id",
            "as": "owner",
        }},
        doc! { "$addFields": { "owner": { "$first": "$owner" } } },
        doc! { "$addFields": { "owner": {
            "_id": "$owner._id",
            "username": "$owner.username",
            "avatar": "$owner.avatar",
        }}},
    ]
}

fn paging_stages(page: u64, limit: u64) -> Vec<Document> {
    let skip = ((page.saturating_sub(1)) * limit) as i64;
    vec![doc! { "$skip": skip }, doc! { "$limit": limit as i64 }]
}

impl MongoDbStore {
    /// Connects and declares the indexes the handler logic depends on.
    pub async fn new(config: &MongoDbConfig) -> Result<Self, String> {
        info!("Connecting to MongoDB at URI: {}", config.uri);

        let mut client_options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| format!("Failed to parse MongoDB URI: {}", e))?;
        client_options.app_name = Some("videotube".to_string());

        let client = Client::with_options(client_options)
            .map_err(|e| format!("Failed to create MongoDB client: {}", e))?;

        info!("MongoDB connection established successfully.");

        let db = client.database(&config.database);
        let users = db.collection::<UserRecord>("users");
        let users_sanitized = db.collection::<SanitizedUserRecord>("users");
        let videos = db.collection::<VideoRecord>("videos");
        let comments = db.collection::<CommentRecord>("comments");
        let tweets = db.collection::<TweetRecord>("tweets");
        let likes = db.collection::<LikeRecord>("likes");
        let playlists = db.collection::<PlaylistRecord>("playlists");

        // Unique handle and contact address.
        for field in ["username", "email"] {
            let index = IndexModel::builder()
                .keys(doc! { field: 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build();
            users
                .create_index(index, None)
                .await
                .map_err(|e| format!("Failed to create unique index on {}: {}", field, e))?;
        }

        // One like per (target, actor). Partial per target field so likes
        // on different target kinds never collide with each other.
        for target in ["video", "comment", "tweet"] {
            let index = IndexModel::builder()
                .keys(doc! { target: 1, "likedBy": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .partial_filter_expression(doc! { target: { "$exists": true } })
                        .build(),
                )
                .build();
            likes.create_index(index, None).await.map_err(|e| {
                format!("Failed to create unique like index on {}: {}", target, e)
            })?;
        }

        Ok(Self {
            db,
            users,
            users_sanitized,
            videos,
            comments,
            tweets,
            likes,
            playlists,
        })
    }

    /// Collection carrying the denormalized counter for a like target.
    fn counter_collection(&self, target: LikeTarget) -> Collection<Document> {
        self.db.collection::<Document>(target.collection())
    }

    async fn collect_with_owner<R, V>(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> StoreResult<Vec<V>>
    where
        R: serde::de::DeserializeOwned,
        V: From<R>,
    {
        let mut cursor = self
            .db
            .collection::<Document>(collection)
            .aggregate(pipeline, None)
            .await
            .map_err(backend)?;

        let mut out = Vec::new();
        while let Some(document) = cursor.try_next().await.map_err(backend)? {
            let record: R = from_document(document).map_err(backend)?;
            out.push(V::from(record));
        }
        Ok(out)
    }
}

#[async_trait]
impl Store for MongoDbStore {
    // -- users

    async fn create_user(&self, user: &UserRecord) -> StoreResult<()> {
        self.users.insert_one(user, None).await.map_err(map_write_err)?;
        Ok(())
    }

    async fn find_user_by_id(&self, id: &ObjectId) -> StoreResult<Option<UserRecord>> {
        self.users
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(backend)
    }

    async fn find_user_by_login(&self, identifier: &str) -> StoreResult<Option<UserRecord>> {
        let filter = doc! { "$or": [
            { "username": identifier.to_lowercase() },
            { "email": identifier },
        ]};
        self.users.find_one(filter, None).await.map_err(backend)
    }

    async fn find_user_public(&self, id: &ObjectId) -> StoreResult<Option<User>> {
        let options = FindOneOptions::builder()
            .projection(sanitized_projection())
            .build();
        let record = self
            .users_sanitized
            .find_one(doc! { "_id": id }, options)
            .await
            .map_err(backend)?;
        Ok(record.map(User::from))
    }

    async fn set_refresh_token(&self, id: &ObjectId, token: Option<&str>) -> StoreResult<bool> {
        let update = match token {
            Some(value) => doc! { "$set": { "refreshToken": value } },
            None => doc! { "$unset": { "refreshToken": "" } },
        };
        let result = self
            .users
            .update_one(doc! { "_id": id }, update, None)
            .await
            .map_err(backend)?;
        Ok(result.matched_count == 1)
    }

    async fn rotate_refresh_token(
        &self,
        id: &ObjectId,
        presented: &str,
        next: &str,
    ) -> StoreResult<bool> {
        // Filtering on the presented value makes the compare-and-swap a
        // single atomic document update; a concurrent rotation or logout
        // leaves matched_count at zero.
        let result = self
            .users
            .update_one(
                doc! { "_id": id, "refreshToken": presented },
                doc! { "$set": { "refreshToken": next } },
                None,
            )
            .await
            .map_err(backend)?;
        Ok(result.matched_count == 1)
    }

    async fn update_account(
        &self,
        id: &ObjectId,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Option<User>> {
        let mut set = Document::new();
        if let Some(full_name) = full_name {
            set.insert("fullName", full_name);
        }
        if let Some(email) = email {
            set.insert("email", email);
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .projection(sanitized_projection())
            .build();
        let record = self
            .users_sanitized
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set }, options)
            .await
            .map_err(map_write_err)?;
        Ok(record.map(User::from))
    }

    async fn update_password(&self, id: &ObjectId, password_hash: &str) -> StoreResult<bool> {
        let result = self
            .users
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "password": password_hash } },
                None,
            )
            .await
            .map_err(backend)?;
        Ok(result.matched_count == 1)
    }

    async fn update_user_image(
        &self,
        id: &ObjectId,
        field: ImageField,
        url: &str,
    ) -> StoreResult<Option<User>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .projection(sanitized_projection())
            .build();
        let record = self
            .users_sanitized
            .find_one_and_update(
                doc! { "_id": id },
                doc! { "$set": { field.field(): url } },
                options,
            )
            .await
            .map_err(backend)?;
        Ok(record.map(User::from))
    }

    // -- videos

    async fn create_video(&self, video: &VideoRecord) -> StoreResult<()> {
        self.videos.insert_one(video, None).await.map_err(map_write_err)?;
        Ok(())
    }

    async fn find_video(&self, id: &ObjectId) -> StoreResult<Option<VideoRecord>> {
        self.videos
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(backend)
    }

    async fn video_exists(&self, id: &ObjectId) -> StoreResult<bool> {
        let count = self
            .videos
            .count_documents(doc! { "_id": id }, None)
            .await
            .map_err(backend)?;
        Ok(count > 0)
    }

    async fn list_videos(&self, listing: &VideoListing) -> StoreResult<Page<VideoWithOwner>> {
        let mut filter = doc! { "owner": listing.owner };
        if let Some(query) = &listing.query {
            filter.insert(
                "$or",
                vec![
                    doc! { "title": { "$regex": query, "$options": "i" } },
                    doc! { "description": { "$regex": query, "$options": "i" } },
                ],
            );
        }

        let total = self
            .videos
            .count_documents(filter.clone(), None)
            .await
            .map_err(backend)?;

        let direction = if listing.descending { -1 } else { 1 };
        let mut pipeline = vec![
            doc! { "$match": filter },
            doc! { "$sort": { listing.sort_by.field(): direction } },
        ];
        pipeline.extend(paging_stages(listing.page, listing.limit));
        pipeline.extend(owner_lookup_stages());

        let docs = self
            .collect_with_owner::<VideoWithOwnerRecord, VideoWithOwner>("videos", pipeline)
            .await?;
        Ok(Page::new(docs, total, listing.page, listing.limit))
    }

    async fn update_video(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
        update: &VideoUpdate,
    ) -> StoreResult<Option<VideoRecord>> {
        let mut set = Document::new();
        if let Some(title) = &update.title {
            set.insert("title", title);
        }
        if let Some(description) = &update.description {
            set.insert("description", description);
        }
        if let Some(thumbnail) = &update.thumbnail {
            set.insert("thumbnail", thumbnail);
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.videos
            .find_one_and_update(doc! { "_id": id, "owner": owner }, doc! { "$set": set }, options)
            .await
            .map_err(backend)
    }

    async fn delete_video(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
    ) -> StoreResult<Option<VideoRecord>> {
        self.videos
            .find_one_and_delete(doc! { "_id": id, "owner": owner }, None)
            .await
            .map_err(backend)
    }

    async fn toggle_publish(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
    ) -> StoreResult<Option<VideoRecord>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.videos
            .find_one_and_update(
                doc! { "_id": id, "owner": owner },
                vec![doc! { "$set": { "isPublished": { "$not": "$isPublished" } } }],
                options,
            )
            .await
            .map_err(backend)
    }

    async fn pull_video_from_playlists(&self, video: &ObjectId) -> StoreResult<()> {
        self.playlists
            .update_many(
                doc! { "videos": video },
                doc! { "$pull": { "videos": video } },
                None,
            )
            .await
            .map_err(backend)?;
        Ok(())
    }

    // -- comments

    async fn create_comment(&self, comment: &CommentRecord) -> StoreResult<()> {
        self.comments
            .insert_one(comment, None)
            .await
            .map_err(map_write_err)?;
        Ok(())
    }

    async fn update_comment(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
        content: &str,
    ) -> StoreResult<Option<CommentRecord>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.comments
            .find_one_and_update(
                doc! { "_id": id, "owner": owner },
                doc! { "$set": { "content": content } },
                options,
            )
            .await
            .map_err(backend)
    }

    async fn delete_comment(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
    ) -> StoreResult<Option<CommentRecord>> {
        self.comments
            .find_one_and_delete(doc! { "_id": id, "owner": owner }, None)
            .await
            .map_err(backend)
    }

    async fn list_comments(
        &self,
        video: &ObjectId,
        page: u64,
        limit: u64,
    ) -> StoreResult<Page<CommentWithOwner>> {
        let filter = doc! { "video": video };
        let total = self
            .comments
            .count_documents(filter.clone(), None)
            .await
            .map_err(backend)?;

        let mut pipeline = vec![
            doc! { "$match": filter },
            doc! { "$sort": { "createdAt": -1 } },
        ];
        pipeline.extend(paging_stages(page, limit));
        pipeline.extend(owner_lookup_stages());

        let docs = self
            .collect_with_owner::<CommentWithOwnerRecord, CommentWithOwner>("comments", pipeline)
            .await?;
        Ok(Page::new(docs, total, page, limit))
    }

    async fn delete_comments_for_video(&self, video: &ObjectId) -> StoreResult<()> {
        self.comments
            .delete_many(doc! { "video": video }, None)
            .await
            .map_err(backend)?;
        Ok(())
    }

    // -- tweets

    async fn create_tweet(&self, tweet: &TweetRecord) -> StoreResult<()> {
        self.tweets.insert_one(tweet, None).await.map_err(map_write_err)?;
        Ok(())
    }

    async fn list_user_tweets(&self, owner: &ObjectId) -> StoreResult<Vec<TweetWithOwner>> {
        let mut pipeline = vec![
            doc! { "$match": { "owner": owner } },
            doc! { "$sort": { "createdAt": -1 } },
        ];
        pipeline.extend(owner_lookup_stages());

        self.collect_with_owner::<TweetWithOwnerRecord, TweetWithOwner>("tweets", pipeline)
            .await
    }

    async fn update_tweet(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
        content: &str,
    ) -> StoreResult<Option<TweetRecord>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.tweets
            .find_one_and_update(
                doc! { "_id": id, "owner": owner },
                doc! { "$set": { "content": content } },
                options,
            )
            .await
            .map_err(backend)
    }

    async fn delete_tweet(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
    ) -> StoreResult<Option<TweetRecord>> {
        self.tweets
            .find_one_and_delete(doc! { "_id": id, "owner": owner }, None)
            .await
            .map_err(backend)
    }

    // -- likes

    async fn remove_like(
        &self,
        target: LikeTarget,
        target_id: &ObjectId,
        liked_by: &ObjectId,
    ) -> StoreResult<bool> {
        let result = self
            .likes
            .delete_one(doc! { target.field(): target_id, "likedBy": liked_by }, None)
            .await
            .map_err(backend)?;
        Ok(result.deleted_count == 1)
    }

    async fn insert_like(&self, like: &LikeRecord) -> StoreResult<()> {
        self.likes.insert_one(like, None).await.map_err(map_write_err)?;
        Ok(())
    }

    async fn bump_like_counter(
        &self,
        target: LikeTarget,
        target_id: &ObjectId,
        op: CounterOp,
    ) -> StoreResult<bool> {
        let collection = self.counter_collection(target);
        let result = match op {
            CounterOp::Increment => collection
                .update_one(doc! { "_id": target_id }, doc! { "$inc": { "likes": 1 } }, None)
                .await
                .map_err(backend)?,
            CounterOp::DecrementClamped => collection
                .update_one(
                    doc! { "_id": target_id },
                    // Server-side clamp: the counter never goes negative
                    // even if it has drifted from the like records.
                    vec![doc! { "$set": {
                        "likes": { "$max": [ { "$subtract": ["$likes", 1] }, 0 ] }
                    }}],
                    None,
                )
                .await
                .map_err(backend)?,
        };
        debug!(
            "counter {:?} on {}/{}: matched {}",
            op,
            target.collection(),
            target_id,
            result.matched_count
        );
        Ok(result.matched_count == 1)
    }

    async fn delete_likes_for_target(
        &self,
        target: LikeTarget,
        target_id: &ObjectId,
    ) -> StoreResult<()> {
        self.likes
            .delete_many(doc! { target.field(): target_id }, None)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn list_liked_videos(
        &self,
        liked_by: &ObjectId,
        page: u64,
        limit: u64,
    ) -> StoreResult<Page<VideoWithOwner>> {
        let filter = doc! { "video": { "$exists": true }, "likedBy": liked_by };
        let total = self
            .likes
            .count_documents(filter.clone(), None)
            .await
            .map_err(backend)?;

        let mut pipeline = vec![
            doc! { "$match": filter },
            doc! { "$sort": { "createdAt": -1 } },
        ];
        pipeline.extend(paging_stages(page, limit));
        pipeline.extend(vec![
            doc! { "$lookup": {
                "from": "videos",
                "localField": "video",
                "foreignField": "_id",
                "as": "video",
            }},
            doc! { "$unwind": "$video" },
            doc! { "$replaceRoot": { "newRoot": "$video" } },
        ]);
        pipeline.extend(owner_lookup_stages());

        let docs = self
            .collect_with_owner::<VideoWithOwnerRecord, VideoWithOwner>("likes", pipeline)
            .await?;
        Ok(Page::new(docs, total, page, limit))
    }

    // -- playlists

    async fn create_playlist(&self, playlist: &PlaylistRecord) -> StoreResult<()> {
        self.playlists
            .insert_one(playlist, None)
            .await
            .map_err(map_write_err)?;
        Ok(())
    }

    async fn find_playlist(&self, id: &ObjectId) -> StoreResult<Option<PlaylistRecord>> {
        self.playlists
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(backend)
    }

    async fn list_user_playlists(&self, owner: &ObjectId) -> StoreResult<Vec<PlaylistRecord>> {
        let options = mongodb::options::FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .build();
        let cursor = self
            .playlists
            .find(doc! { "owner": owner }, options)
            .await
            .map_err(backend)?;
        cursor.try_collect().await.map_err(backend)
    }

    async fn add_video_to_playlist(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
        video: &ObjectId,
    ) -> StoreResult<Option<PlaylistRecord>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.playlists
            .find_one_and_update(
                doc! { "_id": id, "owner": owner },
                doc! { "$addToSet": { "videos": video } },
                options,
            )
            .await
            .map_err(backend)
    }

    async fn remove_video_from_playlist(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
        video: &ObjectId,
    ) -> StoreResult<Option<PlaylistRecord>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.playlists
            .find_one_and_update(
                doc! { "_id": id, "owner": owner },
                doc! { "$pull": { "videos": video } },
                options,
            )
            .await
            .map_err(backend)
    }
}
