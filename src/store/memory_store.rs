use std::collections::HashMap;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use super::base::{
    CounterOp, ImageField, Store, StoreError, StoreResult, VideoListing, VideoUpdate,
};
use crate::models::{
    CommentRecord, CommentWithOwner, LikeRecord, LikeTarget, OwnerSummary, Page, PlaylistRecord,
    TweetRecord, TweetWithOwner, User, UserRecord, VideoRecord, VideoWithOwner,
};

#[derive(Default)]
struct Tables {
    users: HashMap<ObjectId, UserRecord>,
    videos: HashMap<ObjectId, VideoRecord>,
    comments: HashMap<ObjectId, CommentRecord>,
    tweets: HashMap<ObjectId, TweetRecord>,
    likes: HashMap<ObjectId, LikeRecord>,
    playlists: HashMap<ObjectId, PlaylistRecord>,
}

/// Volatile `Store` backed by in-process hash maps.
///
/// Mirrors the MongoDB backend's semantics (uniqueness rejections, the
/// refresh token compare-and-swap, the counter clamp) so the full handler
/// stack can be exercised without a database.
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

fn owner_summary(tables: &Tables, owner: &ObjectId) -> OwnerSummary {
    match tables.users.get(owner) {
        Some(user) => OwnerSummary {
            id: user.id.to_hex(),
            username: user.username.clone(),
            avatar: user.avatar.clone(),
        },
        // A dangling owner never blocks a listing.
        None => OwnerSummary {
            id: owner.to_hex(),
            username: String::new(),
            avatar: String::new(),
        },
    }
}

fn paginate<T>(mut items: Vec<T>, page: u64, limit: u64) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let skip = (page.saturating_sub(1) * limit) as usize;
    if skip >= items.len() {
        return (Vec::new(), total);
    }
    let mut tail = items.split_off(skip);
    tail.truncate(limit as usize);
    (tail, total)
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            tables: RwLock::new(Tables::default()),
        }
    }

    fn video_with_owner(tables: &Tables, record: &VideoRecord) -> VideoWithOwner {
        VideoWithOwner {
            id: record.id.to_hex(),
            title: record.title.clone(),
            description: record.description.clone(),
            video_file: record.video_file.clone(),
            thumbnail: record.thumbnail.clone(),
            duration: record.duration,
            views: record.views,
            likes: record.likes,
            is_published: record.is_published,
            owner: owner_summary(tables, &record.owner),
            created_at: crate::models::wire_time(record.created_at),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    // -- users

    async fn create_user(&self, user: &UserRecord) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email);
        if taken {
            return Err(StoreError::Duplicate);
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, id: &ObjectId) -> StoreResult<Option<UserRecord>> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn find_user_by_login(&self, identifier: &str) -> StoreResult<Option<UserRecord>> {
        let handle = identifier.to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == handle || u.email == identifier)
            .cloned())
    }

    async fn find_user_public(&self, id: &ObjectId) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(id).map(User::from))
    }

    async fn set_refresh_token(&self, id: &ObjectId, token: Option<&str>) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(id) {
            Some(user) => {
                user.refresh_token = token.map(str::to_string);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn rotate_refresh_token(
        &self,
        id: &ObjectId,
        presented: &str,
        next: &str,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(id) {
            Some(user) if user.refresh_token.as_deref() == Some(presented) => {
                user.refresh_token = Some(next.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_account(
        &self,
        id: &ObjectId,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(id) {
            Some(user) => {
                if let Some(full_name) = full_name {
                    user.full_name = full_name.to_string();
                }
                if let Some(email) = email {
                    user.email = email.to_string();
                }
                Ok(Some(User::from(&*user)))
            }
            None => Ok(None),
        }
    }

    async fn update_password(&self, id: &ObjectId, password_hash: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(id) {
            Some(user) => {
                user.password = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_user_image(
        &self,
        id: &ObjectId,
        field: ImageField,
        url: &str,
    ) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(id) {
            Some(user) => {
                match field {
                    ImageField::Avatar => user.avatar = url.to_string(),
                    ImageField::CoverImage => user.cover_image = Some(url.to_string()),
                }
                Ok(Some(User::from(&*user)))
            }
            None => Ok(None),
        }
    }

    // -- videos

    async fn create_video(&self, video: &VideoRecord) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.videos.insert(video.id, video.clone());
        Ok(())
    }

    async fn find_video(&self, id: &ObjectId) -> StoreResult<Option<VideoRecord>> {
        Ok(self.tables.read().await.videos.get(id).cloned())
    }

    async fn video_exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.tables.read().await.videos.contains_key(id))
    }

    async fn list_videos(&self, listing: &VideoListing) -> StoreResult<Page<VideoWithOwner>> {
        let tables = self.tables.read().await;
        let mut matched: Vec<&VideoRecord> = tables
            .videos
            .values()
            .filter(|v| v.owner == listing.owner)
            .filter(|v| match &listing.query {
                Some(query) => {
                    let query = query.to_lowercase();
                    v.title.to_lowercase().contains(&query)
                        || v.description.to_lowercase().contains(&query)
                }
                None => true,
            })
            .collect();

        matched.sort_by(|a, b| {
            use super::base::VideoSort;
            let ordering = match listing.sort_by {
                VideoSort::CreatedAt => a.created_at.cmp(&b.created_at),
                VideoSort::Title => a.title.cmp(&b.title),
                VideoSort::Duration => a
                    .duration
                    .partial_cmp(&b.duration)
                    .unwrap_or(std::cmp::Ordering::Equal),
                VideoSort::Views => a.views.cmp(&b.views),
            };
            if listing.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });

        let (page_items, total) = paginate(matched, listing.page, listing.limit);
        let docs = page_items
            .into_iter()
            .map(|v| Self::video_with_owner(&tables, v))
            .collect();
        Ok(Page::new(docs, total, listing.page, listing.limit))
    }

    async fn update_video(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
        update: &VideoUpdate,
    ) -> StoreResult<Option<VideoRecord>> {
        let mut tables = self.tables.write().await;
        match tables.videos.get_mut(id) {
            Some(video) if video.owner == *owner => {
                if let Some(title) = &update.title {
                    video.title = title.clone();
                }
                if let Some(description) = &update.description {
                    video.description = description.clone();
                }
                if let Some(thumbnail) = &update.thumbnail {
                    video.thumbnail = thumbnail.clone();
                }
                Ok(Some(video.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_video(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
    ) -> StoreResult<Option<VideoRecord>> {
        let mut tables = self.tables.write().await;
        match tables.videos.get(id) {
            Some(video) if video.owner == *owner => Ok(tables.videos.remove(id)),
            _ => Ok(None),
        }
    }

    async fn toggle_publish(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
    ) -> StoreResult<Option<VideoRecord>> {
        let mut tables = self.tables.write().await;
        match tables.videos.get_mut(id) {
            Some(video) if video.owner == *owner => {
                video.is_published = !video.is_published;
                Ok(Some(video.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn pull_video_from_playlists(&self, video: &ObjectId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        for playlist in tables.playlists.values_mut() {
            playlist.videos.retain(|v| v != video);
        }
        Ok(())
    }

    // -- comments

    async fn create_comment(&self, comment: &CommentRecord) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.comments.insert(comment.id, comment.clone());
        Ok(())
    }

    async fn update_comment(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
        content: &str,
    ) -> StoreResult<Option<CommentRecord>> {
        let mut tables = self.tables.write().await;
        match tables.comments.get_mut(id) {
            Some(comment) if comment.owner == *owner => {
                comment.content = content.to_string();
                Ok(Some(comment.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_comment(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
    ) -> StoreResult<Option<CommentRecord>> {
        let mut tables = self.tables.write().await;
        match tables.comments.get(id) {
            Some(comment) if comment.owner == *owner => Ok(tables.comments.remove(id)),
            _ => Ok(None),
        }
    }

    async fn list_comments(
        &self,
        video: &ObjectId,
        page: u64,
        limit: u64,
    ) -> StoreResult<Page<CommentWithOwner>> {
        let tables = self.tables.read().await;
        let mut matched: Vec<&CommentRecord> = tables
            .comments
            .values()
            .filter(|c| c.video == *video)
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let (page_items, total) = paginate(matched, page, limit);
        let docs = page_items
            .into_iter()
            .map(|c| CommentWithOwner {
                id: c.id.to_hex(),
                content: c.content.clone(),
                video: c.video.to_hex(),
                likes: c.likes,
                owner: owner_summary(&tables, &c.owner),
                created_at: crate::models::wire_time(c.created_at),
            })
            .collect();
        Ok(Page::new(docs, total, page, limit))
    }

    async fn delete_comments_for_video(&self, video: &ObjectId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.comments.retain(|_, c| c.video != *video);
        Ok(())
    }

    // -- tweets

    async fn create_tweet(&self, tweet: &TweetRecord) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.tweets.insert(tweet.id, tweet.clone());
        Ok(())
    }

    async fn list_user_tweets(&self, owner: &ObjectId) -> StoreResult<Vec<TweetWithOwner>> {
        let tables = self.tables.read().await;
        let mut matched: Vec<&TweetRecord> =
            tables.tweets.values().filter(|t| t.owner == *owner).collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(matched
            .into_iter()
            .map(|t| TweetWithOwner {
                id: t.id.to_hex(),
                content: t.content.clone(),
                likes: t.likes,
                owner: owner_summary(&tables, &t.owner),
                created_at: crate::models::wire_time(t.created_at),
            })
            .collect())
    }

    async fn update_tweet(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
        content: &str,
    ) -> StoreResult<Option<TweetRecord>> {
        let mut tables = self.tables.write().await;
        match tables.tweets.get_mut(id) {
            Some(tweet) if tweet.owner == *owner => {
                tweet.content = content.to_string();
                Ok(Some(tweet.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_tweet(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
    ) -> StoreResult<Option<TweetRecord>> {
        let mut tables = self.tables.write().await;
        match tables.tweets.get(id) {
            Some(tweet) if tweet.owner == *owner => Ok(tables.tweets.remove(id)),
            _ => Ok(None),
        }
    }

    // -- likes

    async fn remove_like(
        &self,
        target: LikeTarget,
        target_id: &ObjectId,
        liked_by: &ObjectId,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let found = tables
            .likes
            .iter()
            .find(|(_, l)| l.target_id(target) == Some(*target_id) && l.liked_by == *liked_by)
            .map(|(id, _)| *id);
        match found {
            Some(id) => {
                tables.likes.remove(&id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_like(&self, like: &LikeRecord) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        for target in [LikeTarget::Video, LikeTarget::Comment, LikeTarget::Tweet] {
            if let Some(target_id) = like.target_id(target) {
                let exists = tables.likes.values().any(|l| {
                    l.target_id(target) == Some(target_id) && l.liked_by == like.liked_by
                });
                if exists {
                    return Err(StoreError::Duplicate);
                }
            }
        }
        tables.likes.insert(like.id, like.clone());
        Ok(())
    }

    async fn bump_like_counter(
        &self,
        target: LikeTarget,
        target_id: &ObjectId,
        op: CounterOp,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let counter = match target {
            LikeTarget::Video => tables.videos.get_mut(target_id).map(|v| &mut v.likes),
            LikeTarget::Comment => tables.comments.get_mut(target_id).map(|c| &mut c.likes),
            LikeTarget::Tweet => tables.tweets.get_mut(target_id).map(|t| &mut t.likes),
        };
        match counter {
            Some(likes) => {
                *likes = match op {
                    CounterOp::Increment => *likes + 1,
                    CounterOp::DecrementClamped => (*likes - 1).max(0),
                };
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_likes_for_target(
        &self,
        target: LikeTarget,
        target_id: &ObjectId,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .likes
            .retain(|_, l| l.target_id(target) != Some(*target_id));
        Ok(())
    }

    async fn list_liked_videos(
        &self,
        liked_by: &ObjectId,
        page: u64,
        limit: u64,
    ) -> StoreResult<Page<VideoWithOwner>> {
        let tables = self.tables.read().await;
        let mut liked: Vec<&LikeRecord> = tables
            .likes
            .values()
            .filter(|l| l.liked_by == *liked_by && l.video.is_some())
            .collect();
        liked.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let videos: Vec<&VideoRecord> = liked
            .into_iter()
            .filter_map(|l| l.video.as_ref().and_then(|v| tables.videos.get(v)))
            .collect();

        let (page_items, total) = paginate(videos, page, limit);
        let docs = page_items
            .into_iter()
            .map(|v| Self::video_with_owner(&tables, v))
            .collect();
        Ok(Page::new(docs, total, page, limit))
    }

    // -- playlists

    async fn create_playlist(&self, playlist: &PlaylistRecord) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.playlists.insert(playlist.id, playlist.clone());
        Ok(())
    }

    async fn find_playlist(&self, id: &ObjectId) -> StoreResult<Option<PlaylistRecord>> {
        Ok(self.tables.read().await.playlists.get(id).cloned())
    }

    async fn list_user_playlists(&self, owner: &ObjectId) -> StoreResult<Vec<PlaylistRecord>> {
        let tables = self.tables.read().await;
        let mut matched: Vec<PlaylistRecord> = tables
            .playlists
            .values()
            .filter(|p| p.owner == *owner)
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    async fn add_video_to_playlist(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
        video: &ObjectId,
    ) -> StoreResult<Option<PlaylistRecord>> {
        let mut tables = self.tables.write().await;
        match tables.playlists.get_mut(id) {
            Some(playlist) if playlist.owner == *owner => {
                if !playlist.videos.contains(video) {
                    playlist.videos.push(*video);
                }
                Ok(Some(playlist.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn remove_video_from_playlist(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
        video: &ObjectId,
    ) -> StoreResult<Option<PlaylistRecord>> {
        let mut tables = self.tables.write().await;
        match tables.playlists.get_mut(id) {
            Some(playlist) if playlist.owner == *owner => {
                playlist.videos.retain(|v| v != video);
                Ok(Some(playlist.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::DateTime;

    fn user(name: &str) -> UserRecord {
        UserRecord {
            id: ObjectId::new(),
            username: name.to_string(),
            email: format!("{}@example.com", name),
            full_name: name.to_string(),
            avatar: "http://media/a.png".to_string(),
            cover_image: None,
            password: "hash".to_string(),
            refresh_token: None,
            created_at: DateTime::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = MemoryStore::new();
        store.create_user(&user("alice")).await.unwrap();

        let mut clash = user("alice");
        clash.email = "other@example.com".to_string();
        assert!(matches!(
            store.create_user(&clash).await,
            Err(StoreError::Duplicate)
        ));
    }

    #[tokio::test]
    async fn test_rotate_refresh_token_is_compare_and_swap() {
        let store = MemoryStore::new();
        let alice = user("alice");
        store.create_user(&alice).await.unwrap();
        store
            .set_refresh_token(&alice.id, Some("current"))
            .await
            .unwrap();

        // Wrong presented value must not rotate.
        assert!(!store
            .rotate_refresh_token(&alice.id, "stale", "next")
            .await
            .unwrap());
        // Matching value rotates exactly once.
        assert!(store
            .rotate_refresh_token(&alice.id, "current", "next")
            .await
            .unwrap());
        assert!(!store
            .rotate_refresh_token(&alice.id, "current", "again")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_like_counter_clamps_at_zero() {
        let store = MemoryStore::new();
        let alice = user("alice");
        store.create_user(&alice).await.unwrap();
        let video = VideoRecord::new(
            "t".into(),
            "d".into(),
            "http://media/v.mp4".into(),
            "http://media/t.png".into(),
            1.0,
            alice.id,
        );
        store.create_video(&video).await.unwrap();

        assert!(store
            .bump_like_counter(LikeTarget::Video, &video.id, CounterOp::DecrementClamped)
            .await
            .unwrap());
        let stored = store.find_video(&video.id).await.unwrap().unwrap();
        assert_eq!(stored.likes, 0);
    }

    #[tokio::test]
    async fn test_duplicate_like_rejected() {
        let store = MemoryStore::new();
        let video = ObjectId::new();
        let actor = ObjectId::new();

        store
            .insert_like(&LikeRecord::new(LikeTarget::Video, video, actor))
            .await
            .unwrap();
        assert!(matches!(
            store
                .insert_like(&LikeRecord::new(LikeTarget::Video, video, actor))
                .await,
            Err(StoreError::Duplicate)
        ));
    }
}
