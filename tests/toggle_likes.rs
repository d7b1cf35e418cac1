mod common;

use axum::http::{Method, StatusCode};
use mongodb::bson::oid::ObjectId;
use tower::ServiceExt;

use common::{access_token, authed_request, body_json, build_default_app, seed_user};
use videotube::models::{CommentRecord, LikeRecord, LikeTarget, TweetRecord, VideoRecord};

fn video_for(owner: ObjectId) -> VideoRecord {
    VideoRecord::new(
        "clip".to_string(),
        "a clip".to_string(),
        "http://media/clip.mp4".to_string(),
        "http://media/thumb.png".to_string(),
        12.5,
        owner,
    )
}

#[tokio::test]
async fn test_video_like_toggle_is_an_involution() {
    let (app, state) = build_default_app().await;
    let alice = seed_user(&state, "alice", "pw").await;
    let token = access_token(&state, &alice);

    let video = video_for(alice.id);
    state.store.create_video(&video).await.unwrap();
    let path = format!("/api/v1/likes/{}/video-like", video.id.to_hex());

    // First toggle likes.
    let response = app
        .clone()
        .oneshot(authed_request(Method::POST, &path, &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["liked"], true);
    let stored = state.store.find_video(&video.id).await.unwrap().unwrap();
    assert_eq!(stored.likes, 1);

    // Second toggle unlikes and the counter returns to zero.
    let response = app
        .oneshot(authed_request(Method::POST, &path, &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["liked"], false);
    let stored = state.store.find_video(&video.id).await.unwrap().unwrap();
    assert_eq!(stored.likes, 0);
}

/// A like record whose increment never landed must not drive the counter
/// below zero when it is removed.
#[tokio::test]
async fn test_unlike_never_drops_counter_below_zero() {
    let (app, state) = build_default_app().await;
    let alice = seed_user(&state, "alice", "pw").await;
    let token = access_token(&state, &alice);

    let video = video_for(alice.id);
    state.store.create_video(&video).await.unwrap();
    // Seed the like record directly, bypassing the counter bump.
    state
        .store
        .insert_like(&LikeRecord::new(LikeTarget::Video, video.id, alice.id))
        .await
        .unwrap();

    let path = format!("/api/v1/likes/{}/video-like", video.id.to_hex());
    let response = app
        .oneshot(authed_request(Method::POST, &path, &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["liked"], false);

    let stored = state.store.find_video(&video.id).await.unwrap().unwrap();
    assert_eq!(stored.likes, 0);
}

#[tokio::test]
async fn test_like_malformed_id_is_bad_request() {
    let (app, state) = build_default_app().await;
    let alice = seed_user(&state, "alice", "pw").await;
    let token = access_token(&state, &alice);

    let response = app
        .oneshot(authed_request(
            Method::POST,
            "/api/v1/likes/not-an-id/video-like",
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_like_absent_video_is_not_found() {
    let (app, state) = build_default_app().await;
    let alice = seed_user(&state, "alice", "pw").await;
    let token = access_token(&state, &alice);

    let path = format!("/api/v1/likes/{}/video-like", ObjectId::new().to_hex());
    let response = app
        .oneshot(authed_request(Method::POST, &path, &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The failed toggle leaves no orphaned like behind.
    assert_eq!(
        state
            .store
            .list_liked_videos(&alice.id, 1, 10)
            .await
            .unwrap()
            .total_docs,
        0
    );
}

#[tokio::test]
async fn test_comment_and_tweet_likes_toggle() {
    let (app, state) = build_default_app().await;
    let alice = seed_user(&state, "alice", "pw").await;
    let token = access_token(&state, &alice);

    let video = video_for(alice.id);
    state.store.create_video(&video).await.unwrap();
    let comment = CommentRecord::new("nice".to_string(), video.id, alice.id);
    state.store.create_comment(&comment).await.unwrap();
    let tweet = TweetRecord::new("hello".to_string(), alice.id);
    state.store.create_tweet(&tweet).await.unwrap();

    let path = format!("/api/v1/likes/{}/comment-like", comment.id.to_hex());
    let response = app
        .clone()
        .oneshot(authed_request(Method::POST, &path, &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let path = format!("/api/v1/likes/{}/tweet-like", tweet.id.to_hex());
    let response = app
        .oneshot(authed_request(Method::POST, &path, &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Each counter moved independently.
    let comments = state.store.list_comments(&video.id, 1, 10).await.unwrap();
    assert_eq!(comments.docs[0].likes, 1);
    let tweets = state.store.list_user_tweets(&alice.id).await.unwrap();
    assert_eq!(tweets[0].likes, 1);
}

#[tokio::test]
async fn test_liked_videos_listing() {
    let (app, state) = build_default_app().await;
    let alice = seed_user(&state, "alice", "pw").await;
    let bob = seed_user(&state, "bob", "pw").await;
    let token = access_token(&state, &alice);

    let liked = video_for(bob.id);
    let ignored = video_for(bob.id);
    state.store.create_video(&liked).await.unwrap();
    state.store.create_video(&ignored).await.unwrap();

    let path = format!("/api/v1/likes/{}/video-like", liked.id.to_hex());
    let response = app
        .clone()
        .oneshot(authed_request(Method::POST, &path, &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(authed_request(
            Method::GET,
            "/api/v1/likes/liked-videos",
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let docs = body["data"]["docs"].as_array().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["id"], liked.id.to_hex());
    // The owner join carries the summary, not the full user document.
    assert_eq!(docs[0]["owner"]["username"], "bob");
    assert!(docs[0]["owner"].get("email").is_none());
}
