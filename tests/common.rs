#![allow(dead_code)]

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, Response};
use axum::Router;
use figment::providers::{Format, Yaml};
use figment::Figment;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde_json::Value;

use videotube::config::Config;
use videotube::media::create_media_host;
use videotube::models::UserRecord;
use videotube::routes::create_router;
use videotube::state::AppState;
use videotube::store::create_store;
use videotube::tokens::{TokenKind, TokenService};

/// Config with the in-memory store and a media host nobody listens on;
/// flows that upload media swap in a mock server via `config_with_media`.
pub fn default_config() -> String {
    config_with_media("http://127.0.0.1:9", "/tmp/videotube-tests")
}

pub fn config_with_media(media_base: &str, temp_dir: &str) -> String {
    format!(
        r#"
version: "1.0.0"
bind_address: "127.0.0.1:0"
logging:
  level: "debug"
  format: "console"
store:
  backend: "memory"
tokens:
  access_secret: "test-access-secret"
  access_expiry_secs: 900
  refresh_secret: "test-refresh-secret"
  refresh_expiry_secs: 864000
media:
  upload_url: "{media_base}/upload"
  delete_url: "{media_base}/delete"
  api_key: "test-key"
  temp_dir: "{temp_dir}"
cookies:
  secure: false
"#
    )
}

pub async fn build_app(yaml: &str) -> (Router, AppState) {
    let config: Config = Figment::new()
        .merge(Yaml::string(yaml))
        .extract()
        .expect("failed to parse test config");
    let Config::ConfigV1(config) = config;

    tokio::fs::create_dir_all(&config.media.temp_dir)
        .await
        .expect("failed to create temp dir");

    let store = create_store(&config.store).await;
    let media = create_media_host(&config.media);
    let tokens = Arc::new(TokenService::new(config.tokens.clone()));

    let state = AppState {
        config: Arc::new(config),
        store,
        tokens,
        media,
    };

    (create_router(state.clone()), state)
}

pub async fn build_default_app() -> (Router, AppState) {
    build_app(&default_config()).await
}

/// Inserts a user directly into the store with a properly hashed password.
pub async fn seed_user(state: &AppState, username: &str, password: &str) -> UserRecord {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .expect("failed to hash password")
        .to_string();

    let record = UserRecord {
        id: ObjectId::new(),
        username: username.to_lowercase(),
        email: format!("{}@example.com", username),
        full_name: username.to_string(),
        avatar: "http://media/avatar.png".to_string(),
        cover_image: None,
        password: hash,
        refresh_token: None,
        created_at: DateTime::now(),
    };
    state
        .store
        .create_user(&record)
        .await
        .expect("failed to seed user");
    record
}

/// Mints a valid access token for a seeded user without going through login.
pub fn access_token(state: &AppState, user: &UserRecord) -> String {
    state
        .tokens
        .issue(TokenKind::Access, &user.id)
        .expect("failed to issue token")
}

pub fn json_request(method: Method, path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

pub fn authed_json_request(method: Method, path: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

pub fn authed_request(method: Method, path: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .expect("failed to build request")
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&bytes).expect("body is not json")
}
