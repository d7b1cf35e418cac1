//! Account and session endpoint handlers.

use std::path::{Path as FsPath, PathBuf};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{Multipart, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::{CurrentUser, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::models::{User, UserRecord};
use crate::state::AppState;
use crate::store::{ImageField, StoreError};
use crate::tokens::TokenKind;
use crate::utils::envelope::{ApiError, ApiResponse};
use crate::utils::params::parse_object_id;
use crate::utils::uploads::spool_field;

/// Registers account and session routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh-token", post(refresh_token))
        .route("/current-user", get(current_user))
        .route("/change-password", post(change_password))
        .route("/update-account", patch(update_account))
        .route("/avatar", patch(update_avatar))
        .route("/cover-image", patch(update_cover_image))
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            tracing::error!("password hashing failed: {}", e);
            ApiError::internal("internal server error")
        })
}

fn password_matches(hash: &str, password: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .build()
}

fn set_session_cookies(jar: CookieJar, access: &str, refresh: &str, secure: bool) -> CookieJar {
    jar.add(session_cookie(ACCESS_TOKEN_COOKIE, access.to_string(), secure))
        .add(session_cookie(REFRESH_TOKEN_COOKIE, refresh.to_string(), secure))
}

fn clear_session_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build((ACCESS_TOKEN_COOKIE, "")).path("/"))
        .remove(Cookie::build((REFRESH_TOKEN_COOKIE, "")).path("/"))
}

fn issue_pair(state: &AppState, user_id: &mongodb::bson::oid::ObjectId) -> Result<(String, String), ApiError> {
    let access = state.tokens.issue(TokenKind::Access, user_id).map_err(|e| {
        tracing::error!("failed to issue access token: {}", e);
        ApiError::internal("internal server error")
    })?;
    let refresh = state.tokens.issue(TokenKind::Refresh, user_id).map_err(|e| {
        tracing::error!("failed to issue refresh token: {}", e);
        ApiError::internal("internal server error")
    })?;
    Ok((access, refresh))
}

async fn discard_spooled(paths: &[&Option<PathBuf>]) {
    for path in paths.iter().filter_map(|p| p.as_ref()) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!("failed to remove spooled upload {}: {}", path.display(), e);
        }
    }
}

async fn register(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<ApiResponse<User>, ApiError> {
    let mut full_name = None;
    let mut email = None;
    let mut username = None;
    let mut password = None;
    let mut avatar_path: Option<PathBuf> = None;
    let mut cover_path: Option<PathBuf> = None;

    let temp_dir = state.config.media.temp_dir.clone();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("fullName") => full_name = Some(read_text(field).await?),
            Some("email") => email = Some(read_text(field).await?),
            Some("username") => username = Some(read_text(field).await?),
            Some("password") => password = Some(read_text(field).await?),
            Some("avatar") => avatar_path = Some(spool_field(field, FsPath::new(&temp_dir)).await?),
            Some("coverImage") => {
                cover_path = Some(spool_field(field, FsPath::new(&temp_dir)).await?)
            }
            _ => {}
        }
    }

    let required = [&full_name, &email, &username, &password];
    if required.iter().any(|f| f.as_deref().map_or(true, |v| v.trim().is_empty())) {
        discard_spooled(&[&avatar_path, &cover_path]).await;
        return Err(ApiError::bad_request("all fields are required"));
    }
    let Some(avatar_path) = avatar_path else {
        discard_spooled(&[&cover_path]).await;
        return Err(ApiError::bad_request("avatar file is required"));
    };

    let avatar = match state.media.upload(&avatar_path).await {
        Ok(asset) => asset,
        Err(e) => {
            tracing::error!("avatar upload failed: {}", e);
            discard_spooled(&[&cover_path]).await;
            return Err(ApiError::internal("failed to upload avatar"));
        }
    };

    // A missing cover image never blocks registration.
    let cover_image = match cover_path {
        Some(path) => match state.media.upload(&path).await {
            Ok(asset) => Some(asset.url),
            Err(e) => {
                warn!("cover image upload failed: {}", e);
                None
            }
        },
        None => None,
    };

    let record = UserRecord {
        id: mongodb::bson::oid::ObjectId::new(),
        username: username.unwrap_or_default().trim().to_lowercase(),
        email: email.unwrap_or_default().trim().to_string(),
        full_name: full_name.unwrap_or_default().trim().to_string(),
        avatar: avatar.url.clone(),
        cover_image: cover_image.clone(),
        password: hash_password(password.as_deref().unwrap_or_default())?,
        refresh_token: None,
        created_at: mongodb::bson::DateTime::now(),
    };

    match state.store.create_user(&record).await {
        Ok(()) => {}
        Err(StoreError::Duplicate) => {
            // The uploaded assets belong to no account; drop them.
            let _ = state.media.delete(&avatar.url).await;
            if let Some(url) = &cover_image {
                let _ = state.media.delete(url).await;
            }
            return Err(ApiError::conflict(
                "user already exists with same email or username",
            ));
        }
        Err(e) => return Err(e.into()),
    }

    info!("registered user {}", record.username);
    Ok(ApiResponse::created(
        User::from(&record),
        "user registered successfully",
    ))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart field: {}", e)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    identifier: Option<String>,
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionData {
    user: User,
    access_token: String,
    refresh_token: String,
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, ApiResponse<SessionData>), ApiError> {
    let identifier = body
        .identifier
        .or(body.username)
        .or(body.email)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("username or email is required"))?;
    let password = body
        .password
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request("password is required"))?;

    let user = state
        .store
        .find_user_by_login(identifier.trim())
        .await?
        .ok_or_else(|| ApiError::not_found("user does not exist"))?;

    if !password_matches(&user.password, &password) {
        return Err(ApiError::unauthorized("invalid user credentials"));
    }

    let (access, refresh) = issue_pair(&state, &user.id)?;
    state.store.set_refresh_token(&user.id, Some(&refresh)).await?;

    let jar = set_session_cookies(jar, &access, &refresh, state.config.cookies.secure);
    Ok((
        jar,
        ApiResponse::ok(
            SessionData {
                user: User::from(&user),
                access_token: access,
                refresh_token: refresh,
            },
            "user logged in successfully",
        ),
    ))
}

async fn logout(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<Value>), ApiError> {
    let user_id = parse_object_id(&user.id, "user")?;
    state.store.set_refresh_token(&user_id, None).await?;

    Ok((
        clear_session_cookies(jar),
        ApiResponse::ok(json!({}), "user logged out"),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: Option<String>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenPair {
    access_token: String,
    refresh_token: String,
}

async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<(CookieJar, ApiResponse<TokenPair>), ApiError> {
    let presented = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| body.and_then(|Json(b)| b.refresh_token))
        .ok_or_else(|| ApiError::unauthorized("unauthorized request"))?;

    let claims = state
        .tokens
        .verify(TokenKind::Refresh, &presented)
        .map_err(|_| ApiError::unauthorized("invalid refresh token"))?;
    let user_id = mongodb::bson::oid::ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::unauthorized("invalid refresh token"))?;

    let (access, refresh) = issue_pair(&state, &user_id)?;

    // Compare-and-swap against the presented token: a token that was
    // already rotated away (or cleared by logout) must not mint a session.
    let rotated = state
        .store
        .rotate_refresh_token(&user_id, &presented, &refresh)
        .await?;
    if !rotated {
        return Err(ApiError::unauthorized("refresh token is expired or used"));
    }

    let jar = set_session_cookies(jar, &access, &refresh, state.config.cookies.secure);
    Ok((
        jar,
        ApiResponse::ok(
            TokenPair {
                access_token: access,
                refresh_token: refresh,
            },
            "access token refreshed",
        ),
    ))
}

async fn current_user(CurrentUser(user): CurrentUser) -> ApiResponse<User> {
    ApiResponse::ok(user, "current user fetched successfully")
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    old_password: String,
    new_password: String,
}

async fn change_password(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<ApiResponse<Value>, ApiError> {
    if body.new_password.is_empty() {
        return Err(ApiError::bad_request("new password is required"));
    }

    let user_id = parse_object_id(&user.id, "user")?;
    let record = state
        .store
        .find_user_by_id(&user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    if !password_matches(&record.password, &body.old_password) {
        return Err(ApiError::bad_request("invalid old password"));
    }

    let hash = hash_password(&body.new_password)?;
    state.store.update_password(&user_id, &hash).await?;

    Ok(ApiResponse::ok(json!({}), "password changed successfully"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAccountRequest {
    full_name: Option<String>,
    email: Option<String>,
}

async fn update_account(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(body): Json<UpdateAccountRequest>,
) -> Result<ApiResponse<User>, ApiError> {
    let full_name = body.full_name.filter(|v| !v.trim().is_empty());
    let email = body.email.filter(|v| !v.trim().is_empty());
    if full_name.is_none() && email.is_none() {
        return Err(ApiError::bad_request("fullName or email is required"));
    }

    let user_id = parse_object_id(&user.id, "user")?;
    let updated = state
        .store
        .update_account(&user_id, full_name.as_deref(), email.as_deref())
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    Ok(ApiResponse::ok(updated, "account details updated successfully"))
}

async fn update_avatar(
    current: CurrentUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<ApiResponse<User>, ApiError> {
    let old = Some(current.0.avatar.clone());
    update_image(current, state, multipart, ImageField::Avatar, "avatar", old).await
}

async fn update_cover_image(
    current: CurrentUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<ApiResponse<User>, ApiError> {
    let old = current.0.cover_image.clone();
    update_image(
        current,
        state,
        multipart,
        ImageField::CoverImage,
        "coverImage",
        old,
    )
    .await
}

async fn update_image(
    CurrentUser(user): CurrentUser,
    state: AppState,
    mut multipart: Multipart,
    field: ImageField,
    field_name: &str,
    old_url: Option<String>,
) -> Result<ApiResponse<User>, ApiError> {
    let mut spooled = None;
    let temp_dir = state.config.media.temp_dir.clone();
    while let Some(part) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {}", e)))?
    {
        if part.name() == Some(field_name) {
            spooled = Some(spool_field(part, FsPath::new(&temp_dir)).await?);
            break;
        }
    }
    let spooled = spooled
        .ok_or_else(|| ApiError::bad_request(format!("{} file is required", field_name)))?;

    let asset = state.media.upload(&spooled).await.map_err(|e| {
        tracing::error!("image upload failed: {}", e);
        ApiError::internal("failed to upload image")
    })?;

    let user_id = parse_object_id(&user.id, "user")?;
    let updated = state
        .store
        .update_user_image(&user_id, field, &asset.url)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    // The replaced asset is unreferenced now; removal is best effort.
    if let Some(old) = old_url {
        if let Err(e) = state.media.delete(&old).await {
            warn!("failed to delete replaced image {}: {}", old, e);
        }
    }

    Ok(ApiResponse::ok(updated, "image updated successfully"))
}
