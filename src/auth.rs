//! Request authentication.
//!
//! Handlers take a `CurrentUser` extractor argument; extraction reads the
//! access token from the `accessToken` cookie or an `Authorization: Bearer`
//! header, verifies it, and loads the sanitized user. Every failure mode
//! collapses to the same 401 so callers cannot probe why a token was
//! rejected; the detail goes to the debug log only.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;
use mongodb::bson::oid::ObjectId;
use tracing::debug;

use crate::models::User;
use crate::state::AppState;
use crate::tokens::TokenKind;
use crate::utils::envelope::ApiError;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// The authenticated user for this request, minus credential fields.
pub struct CurrentUser(pub User);

fn rejected(detail: &str) -> ApiError {
    debug!("request authentication failed: {}", detail);
    ApiError::unauthorized("unauthorized request")
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(ACCESS_TOKEN_COOKIE)
            .map(|c| c.value().to_string())
            .or_else(|| bearer_token(parts))
            .ok_or_else(|| rejected("no access token presented"))?;

        let claims = state
            .tokens
            .verify(TokenKind::Access, &token)
            .map_err(|e| rejected(&e))?;

        let user_id =
            ObjectId::parse_str(&claims.sub).map_err(|_| rejected("malformed subject claim"))?;

        let user = state
            .store
            .find_user_public(&user_id)
            .await
            .map_err(|e| rejected(&e.to_string()))?
            .ok_or_else(|| rejected("subject no longer exists"))?;

        Ok(CurrentUser(user))
    }
}
