//! Signed access/refresh token issuance and verification.
//!
//! Two token kinds, two secrets: an access token proves identity for a
//! single request window, a refresh token only mints new pairs. Verifying a
//! token against the wrong kind's secret fails, it never silently validates.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Signing secrets and lifetimes, injected at startup.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    /// Access token lifetime in seconds (minutes-to-hours scale).
    pub access_expiry_secs: i64,
    pub refresh_secret: String,
    /// Refresh token lifetime in seconds (days-to-weeks scale).
    pub refresh_expiry_secs: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by both token kinds. `jti` makes every issued token
/// distinct even for the same subject within the same second, which is what
/// makes refresh rotation observable.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    pub sub: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies both token kinds from an explicitly constructed
/// config. Stateless; rotation state lives on the user record.
pub struct TokenService {
    config: TokenConfig,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Self {
        TokenService { config }
    }

    fn secret(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Access => self.config.access_secret.as_bytes(),
            TokenKind::Refresh => self.config.refresh_secret.as_bytes(),
        }
    }

    fn expiry_secs(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.config.access_expiry_secs,
            TokenKind::Refresh => self.config.refresh_expiry_secs,
        }
    }

    /// Signs a token of the given kind for the given user.
    pub fn issue(&self, kind: TokenKind, user_id: &ObjectId) -> Result<String, String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_hex(),
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.expiry_secs(kind),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret(kind)),
        )
        .map_err(|e| format!("failed to sign token: {}", e))
    }

    /// Verifies signature and expiry against the given kind's secret.
    pub fn verify(&self, kind: TokenKind, token: &str) -> Result<Claims, String> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret(kind)),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| format!("token rejected: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(TokenConfig {
            access_secret: "access-secret".into(),
            access_expiry_secs: 900,
            refresh_secret: "refresh-secret".into(),
            refresh_expiry_secs: 864_000,
        })
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let service = service();
        let user = ObjectId::new();

        let token = service.issue(TokenKind::Access, &user).unwrap();
        let claims = service.verify(TokenKind::Access, &token).unwrap();
        assert_eq!(claims.sub, user.to_hex());
        assert!(claims.exp > claims.iat);
    }

    /// An access token must not verify as a refresh token and vice versa.
    #[test]
    fn test_wrong_kind_fails() {
        let service = service();
        let user = ObjectId::new();

        let access = service.issue(TokenKind::Access, &user).unwrap();
        assert!(service.verify(TokenKind::Refresh, &access).is_err());

        let refresh = service.issue(TokenKind::Refresh, &user).unwrap();
        assert!(service.verify(TokenKind::Access, &refresh).is_err());
    }

    #[test]
    fn test_expired_token_fails() {
        let service = TokenService::new(TokenConfig {
            access_secret: "access-secret".into(),
            // Issued already expired, well past the default leeway.
            access_expiry_secs: -3600,
            refresh_secret: "refresh-secret".into(),
            refresh_expiry_secs: -3600,
        });

        let token = service.issue(TokenKind::Access, &ObjectId::new()).unwrap();
        assert!(service.verify(TokenKind::Access, &token).is_err());
    }

    #[test]
    fn test_garbage_token_fails() {
        let service = service();
        assert!(service.verify(TokenKind::Access, "not.a.jwt").is_err());
        assert!(service.verify(TokenKind::Access, "").is_err());
    }

    /// Two tokens for the same subject issued back to back are distinct.
    #[test]
    fn test_issued_tokens_are_unique() {
        let service = service();
        let user = ObjectId::new();

        let a = service.issue(TokenKind::Refresh, &user).unwrap();
        let b = service.issue(TokenKind::Refresh, &user).unwrap();
        assert_ne!(a, b);
    }
}
