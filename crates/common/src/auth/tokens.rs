//! Signed, time-limited tokens bound to a user
//!
//! Tokens are HS256 JWTs carrying the user id and a purpose. They are the
//! only state: nothing is stored server-side, and every verification failure
//! (bad signature, malformed payload, expiry, wrong purpose) collapses to `None`.

use crate::config::AppConfig;
use crate::db::models::User;
use crate::errors::{AppError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Purpose claim of password reset tokens
pub const RESET_PASSWORD_PURPOSE: &str = "reset_password";

/// Purpose claim of login session tokens
pub const SESSION_PURPOSE: &str = "session";

/// Default lifetime of a password reset token in seconds
pub const DEFAULT_RESET_TTL_SECS: u64 = 600;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: i32,

    /// What the token may be used for
    pub purpose: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Issues and verifies tokens with a process-wide secret
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    reset_ttl_secs: u64,
}

impl TokenService {
    /// Create a token service with the given secret
    pub fn new(secret: &str, reset_ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            reset_ttl_secs,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let secret = config.secret_key()?;
        Ok(Self::new(secret, config.auth.reset_token_ttl_secs))
    }

    /// Reset token with the configured lifetime
    pub fn issue_reset_token(&self, user: &User) -> Result<String> {
        self.issue_reset_token_with_ttl(user, self.reset_ttl_secs)
    }

    pub fn issue_reset_token_with_ttl(&self, user: &User, ttl_secs: u64) -> Result<String> {
        self.issue(user.id, RESET_PASSWORD_PURPOSE, seconds(ttl_secs))
    }

    /// User id bound to a valid reset token
    pub fn verify_reset_token(&self, token: &str) -> Option<i32> {
        self.verify(token, RESET_PASSWORD_PURPOSE)
    }

    pub fn issue_session_token(&self, user_id: i32, ttl_secs: u64) -> Result<String> {
        self.issue(user_id, SESSION_PURPOSE, seconds(ttl_secs))
    }

    /// User id bound to a valid session token
    pub fn verify_session_token(&self, token: &str) -> Option<i32> {
        self.verify(token, SESSION_PURPOSE)
    }

    fn issue(&self, user_id: i32, purpose: &str, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user_id,
            purpose: purpose.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            AppError::Internal {
                message: format!("Failed to generate token: {}", e),
            }
        })
    }

    fn verify(&self, token: &str, purpose: &str) -> Option<i32> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        match decode::<TokenClaims>(token, &self.decoding_key, &validation) {
            Ok(data) if data.claims.purpose == purpose => Some(data.claims.sub),
            Ok(data) => {
                tracing::debug!(purpose = %data.claims.purpose, expected = purpose, "Token purpose mismatch");
                None
            }
            Err(e) => {
                tracing::debug!(error = ?e.kind(), "Token rejected");
                None
            }
        }
    }
}

fn seconds(secs: u64) -> Duration {
    Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX / 1000))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i32) -> User {
        User {
            id,
            username: format!("user{}", id),
            email: format!("user{}@example.com", id),
            password_hash: None,
        }
    }

    #[test]
    fn test_reset_token_roundtrip() {
        let tokens = TokenService::new("test_secret", DEFAULT_RESET_TTL_SECS);
        let token = tokens.issue_reset_token(&user(42)).unwrap();
        assert_eq!(tokens.verify_reset_token(&token), Some(42));
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = TokenService::new("test_secret", DEFAULT_RESET_TTL_SECS);
        let token = tokens
            .issue(1, RESET_PASSWORD_PURPOSE, Duration::seconds(-5))
            .unwrap();
        assert_eq!(tokens.verify_reset_token(&token), None);
    }

    #[test]
    fn test_other_secret_rejected() {
        let issuer = TokenService::new("old_secret", DEFAULT_RESET_TTL_SECS);
        let verifier = TokenService::new("new_secret", DEFAULT_RESET_TTL_SECS);
        let token = issuer.issue_reset_token(&user(1)).unwrap();
        assert_eq!(verifier.verify_reset_token(&token), None);
    }

    #[test]
    fn test_purposes_do_not_mix() {
        let tokens = TokenService::new("test_secret", DEFAULT_RESET_TTL_SECS);
        let reset = tokens.issue_reset_token(&user(1)).unwrap();
        let session = tokens.issue_session_token(1, 3600).unwrap();

        assert_eq!(tokens.verify_session_token(&reset), None);
        assert_eq!(tokens.verify_reset_token(&session), None);
        assert_eq!(tokens.verify_session_token(&session), Some(1));
    }

    #[test]
    fn test_any_corruption_rejected() {
        let tokens = TokenService::new("test_secret", DEFAULT_RESET_TTL_SECS);
        let token = tokens.issue_reset_token(&user(7)).unwrap();

        // Flip one character in every position of header, payload and signature
        for (i, c) in token.char_indices() {
            if c == '.' {
                continue;
            }
            let replacement = if c == 'A' { 'B' } else { 'A' };
            let mut corrupted = token.clone();
            corrupted.replace_range(i..i + 1, &replacement.to_string());
            assert_eq!(
                tokens.verify_reset_token(&corrupted),
                None,
                "corruption at {} accepted",
                i
            );
        }
    }

    #[test]
    fn test_garbage_rejected() {
        let tokens = TokenService::new("test_secret", DEFAULT_RESET_TTL_SECS);
        assert_eq!(tokens.verify_reset_token(""), None);
        assert_eq!(tokens.verify_reset_token("not.a.token"), None);
    }
}
