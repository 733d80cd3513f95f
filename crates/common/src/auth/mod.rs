//! Authentication utilities
//!
//! Provides:
//! - Argon2 password hashing
//! - The credential store (set / check / authenticate)
//! - Signed, time-limited tokens for password reset and login sessions

mod credentials;
pub mod password;
mod tokens;

pub use credentials::CredentialStore;
pub use tokens::{
    TokenClaims, TokenService, DEFAULT_RESET_TTL_SECS, RESET_PASSWORD_PURPOSE, SESSION_PURPOSE,
};
