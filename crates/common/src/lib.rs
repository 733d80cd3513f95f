//! Synthese Common Library
//!
//! Shared code for the Synthese web application including:
//! - Database models and per-entity repositories
//! - Error types and handling
//! - Configuration management
//! - Authentication (passwords, credential store, signed tokens)
//! - Mail transport
//! - Metrics

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod mail;
pub mod metrics;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use mail::Mailer;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
