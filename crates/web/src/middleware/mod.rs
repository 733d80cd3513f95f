//! Middleware and request extractors

pub mod metrics;
pub mod negotiate;
pub mod session;

pub use session::{CurrentUser, MaybeUser};
