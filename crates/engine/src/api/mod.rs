//! API layer - HTTP entry points.

pub mod auth;
pub mod error;
pub mod http;

pub use auth::Caller;
pub use error::ApiError;
