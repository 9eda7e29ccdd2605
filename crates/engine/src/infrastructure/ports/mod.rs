//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Storage (SQLite in production, in-memory for development and tests)
//! - Clock (for testing)

mod error;
mod repos;
mod testing;

pub use error::RepoError;
pub use repos::{LandRepo, MessageRepo, PropertyRepo, RealmRepo};
pub use testing::ClockPort;

#[cfg(test)]
pub use testing::MockClockPort;
