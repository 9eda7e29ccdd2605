//! RealmHub Engine library.
//!
//! Server-side state for multiplayer game sessions: lands, realms, scoped
//! properties, and a long-polled message bus.
//!
//! ## Structure
//!
//! - `use_cases/` - Request orchestration over the storage ports
//! - `infrastructure/` - Ports, storage adapters, configuration
//! - `api/` - HTTP entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod use_cases;

pub use app::App;
