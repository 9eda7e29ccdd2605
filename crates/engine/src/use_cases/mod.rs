//! Use cases - request orchestration over the storage ports.
//!
//! Each module covers one area of the API. Realm-scoped operations resolve
//! names and check membership through [`access::RealmAccess`] first.

pub mod access;
pub mod lands;
pub mod messages;
pub mod players;
pub mod properties;
pub mod realms;
pub mod retention;

#[cfg(test)]
pub(crate) mod test_support;

pub use access::{AccessError, RealmAccess};
pub use lands::{LandError, LandInfo, LandOps};
pub use messages::{MessageBus, MessageError, MessageUseCases, PollOutcome, ReceiveOptions};
pub use players::{ForgetPlayer, ForgetReport, PlayerError};
pub use properties::{LandProperties, PropertyError, PropertyStore, PropertyUseCases, RealmProperties};
pub use realms::{RealmError, RealmOps};
pub use retention::MessageRetention;

/// Result of a create call. A name clash is an ordinary outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome<T> {
    Created(T),
    AlreadyExists,
}
