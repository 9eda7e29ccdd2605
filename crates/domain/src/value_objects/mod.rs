//! Value objects: validated names, timestamps and property scopes.

mod names;
mod scope;
mod timestamp;

pub use names::{LandName, PlayerName, PropertyName, RealmName, Topic};
pub use scope::PropertyScope;
pub use timestamp::Timestamp;
