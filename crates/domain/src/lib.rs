//! Realmhub domain types.
//!
//! A land is a top-level namespace holding named realms. Each realm has a host,
//! a roster of joined players, a scoped property store and a topic-partitioned
//! message log.

pub mod entities;
pub mod error;
pub mod ids;
pub mod value_objects;

pub use entities::{
    DeliveredMessage, Land, Message, NewMessage, PropertyFilter, PropertyRecord, Realm,
};
pub use error::DomainError;
pub use ids::{LandId, MessageId, RealmId};
pub use value_objects::{
    LandName, PlayerName, PropertyName, PropertyScope, RealmName, Timestamp, Topic,
};
