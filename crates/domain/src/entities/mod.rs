//! Domain entities.

mod land;
mod message;
mod property;
mod realm;

pub use land::Land;
pub use message::{DeliveredMessage, Message, NewMessage};
pub use property::{PropertyFilter, PropertyRecord};
pub use realm::Realm;
