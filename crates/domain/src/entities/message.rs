//! Messages on a realm's topic-partitioned bus

use serde::{Deserialize, Serialize};

use crate::{MessageId, PlayerName, RealmId, Timestamp, Topic};

/// A stored message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub realm_id: RealmId,
    pub topic: Option<Topic>,
    /// `None` once the sending player has been forgotten.
    pub sender: Option<PlayerName>,
    /// Opaque JSON text, stored exactly as published.
    pub payload: String,
    pub created: Timestamp,
}

impl Message {
    pub fn is_from(&self, player: &PlayerName) -> bool {
        self.sender.as_ref() == Some(player)
    }

    pub fn into_delivered(self) -> DeliveredMessage {
        DeliveredMessage {
            topic: self.topic,
            payload: self.payload,
        }
    }
}

/// A message as submitted by a publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub topic: Option<Topic>,
    pub payload: String,
}

/// A message as handed to a poller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveredMessage {
    pub topic: Option<Topic>,
    pub payload: String,
}
