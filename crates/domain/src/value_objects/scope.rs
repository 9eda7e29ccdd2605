use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{LandId, RealmId};

/// The entity a property belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum PropertyScope {
    Land(LandId),
    Realm(RealmId),
}

impl PropertyScope {
    /// Storage discriminator for the scope kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Land(_) => "land",
            Self::Realm(_) => "realm",
        }
    }

    pub fn entity_id(&self) -> uuid::Uuid {
        match self {
            Self::Land(id) => id.to_uuid(),
            Self::Realm(id) => id.to_uuid(),
        }
    }
}

impl fmt::Display for PropertyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.entity_id())
    }
}
