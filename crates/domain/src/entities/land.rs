//! Land entity - a top-level game/world namespace

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{LandId, LandName};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Land {
    id: LandId,
    name: LandName,
    info: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Land {
    pub fn new(name: LandName, info: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: LandId::new(),
            name,
            info: info.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a land from persisted fields.
    pub fn from_stored(
        id: LandId,
        name: LandName,
        info: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            info,
            created_at,
            updated_at,
        }
    }

    #[inline]
    pub fn id(&self) -> LandId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &LandName {
        &self.name
    }

    #[inline]
    pub fn info(&self) -> &str {
        &self.info
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
