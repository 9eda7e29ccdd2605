//! Realm entity - a play session inside a land
//!
//! # Invariants
//!
//! - The host never changes after creation.
//! - The host is always a member, whether or not they appear in `players`.
//! - `players` holds each identity at most once.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::{LandId, PlayerName, RealmId, RealmName};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Realm {
    id: RealmId,
    land_id: LandId,
    name: RealmName,
    info: String,
    host: PlayerName,
    players: BTreeSet<PlayerName>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Realm {
    pub fn new(
        land_id: LandId,
        name: RealmName,
        info: impl Into<String>,
        host: PlayerName,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RealmId::new(),
            land_id,
            name,
            info: info.into(),
            host,
            players: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a realm from persisted fields.
    pub fn from_stored(
        id: RealmId,
        land_id: LandId,
        name: RealmName,
        info: String,
        host: PlayerName,
        players: BTreeSet<PlayerName>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            land_id,
            name,
            info,
            host,
            players,
            created_at,
            updated_at,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn id(&self) -> RealmId {
        self.id
    }

    #[inline]
    pub fn land_id(&self) -> LandId {
        self.land_id
    }

    #[inline]
    pub fn name(&self) -> &RealmName {
        &self.name
    }

    #[inline]
    pub fn info(&self) -> &str {
        &self.info
    }

    #[inline]
    pub fn host(&self) -> &PlayerName {
        &self.host
    }

    #[inline]
    pub fn players(&self) -> &BTreeSet<PlayerName> {
        &self.players
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // =========================================================================
    // Membership
    // =========================================================================

    pub fn is_host(&self, player: &PlayerName) -> bool {
        &self.host == player
    }

    /// True for the host and every joined player.
    pub fn is_member(&self, player: &PlayerName) -> bool {
        self.is_host(player) || self.players.contains(player)
    }

    /// Adds `player` to the roster. Returns false if already joined.
    pub fn join(&mut self, player: PlayerName, now: DateTime<Utc>) -> bool {
        let added = self.players.insert(player);
        if added {
            self.updated_at = now;
        }
        added
    }

    /// Removes `player` from the roster. Returns false if they were not joined.
    pub fn leave(&mut self, player: &PlayerName, now: DateTime<Utc>) -> Result<bool, DomainError> {
        if self.is_host(player) {
            return Err(DomainError::constraint("host cannot leave their own realm"));
        }
        let removed = self.players.remove(player);
        if removed {
            self.updated_at = now;
        }
        Ok(removed)
    }
}
