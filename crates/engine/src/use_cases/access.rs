//! Land/realm resolution and membership checks shared by every realm use case.

use std::sync::Arc;

use realmhub_domain::{Land, LandName, PlayerName, Realm, RealmName};

use crate::infrastructure::ports::{LandRepo, RealmRepo, RepoError};

/// Resolves path names to stored entities and enforces who may touch a realm.
pub struct RealmAccess {
    lands: Arc<dyn LandRepo>,
    realms: Arc<dyn RealmRepo>,
}

impl RealmAccess {
    pub fn new(lands: Arc<dyn LandRepo>, realms: Arc<dyn RealmRepo>) -> Self {
        Self { lands, realms }
    }

    pub async fn land(&self, name: &LandName) -> Result<Land, AccessError> {
        self.lands
            .get_by_name(name)
            .await?
            .ok_or_else(|| AccessError::LandNotFound(name.clone()))
    }

    pub async fn realm(&self, land: &LandName, name: &RealmName) -> Result<Realm, AccessError> {
        let land = self.land(land).await?;
        self.realms
            .get_by_name(land.id(), name)
            .await?
            .ok_or_else(|| AccessError::RealmNotFound {
                land: land.name().clone(),
                realm: name.clone(),
            })
    }

    /// The realm, provided `caller` is its host or a joined player.
    pub async fn member(
        &self,
        land: &LandName,
        name: &RealmName,
        caller: &PlayerName,
    ) -> Result<Realm, AccessError> {
        let realm = self.realm(land, name).await?;
        if !realm.is_member(caller) {
            return Err(AccessError::NotMember {
                player: caller.clone(),
                realm: realm.name().clone(),
            });
        }
        Ok(realm)
    }

    /// The realm, provided `caller` is its host.
    pub async fn host(
        &self,
        land: &LandName,
        name: &RealmName,
        caller: &PlayerName,
    ) -> Result<Realm, AccessError> {
        let realm = self.realm(land, name).await?;
        if !realm.is_host(caller) {
            return Err(AccessError::NotHost {
                player: caller.clone(),
                realm: realm.name().clone(),
            });
        }
        Ok(realm)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("Land not found: {0}")]
    LandNotFound(LandName),
    #[error("Realm not found: {land}/{realm}")]
    RealmNotFound { land: LandName, realm: RealmName },
    #[error("{player} is not a member of realm {realm}")]
    NotMember { player: PlayerName, realm: RealmName },
    #[error("{player} is not the host of realm {realm}")]
    NotHost { player: PlayerName, realm: RealmName },
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}
