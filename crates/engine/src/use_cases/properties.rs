//! Property use cases - scoped key/value state for lands and realms.

use std::collections::BTreeSet;
use std::sync::Arc;

use realmhub_domain::{
    LandName, PlayerName, PropertyFilter, PropertyName, PropertyRecord, PropertyScope, RealmName,
};

use crate::infrastructure::keyed_lock::KeyedLocks;
use crate::infrastructure::ports::{PropertyRepo, RepoError};
use crate::use_cases::access::{AccessError, RealmAccess};

type PropertyKey = (PropertyScope, Option<PlayerName>, PropertyName);

/// Container for property use cases.
pub struct PropertyUseCases {
    pub land: Arc<LandProperties>,
    pub realm: Arc<RealmProperties>,
}

impl PropertyUseCases {
    pub fn new(land: Arc<LandProperties>, realm: Arc<RealmProperties>) -> Self {
        Self { land, realm }
    }
}

/// Replace-and-read over the property repository.
///
/// Writers of the same (scope, owner, name) key are serialized here; the
/// repository makes each replace atomic for readers.
pub struct PropertyStore {
    repo: Arc<dyn PropertyRepo>,
    locks: KeyedLocks<PropertyKey>,
}

impl PropertyStore {
    pub fn new(repo: Arc<dyn PropertyRepo>) -> Self {
        Self {
            repo,
            locks: KeyedLocks::new(),
        }
    }

    /// Replace the values of one key. An empty `values` deletes it.
    pub async fn set(
        &self,
        scope: PropertyScope,
        owner: Option<&PlayerName>,
        name: &PropertyName,
        values: &[String],
    ) -> Result<usize, RepoError> {
        let key = (scope, owner.cloned(), name.clone());
        let _guard = self.locks.lock(&key).await;
        self.repo.replace(scope, owner, name, values).await
    }

    /// Replace `name` for each distinct owner in turn, or the global key when
    /// `owners` is empty. Each owner's replace is atomic; the batch is not.
    pub async fn set_for_owners(
        &self,
        scope: PropertyScope,
        owners: &[PlayerName],
        name: &PropertyName,
        values: &[String],
    ) -> Result<usize, RepoError> {
        if owners.is_empty() {
            return self.set(scope, None, name, values).await;
        }
        let distinct: BTreeSet<&PlayerName> = owners.iter().collect();
        let mut written = 0;
        for owner in distinct {
            written += self.set(scope, Some(owner), name, values).await?;
        }
        Ok(written)
    }

    pub async fn get(
        &self,
        scope: PropertyScope,
        filter: &PropertyFilter,
    ) -> Result<Vec<PropertyRecord>, RepoError> {
        self.repo.find(scope, filter).await
    }
}

/// Properties of a land. Any identified caller may read and write them.
pub struct LandProperties {
    access: Arc<RealmAccess>,
    store: Arc<PropertyStore>,
}

impl LandProperties {
    pub fn new(access: Arc<RealmAccess>, store: Arc<PropertyStore>) -> Self {
        Self { access, store }
    }

    pub async fn get(
        &self,
        land: &LandName,
        filter: &PropertyFilter,
    ) -> Result<Vec<PropertyRecord>, PropertyError> {
        let land = self.access.land(land).await?;
        Ok(self.store.get(PropertyScope::Land(land.id()), filter).await?)
    }

    pub async fn set(
        &self,
        land: &LandName,
        name: &PropertyName,
        owners: &[PlayerName],
        values: &[String],
    ) -> Result<usize, PropertyError> {
        let land = self.access.land(land).await?;
        let written = self
            .store
            .set_for_owners(PropertyScope::Land(land.id()), owners, name, values)
            .await?;
        tracing::debug!(land = %land.name(), property = %name, written, "Land property set");
        Ok(written)
    }
}

/// Properties of a realm, restricted to its members.
pub struct RealmProperties {
    access: Arc<RealmAccess>,
    store: Arc<PropertyStore>,
}

impl RealmProperties {
    pub fn new(access: Arc<RealmAccess>, store: Arc<PropertyStore>) -> Self {
        Self { access, store }
    }

    pub async fn get(
        &self,
        land: &LandName,
        realm: &RealmName,
        caller: &PlayerName,
        filter: &PropertyFilter,
    ) -> Result<Vec<PropertyRecord>, PropertyError> {
        let realm = self.access.member(land, realm, caller).await?;
        Ok(self.store.get(PropertyScope::Realm(realm.id()), filter).await?)
    }

    /// Every owner must be a member of the realm.
    pub async fn set(
        &self,
        land: &LandName,
        realm: &RealmName,
        caller: &PlayerName,
        name: &PropertyName,
        owners: &[PlayerName],
        values: &[String],
    ) -> Result<usize, PropertyError> {
        let realm = self.access.member(land, realm, caller).await?;
        if let Some(stranger) = owners.iter().find(|o| !realm.is_member(o)) {
            return Err(PropertyError::UnknownPlayer(stranger.clone()));
        }
        let written = self
            .store
            .set_for_owners(PropertyScope::Realm(realm.id()), owners, name, values)
            .await?;
        tracing::debug!(realm = %realm.name(), property = %name, written, "Realm property set");
        Ok(written)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PropertyError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("Player not found in realm: {0}")]
    UnknownPlayer(PlayerName),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}
