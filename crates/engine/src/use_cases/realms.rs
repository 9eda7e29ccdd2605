//! Realm use cases - lifecycle and membership.

use std::sync::Arc;

use realmhub_domain::{LandName, PlayerName, Realm, RealmName};

use crate::infrastructure::notifier::PublishNotifier;
use crate::infrastructure::ports::{ClockPort, RealmRepo, RepoError};
use crate::use_cases::access::{AccessError, RealmAccess};
use crate::use_cases::CreateOutcome;

pub struct RealmOps {
    realms: Arc<dyn RealmRepo>,
    access: Arc<RealmAccess>,
    notifier: Arc<PublishNotifier>,
    clock: Arc<dyn ClockPort>,
}

impl RealmOps {
    pub fn new(
        realms: Arc<dyn RealmRepo>,
        access: Arc<RealmAccess>,
        notifier: Arc<PublishNotifier>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            realms,
            access,
            notifier,
            clock,
        }
    }

    /// Create a realm hosted by `host`.
    pub async fn create(
        &self,
        land: &LandName,
        name: RealmName,
        info: String,
        host: PlayerName,
    ) -> Result<CreateOutcome<Realm>, RealmError> {
        let land = self.access.land(land).await?;
        let realm = Realm::new(land.id(), name, info, host, self.clock.now());
        if !self.realms.create(&realm).await? {
            tracing::debug!(land = %land.name(), realm = %realm.name(), "Realm already exists");
            return Ok(CreateOutcome::AlreadyExists);
        }
        tracing::info!(
            land = %land.name(),
            realm = %realm.name(),
            host = %realm.host(),
            "Realm created"
        );
        Ok(CreateOutcome::Created(realm))
    }

    pub async fn get(&self, land: &LandName, name: &RealmName) -> Result<Realm, RealmError> {
        Ok(self.access.realm(land, name).await?)
    }

    /// Add `player` to the roster. Joining twice, or joining as host, changes nothing.
    pub async fn join(
        &self,
        land: &LandName,
        name: &RealmName,
        player: &PlayerName,
    ) -> Result<Realm, RealmError> {
        let realm = self.access.realm(land, name).await?;
        if realm.is_member(player) {
            return Ok(realm);
        }
        self.realms
            .add_player(realm.id(), player, self.clock.now())
            .await?;
        tracing::debug!(realm = %realm.name(), player = %player, "Player joined realm");
        self.get(land, name).await
    }

    /// Remove `player` from the roster. The host cannot leave.
    pub async fn leave(
        &self,
        land: &LandName,
        name: &RealmName,
        player: &PlayerName,
    ) -> Result<Realm, RealmError> {
        let realm = self.access.realm(land, name).await?;
        if realm.is_host(player) {
            return Err(RealmError::HostCannotLeave(realm.name().clone()));
        }
        if self
            .realms
            .remove_player(realm.id(), player, self.clock.now())
            .await?
        {
            tracing::debug!(realm = %realm.name(), player = %player, "Player left realm");
        }
        self.get(land, name).await
    }

    /// Host only. Removes the realm with its properties and messages.
    pub async fn delete(
        &self,
        land: &LandName,
        name: &RealmName,
        caller: &PlayerName,
    ) -> Result<(), RealmError> {
        let realm = self.access.host(land, name, caller).await?;
        self.realms.delete(realm.id()).await?;
        self.notifier.forget(realm.id());
        tracing::info!(land = %land, realm = %name, "Realm deleted");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RealmError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("The host cannot leave realm {0}")]
    HostCannotLeave(RealmName),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}
