//! Land use cases.

use std::sync::Arc;

use realmhub_domain::{Land, LandName, RealmName};

use crate::infrastructure::notifier::PublishNotifier;
use crate::infrastructure::ports::{ClockPort, LandRepo, RealmRepo, RepoError};
use crate::use_cases::access::{AccessError, RealmAccess};
use crate::use_cases::CreateOutcome;

/// A land together with the names of its realms.
#[derive(Debug, Clone)]
pub struct LandInfo {
    pub land: Land,
    pub realms: Vec<RealmName>,
}

pub struct LandOps {
    lands: Arc<dyn LandRepo>,
    realms: Arc<dyn RealmRepo>,
    access: Arc<RealmAccess>,
    notifier: Arc<PublishNotifier>,
    clock: Arc<dyn ClockPort>,
}

impl LandOps {
    pub fn new(
        lands: Arc<dyn LandRepo>,
        realms: Arc<dyn RealmRepo>,
        access: Arc<RealmAccess>,
        notifier: Arc<PublishNotifier>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            lands,
            realms,
            access,
            notifier,
            clock,
        }
    }

    pub async fn create(
        &self,
        name: LandName,
        info: String,
    ) -> Result<CreateOutcome<Land>, LandError> {
        let land = Land::new(name, info, self.clock.now());
        if !self.lands.create(&land).await? {
            tracing::debug!(land = %land.name(), "Land already exists");
            return Ok(CreateOutcome::AlreadyExists);
        }
        tracing::info!(land = %land.name(), "Land created");
        Ok(CreateOutcome::Created(land))
    }

    pub async fn get(&self, name: &LandName) -> Result<LandInfo, LandError> {
        let land = self.access.land(name).await?;
        let realms = self.realms.list_names_in_land(land.id()).await?;
        Ok(LandInfo { land, realms })
    }

    /// Delete the land and everything inside it.
    pub async fn delete(&self, name: &LandName) -> Result<(), LandError> {
        let land = self.access.land(name).await?;
        let mut realm_ids = Vec::new();
        for realm in self.realms.list_names_in_land(land.id()).await? {
            if let Some(realm) = self.realms.get_by_name(land.id(), &realm).await? {
                realm_ids.push(realm.id());
            }
        }
        if !self.lands.delete(land.id()).await? {
            return Err(AccessError::LandNotFound(name.clone()).into());
        }
        for realm_id in realm_ids {
            self.notifier.forget(realm_id);
        }
        tracing::info!(land = %name, "Land deleted");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LandError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}
