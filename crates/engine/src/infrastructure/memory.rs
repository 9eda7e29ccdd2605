//! In-memory store for development and testing
//!
//! Every repository port is implemented over one shared state guarded by a
//! single `RwLock`, which makes cascades and multi-row replaces trivially
//! atomic. Nothing is persisted.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use realmhub_domain::{
    Land, LandId, LandName, Message, MessageId, PlayerName, PropertyFilter, PropertyName,
    PropertyRecord, PropertyScope, Realm, RealmId, RealmName, Timestamp, Topic,
};
use tokio::sync::RwLock;

use crate::infrastructure::clock::MonotonicClock;
use crate::infrastructure::ports::{
    ClockPort, LandRepo, MessageRepo, PropertyRepo, RealmRepo, RepoError,
};

type PropertyKey = (PropertyScope, Option<PlayerName>, PropertyName);

#[derive(Default)]
struct MemoryState {
    lands: BTreeMap<LandId, Land>,
    realms: BTreeMap<RealmId, Realm>,
    properties: BTreeMap<PropertyKey, Vec<String>>,
    /// Per-realm log in append order, which is also (created, id) order.
    messages: HashMap<RealmId, Vec<Message>>,
    next_message_id: i64,
}

impl MemoryState {
    fn drop_realm(&mut self, id: RealmId) -> bool {
        self.properties
            .retain(|(scope, _, _), _| *scope != PropertyScope::Realm(id));
        self.messages.remove(&id);
        self.realms.remove(&id).is_some()
    }
}

/// In-memory implementation of every storage port.
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
    clock: MonotonicClock,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn ClockPort>) -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState::default())),
            clock: MonotonicClock::new(clock),
        }
    }
}

#[async_trait]
impl LandRepo for MemoryStore {
    async fn create(&self, land: &Land) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        if state.lands.values().any(|l| l.name() == land.name()) {
            return Ok(false);
        }
        state.lands.insert(land.id(), land.clone());
        Ok(true)
    }

    async fn get_by_name(&self, name: &LandName) -> Result<Option<Land>, RepoError> {
        let state = self.state.read().await;
        Ok(state.lands.values().find(|l| l.name() == name).cloned())
    }

    async fn delete(&self, id: LandId) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        if state.lands.remove(&id).is_none() {
            return Ok(false);
        }
        let realms: Vec<RealmId> = state
            .realms
            .values()
            .filter(|r| r.land_id() == id)
            .map(|r| r.id())
            .collect();
        for realm in realms {
            state.drop_realm(realm);
        }
        state
            .properties
            .retain(|(scope, _, _), _| *scope != PropertyScope::Land(id));
        Ok(true)
    }
}

#[async_trait]
impl RealmRepo for MemoryStore {
    async fn create(&self, realm: &Realm) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        if !state.lands.contains_key(&realm.land_id()) {
            return Err(RepoError::not_found("Land", realm.land_id()));
        }
        let taken = state
            .realms
            .values()
            .any(|r| r.land_id() == realm.land_id() && r.name() == realm.name());
        if taken {
            return Ok(false);
        }
        state.realms.insert(realm.id(), realm.clone());
        Ok(true)
    }

    async fn get_by_name(
        &self,
        land_id: LandId,
        name: &RealmName,
    ) -> Result<Option<Realm>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .realms
            .values()
            .find(|r| r.land_id() == land_id && r.name() == name)
            .cloned())
    }

    async fn list_names_in_land(&self, land_id: LandId) -> Result<Vec<RealmName>, RepoError> {
        let state = self.state.read().await;
        let mut names: Vec<RealmName> = state
            .realms
            .values()
            .filter(|r| r.land_id() == land_id)
            .map(|r| r.name().clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn list_ids(&self) -> Result<Vec<RealmId>, RepoError> {
        Ok(self.state.read().await.realms.keys().copied().collect())
    }

    async fn list_hosted_by(&self, host: &PlayerName) -> Result<Vec<RealmId>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .realms
            .values()
            .filter(|r| r.is_host(host))
            .map(|r| r.id())
            .collect())
    }

    async fn add_player(
        &self,
        realm_id: RealmId,
        player: &PlayerName,
        now: DateTime<Utc>,
    ) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        let realm = state
            .realms
            .get_mut(&realm_id)
            .ok_or_else(|| RepoError::not_found("Realm", realm_id))?;
        Ok(realm.join(player.clone(), now))
    }

    async fn remove_player(
        &self,
        realm_id: RealmId,
        player: &PlayerName,
        now: DateTime<Utc>,
    ) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        let realm = state
            .realms
            .get_mut(&realm_id)
            .ok_or_else(|| RepoError::not_found("Realm", realm_id))?;
        realm
            .leave(player, now)
            .map_err(RepoError::constraint)
    }

    async fn remove_player_everywhere(&self, player: &PlayerName) -> Result<u64, RepoError> {
        let mut state = self.state.write().await;
        let mut changed = 0;
        for realm in state.realms.values_mut() {
            if !realm.is_host(player) && realm.players().contains(player) {
                let updated_at = realm.updated_at();
                realm
                    .leave(player, updated_at)
                    .map_err(RepoError::constraint)?;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete(&self, id: RealmId) -> Result<bool, RepoError> {
        Ok(self.state.write().await.drop_realm(id))
    }
}

#[async_trait]
impl PropertyRepo for MemoryStore {
    async fn replace(
        &self,
        scope: PropertyScope,
        owner: Option<&PlayerName>,
        name: &PropertyName,
        values: &[String],
    ) -> Result<usize, RepoError> {
        let key = (scope, owner.cloned(), name.clone());
        let mut state = self.state.write().await;
        match scope {
            PropertyScope::Land(id) if !state.lands.contains_key(&id) => {
                return Err(RepoError::not_found("Land", id));
            }
            PropertyScope::Realm(id) if !state.realms.contains_key(&id) => {
                return Err(RepoError::not_found("Realm", id));
            }
            _ => {}
        }
        if values.is_empty() {
            state.properties.remove(&key);
        } else {
            state.properties.insert(key, values.to_vec());
        }
        Ok(values.len())
    }

    async fn find(
        &self,
        scope: PropertyScope,
        filter: &PropertyFilter,
    ) -> Result<Vec<PropertyRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .properties
            .iter()
            .filter(|((s, owner, name), _)| *s == scope && filter.matches(owner.as_ref(), name))
            .flat_map(|((_, owner, name), values)| {
                values.iter().map(move |value| PropertyRecord {
                    owner: owner.clone(),
                    name: name.clone(),
                    value: value.clone(),
                })
            })
            .collect())
    }

    async fn delete_owned_by(&self, owner: &PlayerName) -> Result<u64, RepoError> {
        let mut state = self.state.write().await;
        let mut deleted = 0u64;
        state.properties.retain(|(_, o, _), values| {
            let owned = o.as_ref() == Some(owner);
            if owned {
                deleted += values.len() as u64;
            }
            !owned
        });
        Ok(deleted)
    }
}

#[async_trait]
impl MessageRepo for MemoryStore {
    async fn append(
        &self,
        realm_id: RealmId,
        sender: Option<&PlayerName>,
        topic: Option<&Topic>,
        payload: &str,
    ) -> Result<Message, RepoError> {
        let mut state = self.state.write().await;
        if !state.realms.contains_key(&realm_id) {
            return Err(RepoError::not_found("Realm", realm_id));
        }
        state.next_message_id += 1;
        let message = Message {
            id: MessageId::new(state.next_message_id),
            realm_id,
            topic: topic.cloned(),
            sender: sender.cloned(),
            payload: payload.to_string(),
            created: self.clock.tick(),
        };
        state
            .messages
            .entry(realm_id)
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn fetch_since(
        &self,
        realm_id: RealmId,
        topic: Option<&Topic>,
        since: Timestamp,
    ) -> Result<Vec<Message>, RepoError> {
        let state = self.state.read().await;
        let Some(log) = state.messages.get(&realm_id) else {
            return Ok(Vec::new());
        };
        let start = log.partition_point(|m| m.created <= since);
        Ok(log[start..]
            .iter()
            .filter(|m| m.topic.as_ref() == topic)
            .cloned()
            .collect())
    }

    async fn delete_before(
        &self,
        realm_id: RealmId,
        cutoff: Option<Timestamp>,
    ) -> Result<u64, RepoError> {
        let mut state = self.state.write().await;
        let Some(log) = state.messages.get_mut(&realm_id) else {
            return Ok(0);
        };
        let end = match cutoff {
            Some(cutoff) => log.partition_point(|m| m.created < cutoff),
            None => log.len(),
        };
        log.drain(..end);
        Ok(end as u64)
    }

    async fn detach_sender(&self, sender: &PlayerName) -> Result<u64, RepoError> {
        let mut state = self.state.write().await;
        let mut detached = 0;
        for message in state.messages.values_mut().flatten() {
            if message.is_from(sender) {
                message.sender = None;
                detached += 1;
            }
        }
        Ok(detached)
    }
}
