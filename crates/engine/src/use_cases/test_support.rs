//! Fixtures for use-case tests: one land, one realm, in-memory storage.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use realmhub_domain::{Land, LandName, PlayerName, PropertyName, Realm, RealmId, RealmName};

use crate::infrastructure::clock::FixedClock;
use crate::infrastructure::config::PollConfig;
use crate::infrastructure::memory::MemoryStore;
use crate::infrastructure::notifier::PublishNotifier;
use crate::infrastructure::ports::{ClockPort, LandRepo, RealmRepo};
use crate::use_cases::access::RealmAccess;
use crate::use_cases::messages::MessageBus;
use crate::use_cases::properties::PropertyStore;

pub fn player(name: &str) -> PlayerName {
    PlayerName::new(name).expect("valid player")
}

pub fn prop(name: &str) -> PropertyName {
    PropertyName::new(name).expect("valid property")
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

/// Land `arena` holding realm `lobby`, hosted by `host`.
pub struct World {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<dyn ClockPort>,
    pub notifier: Arc<PublishNotifier>,
    pub land: LandName,
    pub realm: RealmName,
    pub realm_id: RealmId,
}

impl World {
    pub async fn new() -> Self {
        Self::with_clock(Arc::new(FixedClock(fixed_now()))).await
    }

    pub async fn with_clock(clock: Arc<dyn ClockPort>) -> Self {
        let now = fixed_now();
        let store = Arc::new(MemoryStore::new(clock.clone()));
        let land = Land::new(LandName::new("arena").expect("valid"), "", now);
        LandRepo::create(store.as_ref(), &land).await.expect("land");
        let realm = Realm::new(
            land.id(),
            RealmName::new("lobby").expect("valid"),
            "",
            player("host"),
            now,
        );
        RealmRepo::create(store.as_ref(), &realm).await.expect("realm");
        Self {
            store,
            clock,
            notifier: Arc::new(PublishNotifier::new()),
            land: land.name().clone(),
            realm: realm.name().clone(),
            realm_id: realm.id(),
        }
    }

    pub async fn join(&self, name: &str) {
        self.store
            .add_player(self.realm_id, &player(name), fixed_now())
            .await
            .expect("join");
    }

    pub fn access(&self) -> Arc<RealmAccess> {
        Arc::new(RealmAccess::new(self.store.clone(), self.store.clone()))
    }

    pub fn bus(&self) -> Arc<MessageBus> {
        Arc::new(MessageBus::new(
            self.store.clone(),
            self.notifier.clone(),
            PollConfig {
                min_interval: Duration::from_millis(10),
                max_wait: Duration::from_secs(10),
            },
        ))
    }

    pub fn property_store(&self) -> Arc<PropertyStore> {
        Arc::new(PropertyStore::new(self.store.clone()))
    }
}
