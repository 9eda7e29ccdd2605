//! Application state and composition.

use std::sync::Arc;

use crate::infrastructure::{
    config::AppConfig,
    memory::MemoryStore,
    notifier::PublishNotifier,
    ports::{ClockPort, LandRepo, MessageRepo, PropertyRepo, RealmRepo},
    sqlite::SqliteRepositories,
};
use crate::use_cases::{
    ForgetPlayer, LandOps, LandProperties, MessageBus, MessageRetention, MessageUseCases,
    PropertyStore, PropertyUseCases, RealmAccess, RealmOps, RealmProperties,
};

/// Main application state.
///
/// Holds all repositories and use cases.
/// Passed to HTTP handlers via Axum state.
pub struct App {
    pub repositories: Repositories,
    pub use_cases: UseCases,
    pub config: AppConfig,
}

/// Container for the storage ports.
pub struct Repositories {
    pub land: Arc<dyn LandRepo>,
    pub realm: Arc<dyn RealmRepo>,
    pub property: Arc<dyn PropertyRepo>,
    pub message: Arc<dyn MessageRepo>,
}

impl Repositories {
    pub fn sqlite(repos: &SqliteRepositories) -> Self {
        Self {
            land: repos.land.clone(),
            realm: repos.realm.clone(),
            property: repos.property.clone(),
            message: repos.message.clone(),
        }
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            land: store.clone(),
            realm: store.clone(),
            property: store.clone(),
            message: store,
        }
    }
}

/// Container for all use cases.
pub struct UseCases {
    pub lands: Arc<LandOps>,
    pub realms: Arc<RealmOps>,
    pub properties: PropertyUseCases,
    pub messages: Arc<MessageUseCases>,
    pub players: Arc<ForgetPlayer>,
    /// Present when a retention horizon is configured.
    pub retention: Option<Arc<MessageRetention>>,
}

impl App {
    /// Create a new App with all dependencies wired up.
    pub fn new(repositories: Repositories, clock: Arc<dyn ClockPort>, config: AppConfig) -> Self {
        let notifier = Arc::new(PublishNotifier::new());
        let access = Arc::new(RealmAccess::new(
            repositories.land.clone(),
            repositories.realm.clone(),
        ));
        let property_store = Arc::new(PropertyStore::new(repositories.property.clone()));
        let bus = Arc::new(MessageBus::new(
            repositories.message.clone(),
            notifier.clone(),
            config.poll,
        ));

        let use_cases = UseCases {
            lands: Arc::new(LandOps::new(
                repositories.land.clone(),
                repositories.realm.clone(),
                access.clone(),
                notifier.clone(),
                clock.clone(),
            )),
            realms: Arc::new(RealmOps::new(
                repositories.realm.clone(),
                access.clone(),
                notifier.clone(),
                clock.clone(),
            )),
            properties: PropertyUseCases::new(
                Arc::new(LandProperties::new(access.clone(), property_store.clone())),
                Arc::new(RealmProperties::new(access.clone(), property_store)),
            ),
            messages: Arc::new(MessageUseCases::new(access, bus.clone())),
            players: Arc::new(ForgetPlayer::new(
                repositories.realm.clone(),
                repositories.property.clone(),
                repositories.message.clone(),
                notifier,
            )),
            retention: config.retention.max_age.map(|max_age| {
                Arc::new(MessageRetention::new(
                    repositories.realm.clone(),
                    bus,
                    clock,
                    max_age,
                ))
            }),
        };

        Self {
            repositories,
            use_cases,
            config,
        }
    }
}
