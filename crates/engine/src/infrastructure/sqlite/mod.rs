//! SQLite-backed storage.
//!
//! One database file holds lands, realms, rosters, properties and the message
//! log. Message creation times are stored as integer microseconds so cursor
//! comparisons are plain integer comparisons.

mod connection;
mod land_repo;
mod message_repo;
mod property_repo;
mod realm_repo;

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::infrastructure::clock::MonotonicClock;
use crate::infrastructure::ports::{ClockPort, RepoError};

pub use connection::{connect, ensure_schema};
pub use land_repo::SqliteLandRepo;
pub use message_repo::SqliteMessageRepo;
pub use property_repo::SqlitePropertyRepo;
pub use realm_repo::SqliteRealmRepo;

/// All SQLite repositories sharing one pool.
pub struct SqliteRepositories {
    pub land: Arc<SqliteLandRepo>,
    pub realm: Arc<SqliteRealmRepo>,
    pub property: Arc<SqlitePropertyRepo>,
    pub message: Arc<SqliteMessageRepo>,
    pool: SqlitePool,
}

impl SqliteRepositories {
    /// Open (creating if missing) the database at `db_path` and prepare its schema.
    pub async fn open(db_path: &str, clock: Arc<dyn ClockPort>) -> Result<Self, RepoError> {
        let pool = connect(db_path).await?;
        ensure_schema(&pool).await?;
        Self::from_pool(pool, clock).await
    }

    pub async fn from_pool(pool: SqlitePool, clock: Arc<dyn ClockPort>) -> Result<Self, RepoError> {
        let ticker = Arc::new(MonotonicClock::new(clock));
        let message = Arc::new(SqliteMessageRepo::new(pool.clone(), ticker).await?);
        Ok(Self {
            land: Arc::new(SqliteLandRepo::new(pool.clone())),
            realm: Arc::new(SqliteRealmRepo::new(pool.clone())),
            property: Arc::new(SqlitePropertyRepo::new(pool.clone())),
            message,
            pool,
        })
    }

    /// Expose underlying pool for shutdown.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_time(raw: &str) -> Result<chrono::DateTime<chrono::Utc>, RepoError> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| RepoError::serialization(format!("Invalid timestamp {raw:?}: {e}")))
}

fn parse_uuid(raw: &str) -> Result<uuid::Uuid, RepoError> {
    uuid::Uuid::parse_str(raw)
        .map_err(|e| RepoError::serialization(format!("Invalid id {raw:?}: {e}")))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::ports::{LandRepo, RealmRepo};
    use chrono::{TimeZone, Utc};
    use realmhub_domain::{Land, LandName, PlayerName, Realm, RealmId, RealmName};

    /// Fresh repositories on a temp-file database. Keep the `TempDir` alive.
    pub async fn open_temp() -> (tempfile::TempDir, SqliteRepositories) {
        let temp_dir = tempfile::tempdir().expect("tempdir");
        let db_path = temp_dir.path().join("realmhub.db");
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let repos = SqliteRepositories::open(&db_path.to_string_lossy(), Arc::new(FixedClock(now)))
            .await
            .expect("open sqlite");
        (temp_dir, repos)
    }

    /// A realm named `name` inside land `arena`, creating the land on first use.
    pub async fn seeded_realm(repos: &SqliteRepositories, name: &str) -> RealmId {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let land_name = LandName::new("arena").expect("valid");
        let land = match repos.land.get_by_name(&land_name).await.expect("get land") {
            Some(land) => land,
            None => {
                let land = Land::new(land_name, "", now);
                repos.land.create(&land).await.expect("create land");
                land
            }
        };
        let host = PlayerName::new("host").expect("valid");
        let realm = Realm::new(land.id(), RealmName::new(name).expect("valid"), "", host, now);
        repos.realm.create(&realm).await.expect("create realm");
        realm.id()
    }
}
