//! SQLite realm and roster storage.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use realmhub_domain::{LandId, PlayerName, Realm, RealmId, RealmName};
use sqlx::{Row, SqlitePool};

use super::{parse_time, parse_uuid};
use crate::infrastructure::ports::{RealmRepo, RepoError};

pub struct SqliteRealmRepo {
    pool: SqlitePool,
}

impl SqliteRealmRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn players_of(&self, realm_id: &str) -> Result<BTreeSet<PlayerName>, RepoError> {
        let rows = sqlx::query("SELECT player FROM realm_players WHERE realm_id = ?")
            .bind(realm_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("list_realm_players", e))?;

        rows.into_iter()
            .map(|row| PlayerName::new(row.get::<String, _>("player")).map_err(RepoError::from))
            .collect()
    }

    async fn touch(&self, realm_id: RealmId, now: DateTime<Utc>) -> Result<(), RepoError> {
        sqlx::query("UPDATE realms SET updated_at = ? WHERE id = ?")
            .bind(now.to_rfc3339())
            .bind(realm_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("touch_realm", e))?;
        Ok(())
    }
}

#[async_trait]
impl RealmRepo for SqliteRealmRepo {
    async fn create(&self, realm: &Realm) -> Result<bool, RepoError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("create_realm", e))?;

        let result = sqlx::query(
            r#"
            INSERT INTO realms (id, land_id, name, info, host, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(land_id, name) DO NOTHING
            "#,
        )
        .bind(realm.id().to_string())
        .bind(realm.land_id().to_string())
        .bind(realm.name().as_str())
        .bind(realm.info())
        .bind(realm.host().as_str())
        .bind(realm.created_at().to_rfc3339())
        .bind(realm.updated_at().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::database("create_realm", e))?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        for player in realm.players() {
            sqlx::query("INSERT INTO realm_players (realm_id, player) VALUES (?, ?)")
                .bind(realm.id().to_string())
                .bind(player.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| RepoError::database("create_realm", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepoError::database("create_realm", e))?;
        Ok(true)
    }

    async fn get_by_name(
        &self,
        land_id: LandId,
        name: &RealmName,
    ) -> Result<Option<Realm>, RepoError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, info, host, created_at, updated_at
            FROM realms
            WHERE land_id = ? AND name = ?
            "#,
        )
        .bind(land_id.to_string())
        .bind(name.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("get_realm", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = row.get("id");
        let name: String = row.get("name");
        let host: String = row.get("host");
        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");
        let players = self.players_of(&id).await?;

        Ok(Some(Realm::from_stored(
            RealmId::from_uuid(parse_uuid(&id)?),
            land_id,
            RealmName::new(name)?,
            row.get("info"),
            PlayerName::new(host)?,
            players,
            parse_time(&created_at)?,
            parse_time(&updated_at)?,
        )))
    }

    async fn list_names_in_land(&self, land_id: LandId) -> Result<Vec<RealmName>, RepoError> {
        let rows = sqlx::query("SELECT name FROM realms WHERE land_id = ? ORDER BY name")
            .bind(land_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("list_realms", e))?;

        rows.into_iter()
            .map(|row| RealmName::new(row.get::<String, _>("name")).map_err(RepoError::from))
            .collect()
    }

    async fn list_ids(&self) -> Result<Vec<RealmId>, RepoError> {
        let rows = sqlx::query("SELECT id FROM realms")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("list_realm_ids", e))?;

        rows.into_iter()
            .map(|row| parse_uuid(&row.get::<String, _>("id")).map(RealmId::from_uuid))
            .collect()
    }

    async fn list_hosted_by(&self, host: &PlayerName) -> Result<Vec<RealmId>, RepoError> {
        let rows = sqlx::query("SELECT id FROM realms WHERE host = ?")
            .bind(host.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("list_hosted_realms", e))?;

        rows.into_iter()
            .map(|row| parse_uuid(&row.get::<String, _>("id")).map(RealmId::from_uuid))
            .collect()
    }

    async fn add_player(
        &self,
        realm_id: RealmId,
        player: &PlayerName,
        now: DateTime<Utc>,
    ) -> Result<bool, RepoError> {
        let result =
            sqlx::query("INSERT OR IGNORE INTO realm_players (realm_id, player) VALUES (?, ?)")
                .bind(realm_id.to_string())
                .bind(player.as_str())
                .execute(&self.pool)
                .await
                .map_err(|e| RepoError::database("join_realm", e))?;

        let added = result.rows_affected() > 0;
        if added {
            self.touch(realm_id, now).await?;
        }
        Ok(added)
    }

    async fn remove_player(
        &self,
        realm_id: RealmId,
        player: &PlayerName,
        now: DateTime<Utc>,
    ) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM realm_players WHERE realm_id = ? AND player = ?")
            .bind(realm_id.to_string())
            .bind(player.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("leave_realm", e))?;

        let removed = result.rows_affected() > 0;
        if removed {
            self.touch(realm_id, now).await?;
        }
        Ok(removed)
    }

    async fn remove_player_everywhere(&self, player: &PlayerName) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM realm_players WHERE player = ?")
            .bind(player.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("remove_player_everywhere", e))?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: RealmId) -> Result<bool, RepoError> {
        let id = id.to_string();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("delete_realm", e))?;

        sqlx::query("DELETE FROM properties WHERE scope = 'realm' AND scope_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepoError::database("delete_realm", e))?;

        // Roster and messages follow through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM realms WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepoError::database("delete_realm", e))?;

        tx.commit()
            .await
            .map_err(|e| RepoError::database("delete_realm", e))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::open_temp;
    use super::*;
    use crate::infrastructure::ports::LandRepo;
    use chrono::TimeZone;
    use realmhub_domain::{Land, LandName};

    fn player(name: &str) -> PlayerName {
        PlayerName::new(name).expect("valid player")
    }

    async fn seeded_land(repos: &super::super::SqliteRepositories) -> Land {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let land = Land::new(LandName::new("arena").expect("valid"), "", now);
        repos.land.create(&land).await.expect("create land");
        land
    }

    #[tokio::test]
    async fn realm_names_are_unique_per_land() {
        let (_dir, repos) = open_temp().await;
        let land = seeded_land(&repos).await;
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let name = RealmName::new("lobby").expect("valid");

        let first = Realm::new(land.id(), name.clone(), "", player("host"), now);
        let second = Realm::new(land.id(), name.clone(), "", player("other"), now);

        assert!(repos.realm.create(&first).await.expect("create"));
        assert!(!repos.realm.create(&second).await.expect("create dup"));

        let loaded = repos
            .realm
            .get_by_name(land.id(), &name)
            .await
            .expect("get")
            .expect("present");
        assert_eq!(loaded.host(), &player("host"));
    }

    #[tokio::test]
    async fn roster_changes_persist() {
        let (_dir, repos) = open_temp().await;
        let land = seeded_land(&repos).await;
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let later = Utc.timestamp_opt(1_700_000_100, 0).unwrap();
        let realm = Realm::new(land.id(), RealmName::new("lobby").expect("valid"), "", player("host"), now);
        repos.realm.create(&realm).await.expect("create");

        assert!(repos.realm.add_player(realm.id(), &player("alice"), later).await.expect("join"));
        assert!(!repos.realm.add_player(realm.id(), &player("alice"), later).await.expect("rejoin"));
        assert!(repos.realm.add_player(realm.id(), &player("bob"), later).await.expect("join"));
        assert!(repos.realm.remove_player(realm.id(), &player("bob"), later).await.expect("leave"));

        let loaded = repos
            .realm
            .get_by_name(land.id(), realm.name())
            .await
            .expect("get")
            .expect("present");
        assert_eq!(loaded.players().iter().collect::<Vec<_>>(), vec![&player("alice")]);
        assert_eq!(loaded.updated_at(), later);
    }

    #[tokio::test]
    async fn deleting_land_cascades_to_realms() {
        let (_dir, repos) = open_temp().await;
        let land = seeded_land(&repos).await;
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let realm = Realm::new(land.id(), RealmName::new("lobby").expect("valid"), "", player("host"), now);
        repos.realm.create(&realm).await.expect("create");

        assert!(repos.land.delete(land.id()).await.expect("delete land"));

        assert!(repos.realm.list_ids().await.expect("list").is_empty());
    }
}
