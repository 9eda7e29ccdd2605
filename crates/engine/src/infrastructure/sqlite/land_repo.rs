//! SQLite land storage.

use async_trait::async_trait;
use realmhub_domain::{Land, LandId, LandName};
use sqlx::{Row, SqlitePool};

use super::{parse_time, parse_uuid};
use crate::infrastructure::ports::{LandRepo, RepoError};

pub struct SqliteLandRepo {
    pool: SqlitePool,
}

impl SqliteLandRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LandRepo for SqliteLandRepo {
    async fn create(&self, land: &Land) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"
            INSERT INTO lands (id, name, info, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(land.id().to_string())
        .bind(land.name().as_str())
        .bind(land.info())
        .bind(land.created_at().to_rfc3339())
        .bind(land.updated_at().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("create_land", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_by_name(&self, name: &LandName) -> Result<Option<Land>, RepoError> {
        let row = sqlx::query(
            "SELECT id, name, info, created_at, updated_at FROM lands WHERE name = ?",
        )
        .bind(name.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("get_land", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = row.get("id");
        let name: String = row.get("name");
        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");

        Ok(Some(Land::from_stored(
            LandId::from_uuid(parse_uuid(&id)?),
            LandName::new(name)?,
            row.get("info"),
            parse_time(&created_at)?,
            parse_time(&updated_at)?,
        )))
    }

    async fn delete(&self, id: LandId) -> Result<bool, RepoError> {
        let id = id.to_string();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("delete_land", e))?;

        sqlx::query(
            r#"
            DELETE FROM properties
            WHERE scope = 'realm' AND scope_id IN (SELECT id FROM realms WHERE land_id = ?)
            "#,
        )
        .bind(&id)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::database("delete_land", e))?;

        sqlx::query("DELETE FROM properties WHERE scope = 'land' AND scope_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepoError::database("delete_land", e))?;

        // Realms, rosters and messages follow through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM lands WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepoError::database("delete_land", e))?;

        tx.commit()
            .await
            .map_err(|e| RepoError::database("delete_land", e))?;

        Ok(result.rows_affected() > 0)
    }
}
