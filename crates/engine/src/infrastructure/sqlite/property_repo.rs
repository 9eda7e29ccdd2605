//! SQLite property storage.

use async_trait::async_trait;
use realmhub_domain::{PlayerName, PropertyFilter, PropertyName, PropertyRecord, PropertyScope};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::infrastructure::ports::{PropertyRepo, RepoError};

pub struct SqlitePropertyRepo {
    pool: SqlitePool,
}

impl SqlitePropertyRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PropertyRepo for SqlitePropertyRepo {
    async fn replace(
        &self,
        scope: PropertyScope,
        owner: Option<&PlayerName>,
        name: &PropertyName,
        values: &[String],
    ) -> Result<usize, RepoError> {
        let scope_id = scope.entity_id().to_string();
        let owner = owner.map(PlayerName::as_str);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("replace_property", e))?;

        // `IS` compares NULL owners as equal, unlike `=`.
        sqlx::query(
            r#"
            DELETE FROM properties
            WHERE scope = ? AND scope_id = ? AND name = ? AND player IS ?
            "#,
        )
        .bind(scope.kind())
        .bind(&scope_id)
        .bind(name.as_str())
        .bind(owner)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::database("replace_property", e))?;

        // The delete above holds the write lock, so a concurrent realm or land
        // delete has either committed already or waits for this transaction.
        let (entity, exists_sql) = match scope {
            PropertyScope::Land(_) => ("Land", "SELECT EXISTS(SELECT 1 FROM lands WHERE id = ?)"),
            PropertyScope::Realm(_) => ("Realm", "SELECT EXISTS(SELECT 1 FROM realms WHERE id = ?)"),
        };
        let exists: bool = sqlx::query_scalar(exists_sql)
            .bind(&scope_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| RepoError::database("replace_property", e))?;
        if !exists {
            return Err(RepoError::not_found(entity, &scope_id));
        }

        for value in values {
            sqlx::query(
                r#"
                INSERT INTO properties (scope, scope_id, player, name, value)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(scope.kind())
            .bind(&scope_id)
            .bind(owner)
            .bind(name.as_str())
            .bind(value)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepoError::database("replace_property", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepoError::database("replace_property", e))?;

        Ok(values.len())
    }

    async fn find(
        &self,
        scope: PropertyScope,
        filter: &PropertyFilter,
    ) -> Result<Vec<PropertyRecord>, RepoError> {
        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT player, name, value FROM properties WHERE scope = ");
        query.push_bind(scope.kind());
        query.push(" AND scope_id = ");
        query.push_bind(scope.entity_id().to_string());

        if !filter.owners.is_empty() {
            query.push(" AND player IN (");
            let mut owners = query.separated(", ");
            for owner in &filter.owners {
                owners.push_bind(owner.as_str().to_string());
            }
            owners.push_unseparated(")");
        }

        if !filter.names.is_empty() {
            query.push(" AND name IN (");
            let mut names = query.separated(", ");
            for name in &filter.names {
                names.push_bind(name.as_str().to_string());
            }
            names.push_unseparated(")");
        }

        // NULL (global) owners sort first, matching Option ordering.
        query.push(" ORDER BY player, name, id");

        // One statement reads one snapshot, so a concurrent replace is seen
        // either entirely or not at all.
        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("find_properties", e))?;

        rows.into_iter()
            .map(|row| -> Result<PropertyRecord, RepoError> {
                let owner: Option<String> = row.get("player");
                Ok(PropertyRecord {
                    owner: owner.map(PlayerName::new).transpose()?,
                    name: PropertyName::new(row.get::<String, _>("name"))?,
                    value: row.get("value"),
                })
            })
            .collect()
    }

    async fn delete_owned_by(&self, owner: &PlayerName) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM properties WHERE player = ?")
            .bind(owner.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("delete_owned_properties", e))?;
        Ok(result.rows_affected())
    }
}
