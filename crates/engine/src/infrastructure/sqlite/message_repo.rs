//! SQLite message log.

use std::sync::Arc;

use async_trait::async_trait;
use realmhub_domain::{Message, MessageId, PlayerName, RealmId, Timestamp, Topic};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::parse_uuid;
use crate::infrastructure::clock::MonotonicClock;
use crate::infrastructure::keyed_lock::KeyedLocks;
use crate::infrastructure::ports::{MessageRepo, RepoError};

/// Append-only message log.
///
/// Stamping and inserting happen under a per-(realm, topic) lock, so within a
/// partition ids and creation times increase together and a poller that has
/// seen time `t` can never later find an older row appear.
pub struct SqliteMessageRepo {
    pool: SqlitePool,
    clock: Arc<MonotonicClock>,
    partitions: KeyedLocks<(RealmId, Option<Topic>)>,
}

impl SqliteMessageRepo {
    /// Seeds the clock from the newest stored message so stamps keep
    /// increasing across restarts.
    pub async fn new(pool: SqlitePool, clock: Arc<MonotonicClock>) -> Result<Self, RepoError> {
        let newest: Option<i64> = sqlx::query_scalar("SELECT MAX(created_us) FROM messages")
            .fetch_one(&pool)
            .await
            .map_err(|e| RepoError::database("seed_message_clock", e))?;

        if let Some(micros) = newest {
            clock.observe(Timestamp::from_micros(micros)?);
        }

        Ok(Self {
            pool,
            clock,
            partitions: KeyedLocks::new(),
        })
    }

    fn row_to_message(row: &SqliteRow) -> Result<Message, RepoError> {
        let realm_id: String = row.get("realm_id");
        let sender: Option<String> = row.get("player");
        let topic: Option<String> = row.get("topic");
        Ok(Message {
            id: MessageId::new(row.get("id")),
            realm_id: RealmId::from_uuid(parse_uuid(&realm_id)?),
            topic: topic.map(Topic::new).transpose()?,
            sender: sender.map(PlayerName::new).transpose()?,
            payload: row.get("payload"),
            created: Timestamp::from_micros(row.get("created_us"))?,
        })
    }
}

#[async_trait]
impl MessageRepo for SqliteMessageRepo {
    async fn append(
        &self,
        realm_id: RealmId,
        sender: Option<&PlayerName>,
        topic: Option<&Topic>,
        payload: &str,
    ) -> Result<Message, RepoError> {
        let _partition = self.partitions.lock(&(realm_id, topic.cloned())).await;
        let created = self.clock.tick();

        let result = sqlx::query(
            r#"
            INSERT INTO messages (realm_id, player, topic, payload, created_us)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(realm_id.to_string())
        .bind(sender.map(PlayerName::as_str))
        .bind(topic.map(Topic::as_str))
        .bind(payload)
        .bind(created.as_micros())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("append_message", e))?;

        Ok(Message {
            id: MessageId::new(result.last_insert_rowid()),
            realm_id,
            topic: topic.cloned(),
            sender: sender.cloned(),
            payload: payload.to_string(),
            created,
        })
    }

    async fn fetch_since(
        &self,
        realm_id: RealmId,
        topic: Option<&Topic>,
        since: Timestamp,
    ) -> Result<Vec<Message>, RepoError> {
        let rows = match topic {
            Some(topic) => sqlx::query(
                r#"
                SELECT id, realm_id, player, topic, payload, created_us
                FROM messages
                WHERE realm_id = ? AND topic = ? AND created_us > ?
                ORDER BY created_us ASC, id ASC
                "#,
            )
            .bind(realm_id.to_string())
            .bind(topic.as_str())
            .bind(since.as_micros())
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query(
                r#"
                SELECT id, realm_id, player, topic, payload, created_us
                FROM messages
                WHERE realm_id = ? AND topic IS NULL AND created_us > ?
                ORDER BY created_us ASC, id ASC
                "#,
            )
            .bind(realm_id.to_string())
            .bind(since.as_micros())
            .fetch_all(&self.pool)
            .await,
        }
        .map_err(|e| RepoError::database("fetch_messages", e))?;

        rows.iter().map(Self::row_to_message).collect()
    }

    async fn delete_before(
        &self,
        realm_id: RealmId,
        cutoff: Option<Timestamp>,
    ) -> Result<u64, RepoError> {
        let result = match cutoff {
            Some(cutoff) => {
                sqlx::query("DELETE FROM messages WHERE realm_id = ? AND created_us < ?")
                    .bind(realm_id.to_string())
                    .bind(cutoff.as_micros())
                    .execute(&self.pool)
                    .await
            }
            None => {
                sqlx::query("DELETE FROM messages WHERE realm_id = ?")
                    .bind(realm_id.to_string())
                    .execute(&self.pool)
                    .await
            }
        }
        .map_err(|e| RepoError::database("delete_messages", e))?;

        Ok(result.rows_affected())
    }

    async fn detach_sender(&self, sender: &PlayerName) -> Result<u64, RepoError> {
        let result = sqlx::query("UPDATE messages SET player = NULL WHERE player = ?")
            .bind(sender.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("detach_sender", e))?;
        Ok(result.rows_affected())
    }
}
