//! SQLite connection and schema management

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::infrastructure::ports::RepoError;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS lands (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        info TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS realms (
        id TEXT PRIMARY KEY,
        land_id TEXT NOT NULL REFERENCES lands(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        info TEXT NOT NULL,
        host TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (land_id, name)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS realm_players (
        realm_id TEXT NOT NULL REFERENCES realms(id) ON DELETE CASCADE,
        player TEXT NOT NULL,
        PRIMARY KEY (realm_id, player)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS properties (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        scope TEXT NOT NULL,
        scope_id TEXT NOT NULL,
        player TEXT,
        name TEXT NOT NULL,
        value TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_properties_scope_name
    ON properties(scope, scope_id, name)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_properties_player
    ON properties(player)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        realm_id TEXT NOT NULL REFERENCES realms(id) ON DELETE CASCADE,
        player TEXT,
        topic TEXT,
        payload TEXT NOT NULL,
        created_us INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_messages_realm_created
    ON messages(realm_id, created_us, id)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_messages_realm_topic_created
    ON messages(realm_id, topic, created_us)
    "#,
];

/// Open a pool on `db_path`, creating the file if needed.
pub async fn connect(db_path: &str) -> Result<SqlitePool, RepoError> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
        .map_err(|e| RepoError::database("connect", e))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
        .map_err(|e| RepoError::database("connect", e))?;

    tracing::info!(path = %db_path, "Opened SQLite store");
    Ok(pool)
}

/// Create tables and indexes if they do not exist.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), RepoError> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| RepoError::database("ensure_schema", e))?;
    }
    Ok(())
}
