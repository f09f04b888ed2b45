//! Opening the catalog database.

use exn::ResultExt;
use sqlx::Executor;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::{ErrorKind, Result};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// A repair writes from one connection; the other serves `show` and
/// `events` running alongside it.
const MAX_CONNECTIONS: u32 = 2;
/// A repair commits every changed row of the catalog in one transaction.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);
/// Loading reads every table front to back once, so give the page cache
/// room for the whole catalog (32 MiB) and keep sort scratch in memory.
const CONNECTION_PRAGMAS: &str = "PRAGMA cache_size = -32768; PRAGMA temp_store = MEMORY;";

/// The catalog's SQLite database, migrated to the current schema.
///
/// Build a [`Repository`](crate::Repository) from it to read and write the
/// catalog.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the database at `path`, creating the file if needed.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "connecting");
        let options = options()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);
        Self::open(options, MAX_CONNECTIONS).await
    }

    /// Opens a private in-memory database, gone once it is closed.
    ///
    /// Every connection to `:memory:` gets its own database, so this one
    /// only ever has one.
    pub async fn connect_in_memory() -> Result<Self> {
        Self::open(options().filename(":memory:"), 1).await
    }

    async fn open(options: SqliteConnectOptions, connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(connections)
            .after_connect(|conn: &mut SqliteConnection, _| {
                Box::pin(async move { conn.execute(sqlx::raw_sql(CONNECTION_PRAGMAS)).await.map(drop) })
            })
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    #[instrument(level = "debug", skip_all)]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Waits for outstanding queries, then closes every connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Pool and circulation rows rely on `ON DELETE` actions, which SQLite only
/// honours with foreign keys switched on.
fn options() -> SqliteConnectOptions {
    SqliteConnectOptions::new().foreign_keys(true).busy_timeout(BUSY_TIMEOUT)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn count(db: &Database, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    async fn insert_pool(db: &Database, id: i64, work: Option<i64>) {
        sqlx::query(
            "INSERT INTO license_pools (id, identifier_scheme, identifier_value, source, collection, work_id)
             VALUES (?, 'ISBN', ?, 'Overdrive', 'main', ?)",
        )
        .bind(id)
        .bind(format!("978014143951{id}"))
        .bind(work)
        .execute(db.pool())
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn creates_the_catalog_schema_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shelf.sqlite");
        let db = Database::connect(&path).await.unwrap();
        assert!(path.exists());
        let tables: Vec<String> = sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(db.pool())
            .await
            .unwrap();
        for table in ["works", "license_pools", "licenses", "loans", "holds", "circulation_events"] {
            assert!(tables.iter().any(|t| t == table), "missing table {table}");
        }
        db.close().await;

        // Reopening an existing catalog doesn't reapply anything.
        let db = Database::connect(&path).await.unwrap();
        let mode: String = sqlx::query_scalar("PRAGMA journal_mode").fetch_one(db.pool()).await.unwrap();
        assert_eq!(mode, "wal");
        db.close().await;
    }

    #[tokio::test]
    async fn every_connection_is_configured() {
        let db = Database::connect_in_memory().await.unwrap();
        let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys").fetch_one(db.pool()).await.unwrap();
        assert_eq!(foreign_keys, 1);
        let cache_size: i64 = sqlx::query_scalar("PRAGMA cache_size").fetch_one(db.pool()).await.unwrap();
        assert_eq!(cache_size, -32768);
        db.close().await;
    }

    #[tokio::test]
    async fn deleting_a_work_detaches_its_pools() {
        let db = Database::connect_in_memory().await.unwrap();
        sqlx::query("INSERT INTO works (id) VALUES (1)").execute(db.pool()).await.unwrap();
        insert_pool(&db, 1, Some(1)).await;
        insert_pool(&db, 2, Some(1)).await;

        sqlx::query("DELETE FROM works WHERE id = 1").execute(db.pool()).await.unwrap();
        let grouped: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM license_pools WHERE work_id IS NOT NULL")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(grouped, 0);
        assert_eq!(count(&db, "license_pools").await, 2);
        db.close().await;
    }

    #[tokio::test]
    async fn deleting_a_pool_keeps_only_its_events() {
        let db = Database::connect_in_memory().await.unwrap();
        insert_pool(&db, 1, None).await;
        sqlx::query("INSERT INTO licenses (id, pool_id, identifier, concurrency) VALUES (1, 1, 'license-1', 1)")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO loans (pool_id, license_id, patron_id, starts_at) VALUES (1, 1, 7, 0)")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO holds (pool_id, patron_id, starts_at, position) VALUES (1, 8, 0, 1)")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query(include_str!("../queries/insert_event.sql"))
            .bind(1_i64)
            .bind("pool")
            .bind("LicenseAdded")
            .bind(0_i64)
            .bind(0_i64)
            .bind(1_i64)
            .execute(db.pool())
            .await
            .unwrap();

        sqlx::query("DELETE FROM license_pools WHERE id = 1").execute(db.pool()).await.unwrap();
        for table in ["licenses", "loans", "holds"] {
            assert_eq!(count(&db, table).await, 0, "{table} outlived its pool");
        }
        assert_eq!(count(&db, "circulation_events").await, 1);
        db.close().await;
    }

    #[tokio::test]
    async fn a_pool_key_is_stored_once() {
        let db = Database::connect_in_memory().await.unwrap();
        insert_pool(&db, 1, None).await;
        let duplicate = sqlx::query(
            "INSERT INTO license_pools (identifier_scheme, identifier_value, source, collection)
             VALUES ('ISBN', '9780141439511', 'Overdrive', 'main')",
        )
        .execute(db.pool())
        .await;
        assert!(duplicate.is_err());
        db.close().await;
    }
}
