use super::{error::Result, error::StorageError, Changeset, FlagStore, Snapshot};
use crate::core::{AuditAction, AuditEntry, DependencyEdge, Flag, FlagId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Pool, Row, Sqlite, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// One writer, since the engine serializes writes, plus audit log readers.
const DEFAULT_POOL_SIZE: u32 = 4;

/// How long SQLite retries a locked database before failing a statement.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Spare reader connections close after five idle minutes.
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

const AUDIT_COLUMNS: &str = "a.id, a.flag_id, f.name AS flag_name, a.action, a.timestamp, a.reason, a.actor
     FROM audit_log a JOIN flags f ON f.id = a.flag_id";

/// Configuration for the SQLite connection pool.
///
/// Connections are never recycled by age.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections, the writer included.
    pub max_size: u32,
    /// Connections kept open while idle. One keeps the next write warm.
    pub min_idle: Option<u32>,
    /// Maximum time an operation waits for a connection. Defaults to the
    /// busy timeout.
    pub connection_timeout: Duration,
    /// How long a spare connection may sit idle before it is closed.
    pub idle_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_POOL_SIZE,
            min_idle: Some(1),
            connection_timeout: BUSY_TIMEOUT,
            idle_timeout: Some(Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS)),
        }
    }
}

/// SQLite-based flag store with connection pooling.
///
/// Three tables mirror the domain records: `flags`, `flag_dependencies`
/// (unique per pair, no self-loops) and `audit_log`. Every
/// [`FlagStore::commit`] runs inside one transaction, so a failed write
/// rolls back the whole changeset.
pub struct SqliteFlagStore {
    pool: SqlitePool,
    db_path: String,
}

impl SqliteFlagStore {
    /// Opens (creating if missing) the database at `db_path`.
    ///
    /// Uses default pool configuration.
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(db_path, PoolConfig::default()).await
    }

    /// Opens the database with a custom pool configuration.
    pub async fn with_config(db_path: impl AsRef<Path>, config: PoolConfig) -> Result<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        let connect_options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path_str))
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = Self::build_pool(connect_options, &config).await?;
        let store = Self {
            pool,
            db_path: db_path_str,
        };
        store.initialize().await?;

        info!(path = %store.db_path, "Opened SQLite flag store");
        Ok(store)
    }

    /// Creates an in-memory SQLite store.
    ///
    /// An in-memory database lives inside a single connection, so the pool
    /// is pinned to one connection that is never recycled.
    pub async fn in_memory() -> Result<Self> {
        let config = PoolConfig {
            max_size: 1,
            min_idle: None,
            idle_timeout: None,
            ..PoolConfig::default()
        };

        let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .journal_mode(SqliteJournalMode::Memory)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = Self::build_pool(connect_options, &config).await?;
        let store = Self {
            pool,
            db_path: ":memory:".to_string(),
        };
        store.initialize().await?;
        Ok(store)
    }

    /// Path of the database file, or `:memory:`.
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Builds the connection pool with the given configuration.
    async fn build_pool(
        connect_options: SqliteConnectOptions,
        config: &PoolConfig,
    ) -> Result<Pool<Sqlite>> {
        let mut builder = SqlitePoolOptions::new()
            .max_connections(config.max_size)
            .acquire_timeout(config.connection_timeout)
            .max_lifetime(None)
            .idle_timeout(config.idle_timeout);

        if let Some(min_idle) = config.min_idle {
            builder = builder.min_connections(min_idle);
        }

        let pool = builder
            .connect_with(connect_options)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(pool)
    }

    /// Initialize the database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS flags (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                active INTEGER NOT NULL DEFAULT 1,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        // The autoincrement id preserves edge creation order
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS flag_dependencies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                flag_id INTEGER NOT NULL REFERENCES flags(id) ON DELETE CASCADE,
                depends_on_id INTEGER NOT NULL REFERENCES flags(id) ON DELETE CASCADE,
                CHECK (flag_id <> depends_on_id),
                UNIQUE (flag_id, depends_on_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_flag_dependencies_depends_on
             ON flag_dependencies(depends_on_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY,
                flag_id INTEGER NOT NULL REFERENCES flags(id) ON DELETE CASCADE,
                action TEXT CHECK( action IN ('create','toggle_on','toggle_off','auto_disable') ) NOT NULL,
                timestamp INTEGER NOT NULL,
                reason TEXT,
                actor TEXT
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_log_flag ON audit_log(flag_id, id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    fn timestamp_from_millis(millis: i64) -> Result<DateTime<Utc>> {
        DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| StorageError::Corrupt(format!("timestamp out of range: {}", millis)))
    }

    fn row_to_flag(row: &SqliteRow) -> Result<Flag> {
        let id: i64 = row.try_get("id")?;
        let name: String = row.try_get("name")?;
        let active: bool = row.try_get("active")?;
        let created_at: i64 = row.try_get("created_at")?;

        Ok(Flag::new(
            FlagId::new(id),
            name,
            active,
            Self::timestamp_from_millis(created_at)?,
        ))
    }

    fn row_to_audit_entry(row: &SqliteRow) -> Result<AuditEntry> {
        let id: i64 = row.try_get("id")?;
        let flag_id: i64 = row.try_get("flag_id")?;
        let flag_name: String = row.try_get("flag_name")?;
        let action: String = row.try_get("action")?;
        let timestamp: i64 = row.try_get("timestamp")?;
        let reason: Option<String> = row.try_get("reason")?;
        let actor: Option<String> = row.try_get("actor")?;

        Ok(AuditEntry::new(
            id,
            FlagId::new(flag_id),
            flag_name,
            AuditAction::from_str(&action)?,
            Self::timestamp_from_millis(timestamp)?,
            reason.unwrap_or_default(),
            actor.unwrap_or_default(),
        ))
    }
}

#[async_trait]
impl FlagStore for SqliteFlagStore {
    async fn load(&self) -> Result<Snapshot> {
        let flags = sqlx::query("SELECT id, name, active, created_at FROM flags ORDER BY id")
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(Self::row_to_flag)
            .collect::<Result<Vec<_>>>()?;

        let edges = sqlx::query("SELECT flag_id, depends_on_id FROM flag_dependencies ORDER BY id")
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| -> Result<DependencyEdge> {
                let from: i64 = row.try_get("flag_id")?;
                let to: i64 = row.try_get("depends_on_id")?;
                Ok(DependencyEdge::new(FlagId::new(from), FlagId::new(to)))
            })
            .collect::<Result<Vec<_>>>()?;

        let last_audit_id: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) FROM audit_log")
            .fetch_one(&self.pool)
            .await?;

        debug!(
            flags = flags.len(),
            edges = edges.len(),
            last_audit_id,
            "Loaded flag store snapshot"
        );

        Ok(Snapshot {
            flags,
            edges,
            last_audit_id,
        })
    }

    async fn commit(&self, changes: &Changeset) -> Result<()> {
        // Dropping the transaction on any early return rolls it back
        let mut tx = self.pool.begin().await?;

        for flag in &changes.flags {
            sqlx::query("INSERT INTO flags (id, name, active, created_at) VALUES (?, ?, ?, ?)")
                .bind(flag.id().get())
                .bind(flag.name())
                .bind(flag.is_active())
                .bind(flag.created_at().timestamp_millis())
                .execute(&mut *tx)
                .await?;
        }

        for edge in &changes.edges {
            sqlx::query("INSERT INTO flag_dependencies (flag_id, depends_on_id) VALUES (?, ?)")
                .bind(edge.from.get())
                .bind(edge.to.get())
                .execute(&mut *tx)
                .await?;
        }

        for change in &changes.state_changes {
            let result = sqlx::query("UPDATE flags SET active = ? WHERE id = ?")
                .bind(change.active)
                .bind(change.flag.get())
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() == 0 {
                return Err(StorageError::Constraint(format!(
                    "state change for missing flag {}",
                    change.flag
                )));
            }
        }

        for entry in &changes.audit_entries {
            sqlx::query(
                "INSERT INTO audit_log (id, flag_id, action, timestamp, reason, actor)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(entry.id())
            .bind(entry.flag_id().get())
            .bind(entry.action().as_str())
            .bind(entry.timestamp().timestamp_millis())
            .bind(entry.reason())
            .bind(entry.actor())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(
            flags = changes.flags.len(),
            edges = changes.edges.len(),
            state_changes = changes.state_changes.len(),
            audit_entries = changes.audit_entries.len(),
            "Committed changeset"
        );
        Ok(())
    }

    async fn audit_log(&self) -> Result<Vec<AuditEntry>> {
        sqlx::query(&format!("SELECT {} ORDER BY a.id", AUDIT_COLUMNS))
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(Self::row_to_audit_entry)
            .collect()
    }

    async fn audit_log_for_flag(&self, flag: FlagId) -> Result<Vec<AuditEntry>> {
        sqlx::query(&format!(
            "SELECT {} WHERE a.flag_id = ? ORDER BY a.id",
            AUDIT_COLUMNS
        ))
        .bind(flag.get())
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(Self::row_to_audit_entry)
        .collect()
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        info!("Closing flag store database");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StateChange;

    fn flag(id: i64, name: &str) -> Flag {
        Flag::new(FlagId::new(id), name, true, Utc::now())
    }

    #[tokio::test]
    async fn test_default_pool_config() {
        let config = PoolConfig::default();
        assert_eq!(config.max_size, 4);
        assert_eq!(config.min_idle, Some(1));
        assert_eq!(config.connection_timeout, BUSY_TIMEOUT);
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(300)));

        // The writer and several readers share the default pool
        let dir = tempfile::TempDir::new().unwrap();
        let store = SqliteFlagStore::new(dir.path().join("flags.db")).await.unwrap();
        let a = flag(1, "a");
        store
            .commit(&Changeset {
                flags: vec![a.clone()],
                audit_entries: vec![AuditEntry::new(
                    1,
                    a.id(),
                    a.name(),
                    AuditAction::Create,
                    Utc::now(),
                    "Flag a was created",
                    "API",
                )],
                ..Changeset::default()
            })
            .await
            .unwrap();

        let (all, for_a, snapshot) = tokio::join!(
            store.audit_log(),
            store.audit_log_for_flag(a.id()),
            store.load()
        );
        assert_eq!(all.unwrap(), for_a.unwrap());
        assert_eq!(snapshot.unwrap().last_audit_id, 1);
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_commit_and_load() {
        let store = SqliteFlagStore::in_memory().await.unwrap();
        let a = flag(1, "a");
        let b = flag(2, "b");

        store
            .commit(&Changeset {
                flags: vec![a.clone(), b.clone()],
                edges: vec![DependencyEdge::new(a.id(), b.id())],
                state_changes: vec![StateChange {
                    flag: b.id(),
                    active: false,
                }],
                audit_entries: vec![AuditEntry::new(
                    1,
                    a.id(),
                    a.name(),
                    AuditAction::Create,
                    Utc::now(),
                    "Flag a was created",
                    "API",
                )],
            })
            .await
            .unwrap();

        let snapshot = store.load().await.unwrap();
        let names: Vec<_> = snapshot.flags.iter().map(|f| f.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(snapshot.flags[0].is_active());
        assert!(!snapshot.flags[1].is_active());
        assert_eq!(snapshot.edges, vec![DependencyEdge::new(a.id(), b.id())]);
        assert_eq!(snapshot.last_audit_id, 1);

        let log = store.audit_log().await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].flag(), "a");
        assert_eq!(log[0].action(), AuditAction::Create);
        assert_eq!(log[0].reason(), "Flag a was created");
        assert_eq!(log[0].actor(), "API");
    }

    #[tokio::test]
    async fn test_failed_commit_rolls_back() {
        let store = SqliteFlagStore::in_memory().await.unwrap();
        store
            .commit(&Changeset {
                flags: vec![flag(1, "a")],
                ..Changeset::default()
            })
            .await
            .unwrap();

        // Second flag violates the unique name constraint after the first insert
        let result = store
            .commit(&Changeset {
                flags: vec![flag(2, "b"), flag(3, "a")],
                ..Changeset::default()
            })
            .await;
        assert!(matches!(result, Err(StorageError::Database(_))));

        let snapshot = store.load().await.unwrap();
        assert_eq!(snapshot.flags.len(), 1);
    }

    #[tokio::test]
    async fn test_state_change_for_missing_flag() {
        let store = SqliteFlagStore::in_memory().await.unwrap();
        let result = store
            .commit(&Changeset {
                state_changes: vec![StateChange {
                    flag: FlagId::new(42),
                    active: false,
                }],
                ..Changeset::default()
            })
            .await;
        assert!(matches!(result, Err(StorageError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_self_edge_rejected_by_schema() {
        let store = SqliteFlagStore::in_memory().await.unwrap();
        let result = store
            .commit(&Changeset {
                flags: vec![flag(1, "a")],
                edges: vec![DependencyEdge::new(FlagId::new(1), FlagId::new(1))],
                ..Changeset::default()
            })
            .await;
        assert!(result.is_err());
        assert!(store.load().await.unwrap().flags.is_empty());
    }

    #[tokio::test]
    async fn test_audit_log_for_flag() {
        let store = SqliteFlagStore::in_memory().await.unwrap();
        let a = flag(1, "a");
        let b = flag(2, "b");
        let entry = |id, f: &Flag, action| {
            AuditEntry::new(id, f.id(), f.name(), action, Utc::now(), "", "API")
        };
        store
            .commit(&Changeset {
                flags: vec![a.clone(), b.clone()],
                audit_entries: vec![
                    entry(1, &a, AuditAction::Create),
                    entry(2, &b, AuditAction::Create),
                    entry(3, &b, AuditAction::ToggleOff),
                ],
                ..Changeset::default()
            })
            .await
            .unwrap();

        let log = store.audit_log_for_flag(b.id()).await.unwrap();
        let actions: Vec<_> = log.iter().map(AuditEntry::action).collect();
        assert_eq!(actions, vec![AuditAction::Create, AuditAction::ToggleOff]);
        assert!(store.audit_log_for_flag(FlagId::new(9)).await.unwrap().is_empty());
    }
}
