//! Storage layer for the task manager.
//!
//! Every task operation is a single SQL statement. Two backends implement
//! [`TaskStore`]: SQLite through rusqlite and PostgreSQL through an sqlx pool.

pub mod init;
pub mod postgres;
pub mod tasks;

use crate::config::{StoreBackend, StoreConfig};
use crate::types::{Task, TaskTitle};
use async_trait::async_trait;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use init::{InitPolicy, StoreStatus, spawn_store_init};
pub use postgres::PostgresStore;

/// Errors raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("postgres error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("store connection lock poisoned")]
    Poisoned,

    #[error("store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Persistence for task rows.
#[async_trait]
pub trait TaskStore: Send + Sync + 'static {
    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;

    /// Create the `tasks` table if it does not exist.
    async fn init(&self) -> Result<(), StoreError>;

    /// All tasks, newest first.
    async fn list(&self) -> Result<Vec<Task>, StoreError>;

    /// Insert a task and return it with its assigned id and timestamp.
    async fn create(&self, title: &TaskTitle) -> Result<Task, StoreError>;

    /// Set `completed` on a task. `None` when the id is unknown.
    async fn set_completed(&self, id: i64, completed: bool) -> Result<Option<Task>, StoreError>;

    /// Delete a task. `false` when the id is unknown.
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;

    /// Release pooled connections, waiting for in-flight statements.
    async fn close(&self);
}

/// Build the configured store. Never touches the network; PostgreSQL
/// connections are opened lazily on first use.
pub fn connect(config: &StoreConfig) -> Result<Arc<dyn TaskStore>, StoreError> {
    match config.backend {
        StoreBackend::Postgres => Ok(Arc::new(PostgresStore::connect_lazy(config))),
        StoreBackend::Sqlite => Ok(Arc::new(SqliteStore::open(&config.path)?)),
    }
}

/// SQLite-backed store wrapping a single connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the database file at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;

        // WAL lets readers proceed while a write is in progress
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA busy_timeout=5000;",
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the connection on the blocking thread pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&conn)
        })
        .await?
    }
}

#[async_trait]
impl TaskStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn init(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| Ok(tasks::create_table(conn)?)).await
    }

    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        self.with_conn(|conn| Ok(tasks::list_tasks(conn)?)).await
    }

    async fn create(&self, title: &TaskTitle) -> Result<Task, StoreError> {
        let title = title.clone();
        self.with_conn(move |conn| Ok(tasks::insert_task(conn, &title)?))
            .await
    }

    async fn set_completed(&self, id: i64, completed: bool) -> Result<Option<Task>, StoreError> {
        self.with_conn(move |conn| Ok(tasks::update_completed(conn, id, completed)?))
            .await
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        self.with_conn(move |conn| Ok(tasks::delete_task(conn, id)?))
            .await
    }

    async fn close(&self) {
        // The connection closes when the last handle drops; flush the WAL first.
        let result = self
            .with_conn(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await;
        if let Err(e) = result {
            tracing::warn!("SQLite checkpoint on close failed: {}", e);
        }
    }
}
