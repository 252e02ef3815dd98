//! PostgreSQL backend over an sqlx connection pool.

use super::{StoreError, TaskStore};
use crate::config::StoreConfig;
use crate::types::{Task, TaskTitle};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

/// Same layout as databases created by earlier deployments of the service, so
/// an existing `tasks` table is reused as is.
const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS tasks (
        id SERIAL PRIMARY KEY,
        title VARCHAR(255) NOT NULL,
        completed BOOLEAN DEFAULT FALSE,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )";

/// Columns as decoded into [`TaskRow`]. `SERIAL` ids widen to BIGINT and the
/// zone-less timestamp is read in the session time zone, which is how
/// `CURRENT_TIMESTAMP` was stored. Both casts are no-ops on a table that
/// already uses BIGINT/TIMESTAMPTZ.
const TASK_COLUMNS: &str = "id::BIGINT AS id, title, COALESCE(completed, FALSE) AS completed, \
     created_at::TIMESTAMPTZ AS created_at";

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: i64,
    title: String,
    completed: bool,
    created_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            id: row.id,
            title: row.title,
            completed: row.completed,
            created_at: row.created_at,
        }
    }
}

/// Task store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Build a pool that connects on first use, so startup never waits on
    /// the database.
    pub fn connect_lazy(config: &StoreConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.name)
            .username(&config.user)
            .password(&config.password);
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_lazy_with(options);
        Self::new(pool)
    }

    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for PostgresStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {} FROM tasks ORDER BY created_at DESC, id DESC",
            TASK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn create(&self, title: &TaskTitle) -> Result<Task, StoreError> {
        let row: TaskRow = sqlx::query_as(&format!(
            "INSERT INTO tasks (title) VALUES ($1) RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(title.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn set_completed(&self, id: i64, completed: bool) -> Result<Option<Task>, StoreError> {
        let row: Option<TaskRow> = sqlx::query_as(&format!(
            "UPDATE tasks SET completed = $1 WHERE id = $2 RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(completed)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Task::from))
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let deleted: Option<i64> =
            sqlx::query_scalar("DELETE FROM tasks WHERE id = $1 RETURNING id::BIGINT")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(deleted.is_some())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
