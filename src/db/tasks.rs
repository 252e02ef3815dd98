//! SQLite statements for the `tasks` table.

use crate::types::{Task, TaskTitle};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

/// Table definition. `created_at` is stored as RFC 3339 text with
/// millisecond precision so that string order matches time order.
const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title VARCHAR(255) NOT NULL
            CHECK (length(trim(title)) > 0 AND length(title) <= 255),
        completed BOOLEAN NOT NULL DEFAULT 0 CHECK (completed IN (0, 1)),
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    )";

const TASK_COLUMNS: &str = "id, title, completed, created_at";

pub fn create_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(CREATE_TABLE, [])?;
    Ok(())
}

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let id: i64 = row.get("id")?;
    let title: String = row.get("title")?;
    let completed: bool = row.get("completed")?;
    let created_at: String = row.get("created_at")?;

    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    Ok(Task {
        id,
        title,
        completed,
        created_at,
    })
}

/// All tasks, newest first. Ties on `created_at` fall back to insertion order.
pub fn list_tasks(conn: &Connection) -> rusqlite::Result<Vec<Task>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM tasks ORDER BY created_at DESC, id DESC",
        TASK_COLUMNS
    ))?;
    let tasks = stmt
        .query_map([], parse_task_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tasks)
}

pub fn insert_task(conn: &Connection, title: &TaskTitle) -> rusqlite::Result<Task> {
    conn.query_row(
        &format!(
            "INSERT INTO tasks (title) VALUES (?1) RETURNING {}",
            TASK_COLUMNS
        ),
        params![title.as_str()],
        parse_task_row,
    )
}

pub fn update_completed(
    conn: &Connection,
    id: i64,
    completed: bool,
) -> rusqlite::Result<Option<Task>> {
    conn.query_row(
        &format!(
            "UPDATE tasks SET completed = ?1 WHERE id = ?2 RETURNING {}",
            TASK_COLUMNS
        ),
        params![completed, id],
        parse_task_row,
    )
    .optional()
}

/// Returns `false` when no row had this id.
pub fn delete_task(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let deleted = conn
        .query_row(
            "DELETE FROM tasks WHERE id = ?1 RETURNING id",
            params![id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(deleted.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_table(&conn).unwrap();
        conn
    }

    fn title(s: &str) -> TaskTitle {
        TaskTitle::parse(s).unwrap()
    }

    #[test]
    fn create_table_is_idempotent() {
        let conn = setup();
        create_table(&conn).unwrap();
        insert_task(&conn, &title("still here")).unwrap();
        create_table(&conn).unwrap();
        assert_eq!(list_tasks(&conn).unwrap().len(), 1);
    }

    #[test]
    fn insert_assigns_defaults() {
        let conn = setup();
        let task = insert_task(&conn, &title("Buy milk")).unwrap();
        assert_eq!(task.title, "Buy milk");
        assert!(!task.completed);
        assert!(task.id > 0);
    }

    #[test]
    fn blank_title_violates_check_constraint() {
        let conn = setup();
        let result = conn.execute("INSERT INTO tasks (title) VALUES ('   ')", []);
        assert!(result.is_err());
        assert!(list_tasks(&conn).unwrap().is_empty());
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let conn = setup();
        let first = insert_task(&conn, &title("a")).unwrap();
        assert!(delete_task(&conn, first.id).unwrap());
        let second = insert_task(&conn, &title("b")).unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn same_timestamp_orders_by_id() {
        let conn = setup();
        conn.execute(
            "INSERT INTO tasks (title, created_at) VALUES ('older', '2024-01-01T00:00:00.000Z')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO tasks (title, created_at) VALUES ('newer', '2024-01-01T00:00:00.000Z')",
            [],
        )
        .unwrap();
        let titles: Vec<_> = list_tasks(&conn)
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["newer", "older"]);
    }

    #[test]
    fn update_unknown_id_returns_none() {
        let conn = setup();
        assert!(update_completed(&conn, 42, true).unwrap().is_none());
    }

    #[test]
    fn delete_unknown_id_returns_false() {
        let conn = setup();
        assert!(!delete_task(&conn, 42).unwrap());
    }
}
