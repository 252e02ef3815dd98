//! Integration tests for the storage layer.
//!
//! These tests drive the SQLite backend through the `TaskStore` trait, the
//! same way request handlers do.

use std::collections::HashSet;
use task_manager::db::{SqliteStore, TaskStore};
use task_manager::types::TaskTitle;

/// Helper to create a fresh in-memory store with the table in place.
async fn setup_store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().expect("Failed to create in-memory database");
    store.init().await.expect("Failed to create tasks table");
    store
}

fn title(s: &str) -> TaskTitle {
    TaskTitle::parse(s).expect("valid title")
}

mod create_tests {
    use super::*;

    #[tokio::test]
    async fn create_returns_open_task_with_fresh_id() {
        let store = setup_store().await;

        let mut seen = HashSet::new();
        for name in ["one", "two", "three"] {
            let task = store.create(&title(name)).await.unwrap();
            assert_eq!(task.title, name);
            assert!(!task.completed);
            assert!(seen.insert(task.id), "id {} was reused", task.id);
        }
    }

    #[tokio::test]
    async fn create_stores_trimmed_title() {
        let store = setup_store().await;

        let task = store.create(&title("   Buy milk  ")).await.unwrap();

        assert_eq!(task.title, "Buy milk");
        assert_eq!(store.list().await.unwrap()[0].title, "Buy milk");
    }

    #[tokio::test]
    async fn create_without_table_fails() {
        let store = SqliteStore::open_in_memory().unwrap();

        let result = store.create(&title("too early")).await;

        assert!(result.is_err());
    }
}

mod list_tests {
    use super::*;

    #[tokio::test]
    async fn list_empty_store() {
        let store = setup_store().await;
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let store = setup_store().await;

        let mut created = Vec::new();
        for i in 0..5 {
            created.push(store.create(&title(&format!("task {}", i))).await.unwrap());
        }

        let listed = store.list().await.unwrap();

        assert_eq!(listed.len(), 5);
        let listed_ids: Vec<i64> = listed.iter().map(|t| t.id).collect();
        let expected: Vec<i64> = created.iter().rev().map(|t| t.id).collect();
        assert_eq!(listed_ids, expected);
        assert!(listed.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }
}

mod toggle_tests {
    use super::*;

    #[tokio::test]
    async fn set_completed_changes_only_that_field() {
        let store = setup_store().await;
        let task = store.create(&title("Walk dog")).await.unwrap();
        let other = store.create(&title("Other")).await.unwrap();

        let updated = store.set_completed(task.id, true).await.unwrap().unwrap();

        assert!(updated.completed);
        assert_eq!(updated.id, task.id);
        assert_eq!(updated.title, task.title);
        assert_eq!(updated.created_at, task.created_at);

        let listed = store.list().await.unwrap();
        let untouched = listed.iter().find(|t| t.id == other.id).unwrap();
        assert!(!untouched.completed);
    }

    #[tokio::test]
    async fn set_completed_can_reopen() {
        let store = setup_store().await;
        let task = store.create(&title("Walk dog")).await.unwrap();

        store.set_completed(task.id, true).await.unwrap();
        let reopened = store.set_completed(task.id, false).await.unwrap().unwrap();

        assert!(!reopened.completed);
    }

    #[tokio::test]
    async fn set_completed_unknown_id_mutates_nothing() {
        let store = setup_store().await;
        let task = store.create(&title("only")).await.unwrap();

        let result = store.set_completed(task.id + 100, true).await.unwrap();

        assert!(result.is_none());
        assert_eq!(store.list().await.unwrap(), vec![task]);
    }
}

mod delete_tests {
    use super::*;

    #[tokio::test]
    async fn delete_removes_permanently() {
        let store = setup_store().await;
        let keep = store.create(&title("keep")).await.unwrap();
        let gone = store.create(&title("gone")).await.unwrap();

        assert!(store.delete(gone.id).await.unwrap());

        assert_eq!(store.list().await.unwrap(), vec![keep]);
        assert!(store.set_completed(gone.id, true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_twice_reports_missing() {
        let store = setup_store().await;
        let task = store.create(&title("once")).await.unwrap();

        assert!(store.delete(task.id).await.unwrap());
        assert!(!store.delete(task.id).await.unwrap());
    }
}

mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn init_is_idempotent() {
        let store = setup_store().await;
        store.create(&title("survives")).await.unwrap();

        store.init().await.unwrap();

        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rows_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.db");

        let created = {
            let store = SqliteStore::open(&path).unwrap();
            store.init().await.unwrap();
            let task = store.create(&title("durable")).await.unwrap();
            store.set_completed(task.id, true).await.unwrap().unwrap()
        };

        let store = SqliteStore::open(&path).unwrap();
        store.init().await.unwrap();
        let listed = store.list().await.unwrap();

        assert_eq!(listed, vec![created]);
        store.close().await;
    }

    #[tokio::test]
    async fn concurrent_creates_get_distinct_ids() {
        let store = setup_store().await;

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create(&title(&format!("task {}", i))).await.unwrap().id
            }));
        }

        let mut ids = HashSet::new();
        for handle in handles {
            assert!(ids.insert(handle.await.unwrap()));
        }
        assert_eq!(store.list().await.unwrap().len(), 20);
    }
}
