#![forbid(unsafe_code)]

use rusqlite::{Connection, params};
use std::path::PathBuf;
use td_core::model::{TaskPatch, TaskPriority, TaskStatus};
use td_storage::{SqliteStore, StoreError, TaskAddRequest, TaskImportRequest};
use td_core::validate::TaskDraft;

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("td_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn add_request(name: &str) -> TaskAddRequest {
    TaskAddRequest {
        name: name.to_string(),
        description: Some("notes".to_string()),
        priority: TaskPriority::High,
        depends_on: Vec::new(),
        files_to_edit: vec!["src/lib.rs".to_string()],
        related_kb: Vec::new(),
        estimated_hours: Some(2.0),
    }
}

fn draft(name: &str) -> TaskDraft {
    TaskDraft {
        name: Some(name.to_string()),
        ..TaskDraft::default()
    }
}

#[test]
fn undo_with_no_history_fails() {
    let storage_dir = temp_dir("undo_with_no_history_fails");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let err = store.undo_last().expect_err("expected failure");
    assert!(matches!(err, StoreError::InvalidInput(_)), "got {err}");
}

#[test]
fn undo_task_add_removes_the_task() {
    let storage_dir = temp_dir("undo_task_add_removes_the_task");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    store.task_add(add_request("Ephemeral")).expect("add");

    let outcome = store.undo_last().expect("undo");
    assert_eq!(outcome.operation_type, "task_add");
    assert!(outcome.description.contains("TASK-001"));
    assert!(store.task_list(None, None).expect("list").is_empty());
}

#[test]
fn undo_task_delete_restores_every_field() {
    let storage_dir = temp_dir("undo_task_delete_restores_every_field");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let original = store.task_add(add_request("Keeper")).expect("add");
    store.task_delete("TASK-001").expect("delete");

    let outcome = store.undo_last().expect("undo");
    assert_eq!(outcome.operation_type, "task_delete");
    let restored = store.task_get("TASK-001").expect("get");
    assert_eq!(restored, original);
}

#[test]
fn undo_task_update_restores_previous_fields() {
    let storage_dir = temp_dir("undo_task_update_restores_previous_fields");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let original = store.task_add(add_request("Mutable")).expect("add");
    store
        .task_update(
            "TASK-001",
            &TaskPatch {
                status: Some(TaskStatus::InProgress),
                priority: Some(TaskPriority::Low),
                ..TaskPatch::default()
            },
        )
        .expect("update");

    let outcome = store.undo_last().expect("undo");
    assert_eq!(outcome.operation_type, "task_update");
    let restored = store.task_get("TASK-001").expect("get");
    assert_eq!(restored.status, TaskStatus::Pending);
    assert_eq!(restored.priority, TaskPriority::High);
    assert_eq!(restored.started_at_ms, None, "start timestamp reverts too");
    assert_eq!(restored, original);
}

#[test]
fn undo_import_removes_the_whole_batch() {
    let storage_dir = temp_dir("undo_import_removes_the_whole_batch");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    store
        .import_tasks(TaskImportRequest::new(vec![draft("A"), draft("B")]))
        .expect("import");

    let outcome = store.undo_last().expect("undo");
    assert_eq!(outcome.operation_type, "task_import");
    assert!(store.task_list(None, None).expect("list").is_empty());
}

#[test]
fn undo_walks_history_newest_first() {
    let storage_dir = temp_dir("undo_walks_history_newest_first");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    store.task_add(add_request("First")).expect("add");
    store.task_add(add_request("Second")).expect("add");

    let outcome = store.undo_last().expect("undo newest");
    assert!(outcome.description.contains("TASK-002"));
    let outcome = store.undo_last().expect("undo older");
    assert!(outcome.description.contains("TASK-001"));
    let err = store.undo_last().expect_err("history exhausted");
    assert!(matches!(err, StoreError::InvalidInput(_)), "got {err}");
}

#[test]
fn undone_operations_stay_listed_with_the_flag_set() {
    let storage_dir = temp_dir("undone_operations_stay_listed_with_the_flag_set");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    store.task_add(add_request("One")).expect("add");
    store.undo_last().expect("undo");

    let ops = store.list_operations(10).expect("ops");
    assert_eq!(ops.len(), 1);
    assert!(ops[0].undone);
    assert_eq!(ops[0].operation_type, "task_add");
}

#[test]
fn undo_refuses_when_the_task_has_drifted() {
    let storage_dir = temp_dir("undo_refuses_when_the_task_has_drifted");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    store.task_add(add_request("Drifter")).expect("add");

    // Remove the row behind the store's back; the add can no longer be
    // reversed.
    let conn =
        Connection::open(storage_dir.join("taskdeck.db")).expect("open raw connection");
    conn.execute("DELETE FROM tasks WHERE id=?1", params!["TASK-001"])
        .expect("raw delete");
    drop(conn);

    let err = store.undo_last().expect_err("expected failure");
    match err {
        StoreError::StaleOperation { reason, .. } => {
            assert!(reason.contains("TASK-001"));
        }
        other => panic!("unexpected error: {other}"),
    }
    // The operation is still pending, not consumed.
    let ops = store.list_operations(10).expect("ops");
    assert!(!ops[0].undone);
}
