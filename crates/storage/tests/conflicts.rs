#![forbid(unsafe_code)]

use std::path::PathBuf;
use td_core::conflict::RiskLevel;
use td_core::model::{TaskPatch, TaskPriority, TaskStatus};
use td_storage::{SqliteStore, StoreError, TaskAddRequest};

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

fn add_request(name: &str, priority: TaskPriority, files: &[&str]) -> TaskAddRequest {
    TaskAddRequest {
        name: name.to_string(),
        description: None,
        priority,
        depends_on: Vec::new(),
        files_to_edit: files.iter().map(|f| f.to_string()).collect(),
        related_kb: Vec::new(),
        estimated_hours: None,
    }
}

fn start(store: &mut SqliteStore, id: &str) {
    store
        .task_update(
            id,
            &TaskPatch {
                status: Some(TaskStatus::InProgress),
                ..TaskPatch::default()
            },
        )
        .expect("start task");
}

#[test]
fn detect_conflicts_reports_overlap_with_in_progress_tasks() {
    let storage_dir = temp_dir("detect_conflicts_reports_overlap_with_in_progress_tasks");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");

    store
        .task_add(add_request(
            "Refactor auth",
            TaskPriority::High,
            &["src/auth.rs", "src/session.rs"],
        ))
        .expect("add");
    store
        .task_add(add_request(
            "Add login throttle",
            TaskPriority::Medium,
            &["src/auth.rs", "src/limits.rs"],
        ))
        .expect("add");
    start(&mut store, "TASK-002");

    let conflicts = store.detect_conflicts("TASK-001").expect("detect");
    assert_eq!(conflicts.len(), 1);
    let conflict = &conflicts[0];
    assert_eq!(conflict.task_a_id, "TASK-001");
    assert_eq!(conflict.task_b_id, "TASK-002");
    assert_eq!(conflict.conflict_type, "file_overlap");
    assert_eq!(conflict.overlapping_files, vec!["src/auth.rs"]);
    assert!(conflict.risk_score > 0.0 && conflict.risk_score <= 1.0);
    // The higher-priority task is sequenced first.
    assert!(conflict.recommendation.starts_with("Complete TASK-001"));
}

#[test]
fn detect_conflicts_ignores_pending_and_completed_tasks() {
    let storage_dir = temp_dir("detect_conflicts_ignores_pending_and_completed_tasks");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");

    store
        .task_add(add_request("Target", TaskPriority::Medium, &["src/a.rs"]))
        .expect("add");
    store
        .task_add(add_request("Pending twin", TaskPriority::Medium, &["src/a.rs"]))
        .expect("add");

    let conflicts = store.detect_conflicts("TASK-001").expect("detect");
    assert!(conflicts.is_empty());
}

#[test]
fn detect_conflicts_requires_an_existing_task() {
    let storage_dir = temp_dir("detect_conflicts_requires_an_existing_task");
    let store = SqliteStore::open(&storage_dir).expect("open store");
    let err = store.detect_conflicts("TASK-404").expect_err("expected failure");
    assert!(matches!(err, StoreError::NotFound { .. }), "got {err}");
}

#[test]
fn identical_file_sets_score_high_risk() {
    let storage_dir = temp_dir("identical_file_sets_score_high_risk");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");

    let files = &["src/auth.rs", "src/token.rs", "src/session.rs"];
    store
        .task_add(add_request("A", TaskPriority::Medium, files))
        .expect("add");
    store
        .task_add(add_request("B", TaskPriority::Medium, files))
        .expect("add");
    start(&mut store, "TASK-002");

    let conflicts = store.detect_conflicts("TASK-001").expect("detect");
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].risk_level, RiskLevel::High);
}

#[test]
fn check_file_conflicts_lists_in_progress_tasks_touching_the_files() {
    let storage_dir = temp_dir("check_file_conflicts_lists_in_progress_tasks_touching_the_files");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");

    store
        .task_add(add_request("Active", TaskPriority::Medium, &["src/a.rs"]))
        .expect("add");
    store
        .task_add(add_request("Done", TaskPriority::Medium, &["src/a.rs"]))
        .expect("add");
    start(&mut store, "TASK-001");
    store
        .task_update(
            "TASK-002",
            &TaskPatch {
                status: Some(TaskStatus::Completed),
                ..TaskPatch::default()
            },
        )
        .expect("complete");

    let hits = store
        .check_file_conflicts(&["src/a.rs".to_string(), "src/b.rs".to_string()])
        .expect("check");
    assert_eq!(hits.len(), 1, "completed tasks are not conflicts");
    assert_eq!(hits[0].task_id, "TASK-001");
    assert_eq!(hits[0].status, "in_progress");
    assert_eq!(hits[0].overlapping_files, vec!["src/a.rs"]);
}

#[test]
fn check_file_conflicts_ignores_tasks_not_started() {
    let storage_dir = temp_dir("check_file_conflicts_ignores_tasks_not_started");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");

    store
        .task_add(add_request(
            "Planned",
            TaskPriority::Medium,
            &["src/api/auth.py"],
        ))
        .expect("add");

    // Pending tasks do not hold their files yet.
    let hits = store
        .check_file_conflicts(&["src/api/auth.py".to_string()])
        .expect("check");
    assert!(hits.is_empty(), "got {hits:?}");
}

#[test]
fn recommend_safe_order_puts_dependencies_first() {
    let storage_dir = temp_dir("recommend_safe_order_puts_dependencies_first");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");

    store
        .task_add(add_request("Base", TaskPriority::Low, &[]))
        .expect("add");
    let mut dependent = add_request("On top", TaskPriority::Critical, &[]);
    dependent.depends_on = vec!["TASK-001".to_string()];
    store.task_add(dependent).expect("add");

    let order = store
        .recommend_safe_order(&["TASK-002".to_string(), "TASK-001".to_string()])
        .expect("order");
    assert_eq!(order, vec!["TASK-001", "TASK-002"]);
}

#[test]
fn recommend_safe_order_breaks_ties_by_priority() {
    let storage_dir = temp_dir("recommend_safe_order_breaks_ties_by_priority");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");

    store
        .task_add(add_request("Low", TaskPriority::Low, &[]))
        .expect("add");
    store
        .task_add(add_request("Critical", TaskPriority::Critical, &[]))
        .expect("add");
    store
        .task_add(add_request("High", TaskPriority::High, &[]))
        .expect("add");

    let order = store
        .recommend_safe_order(&[
            "TASK-001".to_string(),
            "TASK-002".to_string(),
            "TASK-003".to_string(),
        ])
        .expect("order");
    assert_eq!(order, vec!["TASK-002", "TASK-003", "TASK-001"]);
}

#[test]
fn recommend_safe_order_sorts_status_blocked_tasks_last() {
    let storage_dir = temp_dir("recommend_safe_order_sorts_status_blocked_tasks_last");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");

    // Blocked by status alone; no dependencies at all.
    store
        .task_add(add_request("Stuck", TaskPriority::Critical, &[]))
        .expect("add");
    store
        .task_update(
            "TASK-001",
            &TaskPatch {
                status: Some(TaskStatus::Blocked),
                ..TaskPatch::default()
            },
        )
        .expect("block");
    store
        .task_add(add_request("Ready", TaskPriority::Low, &[]))
        .expect("add");

    let order = store
        .recommend_safe_order(&["TASK-001".to_string(), "TASK-002".to_string()])
        .expect("order");
    assert_eq!(order, vec!["TASK-002", "TASK-001"]);
}

#[test]
fn recommend_safe_order_rejects_unknown_ids() {
    let storage_dir = temp_dir("recommend_safe_order_rejects_unknown_ids");
    let store = SqliteStore::open(&storage_dir).expect("open store");
    let err = store
        .recommend_safe_order(&["TASK-404".to_string()])
        .expect_err("expected failure");
    assert!(matches!(err, StoreError::NotFound { .. }), "got {err}");
}
