#![forbid(unsafe_code)]

use super::{FileConflict, SqliteStore, StoreError};
use std::collections::BTreeMap;
use td_core::conflict::{self, ConflictRecord, TaskFileSet};
use td_core::graph::{DependencyGraph, OrderKey};
use td_core::model::TaskStatus;

impl SqliteStore {
    /// File-overlap conflicts between the given task and every task that
    /// is currently in progress.
    pub fn detect_conflicts(&self, task_id: &str) -> Result<Vec<ConflictRecord>, StoreError> {
        let target = self.task_get(task_id)?;
        let target_set = TaskFileSet {
            id: &target.id,
            priority: target.priority,
            files: &target.files_to_edit,
        };
        let mut conflicts = Vec::new();
        for other in self.task_list(Some(TaskStatus::InProgress), None)? {
            if other.id == target.id {
                continue;
            }
            let other_set = TaskFileSet {
                id: &other.id,
                priority: other.priority,
                files: &other.files_to_edit,
            };
            if let Some(record) = conflict::detect(&target_set, &other_set) {
                conflicts.push(record);
            }
        }
        Ok(conflicts)
    }

    /// Which in-progress tasks are editing any of the given files. Tasks
    /// not yet started do not hold the files.
    pub fn check_file_conflicts(&self, files: &[String]) -> Result<Vec<FileConflict>, StoreError> {
        let mut hits = Vec::new();
        for task in self.task_list(Some(TaskStatus::InProgress), None)? {
            let overlapping = conflict::overlapping_files(files, &task.files_to_edit);
            if overlapping.is_empty() {
                continue;
            }
            hits.push(FileConflict {
                task_id: task.id,
                task_name: task.name,
                status: task.status.as_str().to_string(),
                overlapping_files: overlapping,
            });
        }
        Ok(hits)
    }

    /// Safe working order for a set of tasks: dependencies first, then
    /// unblocked before blocked, higher priority before lower, fewer
    /// files before more.
    pub fn recommend_safe_order(&self, task_ids: &[String]) -> Result<Vec<String>, StoreError> {
        let all = self.task_list(None, None)?;
        let mut graph = DependencyGraph::new();
        let mut keys: BTreeMap<String, OrderKey> = BTreeMap::new();
        let mut subset = Vec::new();
        for id in task_ids {
            let task = self.task_get(id)?;
            // Blocked either explicitly by status or by an incomplete
            // dependency.
            let blocked = task.status == TaskStatus::Blocked
                || task.depends_on.iter().any(|dep| {
                    !all.iter()
                        .any(|other| other.id == *dep && other.status == TaskStatus::Completed)
                });
            graph.add_node(&task.id, &task.depends_on);
            keys.insert(
                task.id.clone(),
                OrderKey(vec![
                    i64::from(blocked),
                    -task.priority.rank(),
                    task.files_to_edit.len() as i64,
                ]),
            );
            subset.push(task.id);
        }
        Ok(graph.topological_order(&subset, &keys))
    }
}
