#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use td_core::model::{TaskPriority, TaskStatus};
use td_core::validate::TaskDraft;

#[derive(Clone, Debug, PartialEq)]
pub struct TaskRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub depends_on: Vec<String>,
    pub files_to_edit: Vec<String>,
    pub related_kb: Vec<String>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub created_at_ms: i64,
    pub started_at_ms: Option<i64>,
    pub completed_at_ms: Option<i64>,
}

#[derive(Clone, Debug)]
pub struct TaskAddRequest {
    pub name: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub depends_on: Vec<String>,
    pub files_to_edit: Vec<String>,
    pub related_kb: Vec<String>,
    pub estimated_hours: Option<f64>,
}

/// What to do when a batch import hits an invalid entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryStrategy {
    Rollback,
    Skip,
    Abort,
}

impl RecoveryStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rollback => "rollback",
            Self::Skip => "skip",
            Self::Abort => "abort",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "rollback" => Some(Self::Rollback),
            "skip" => Some(Self::Skip),
            "abort" => Some(Self::Abort),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TaskImportRequest {
    pub drafts: Vec<TaskDraft>,
    pub dry_run: bool,
    pub skip_validation: bool,
    pub skip_confirmation: bool,
    pub confirmation_threshold: usize,
    pub on_error: RecoveryStrategy,
}

impl TaskImportRequest {
    pub fn new(drafts: Vec<TaskDraft>) -> Self {
        Self {
            drafts,
            dry_run: false,
            skip_validation: false,
            skip_confirmation: false,
            confirmation_threshold: 10,
            on_error: RecoveryStrategy::Rollback,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportStatus {
    Success,
    Partial,
    Error,
    ConfirmationRequired,
}

impl ImportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Error => "error",
            Self::ConfirmationRequired => "confirmation_required",
        }
    }
}

#[derive(Clone, Debug)]
pub struct TaskSummary {
    pub name: String,
    pub priority: String,
    pub estimated_hours: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct ImportPreview {
    pub task_count: usize,
    pub total_estimated_hours: f64,
    pub by_priority: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
    pub tasks_summary: Vec<TaskSummary>,
}

/// An in-progress task editing one of the files being checked.
#[derive(Clone, Debug)]
pub struct FileConflict {
    pub task_id: String,
    pub task_name: String,
    pub status: String,
    pub overlapping_files: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct NextTask {
    pub id: String,
    pub name: String,
    pub priority: String,
}

#[derive(Clone, Debug)]
pub struct TaskImportOutcome {
    pub status: ImportStatus,
    pub imported: usize,
    pub task_ids: Vec<String>,
    pub errors: Vec<String>,
    pub skipped: Vec<String>,
    pub next_task: Option<NextTask>,
    pub tasks_to_create: Option<usize>,
    pub preview: Option<ImportPreview>,
}
