#![forbid(unsafe_code)]

use crate::{
    McpServer, ai_error, ai_ok, optional_bool, optional_string, optional_usize, require_string,
    store_error_to_ai,
};
use serde::Deserialize;
use serde_json::{Value, json};
use td_core::validate::TaskDraft;
use td_storage::{ImportStatus, RecoveryStrategy, TaskImportOutcome, TaskImportRequest};

#[derive(Debug, Deserialize)]
struct ImportDocument {
    #[serde(default)]
    tasks: Vec<ImportEntry>,
}

// Enum-valued fields stay raw strings; validation happens in the store
// so the recovery strategy decides what an invalid entry means.
#[derive(Debug, Deserialize)]
struct ImportEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    depends_on: Vec<String>,
    #[serde(default)]
    files_to_edit: Vec<String>,
    #[serde(default)]
    related_kb: Vec<String>,
    #[serde(default)]
    estimated_hours: Option<f64>,
}

impl From<ImportEntry> for TaskDraft {
    fn from(entry: ImportEntry) -> Self {
        TaskDraft {
            name: entry.name,
            description: entry.description,
            status: entry.status,
            priority: entry.priority,
            depends_on: entry.depends_on,
            files_to_edit: entry.files_to_edit,
            related_kb: entry.related_kb,
            estimated_hours: entry.estimated_hours,
        }
    }
}

pub(crate) fn task_import(server: &mut McpServer, args: Value) -> Value {
    let args = match crate::args_object(&args) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let parsed = (|| {
        let yaml = require_string(args, "yaml")?;
        let document: ImportDocument = serde_yaml::from_str(&yaml)
            .map_err(|e| ai_error("VALIDATION", &format!("invalid YAML: {e}")))?;

        let mut request = TaskImportRequest::new(
            document.tasks.into_iter().map(TaskDraft::from).collect(),
        );
        if let Some(v) = optional_bool(args, "dry_run")? {
            request.dry_run = v;
        }
        if let Some(v) = optional_bool(args, "skip_validation")? {
            request.skip_validation = v;
        }
        if let Some(v) = optional_bool(args, "skip_confirmation")? {
            request.skip_confirmation = v;
        }
        if let Some(v) = optional_usize(args, "confirmation_threshold")? {
            request.confirmation_threshold = v;
        }
        if let Some(raw) = optional_string(args, "on_error")? {
            request.on_error = RecoveryStrategy::parse(&raw).ok_or_else(|| {
                ai_error(
                    "INVALID_ARGS",
                    &format!("invalid on_error '{raw}' (expected one of: rollback, skip, abort)"),
                )
            })?;
        }
        Ok(request)
    })();
    let request = match parsed {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match server.store.import_tasks(request) {
        Ok(outcome) => ai_ok("task_import", outcome_to_json(outcome)),
        Err(err) => store_error_to_ai(err),
    }
}

fn outcome_to_json(outcome: TaskImportOutcome) -> Value {
    let message = match outcome.status {
        ImportStatus::Success if outcome.task_ids.is_empty() => {
            "Validation passed; nothing imported (dry run)".to_string()
        }
        ImportStatus::Success => format!("Imported {} task(s)", outcome.imported),
        ImportStatus::Partial => format!(
            "Imported {} task(s), skipped {}",
            outcome.imported,
            outcome.skipped.len()
        ),
        ImportStatus::Error => "Import failed".to_string(),
        ImportStatus::ConfirmationRequired => format!(
            "Confirmation required to import {} task(s); retry with skip_confirmation=true",
            outcome.tasks_to_create.unwrap_or(0)
        ),
    };

    let mut result = json!({
        "status": outcome.status.as_str(),
        "imported": outcome.imported,
        "task_ids": outcome.task_ids,
        "errors": outcome.errors,
        "skipped": outcome.skipped,
        "message": message,
    });
    let Some(obj) = result.as_object_mut() else {
        return result;
    };
    if let Some(next) = outcome.next_task {
        obj.insert(
            "next_task".to_string(),
            json!({ "id": next.id, "name": next.name, "priority": next.priority }),
        );
    }
    if let Some(count) = outcome.tasks_to_create {
        obj.insert("tasks_to_create".to_string(), json!(count));
    }
    if let Some(preview) = outcome.preview {
        obj.insert(
            "preview".to_string(),
            json!({
                "task_count": preview.task_count,
                "total_estimated_hours": preview.total_estimated_hours,
                "by_priority": preview.by_priority,
                "by_status": preview.by_status,
                "tasks_summary": preview
                    .tasks_summary
                    .iter()
                    .map(|t| json!({
                        "name": t.name,
                        "priority": t.priority,
                        "estimated_hours": t.estimated_hours,
                    }))
                    .collect::<Vec<_>>(),
            }),
        );
    }
    result
}
