#![forbid(unsafe_code)]

use crate::{
    McpServer, ai_error, ai_ok, optional_f64, optional_string, optional_string_array,
    require_string, store_error_to_ai, ts_ms_to_rfc3339,
};
use serde_json::{Value, json};
use td_core::model::{TaskPatch, TaskPriority, TaskStatus};
use td_storage::{TaskAddRequest, TaskRow};

pub(crate) fn task_detail(task: &TaskRow) -> Value {
    json!({
        "id": task.id,
        "name": task.name,
        "description": task.description,
        "status": task.status.as_str(),
        "priority": task.priority.as_str(),
        "depends_on": task.depends_on,
        "files_to_edit": task.files_to_edit,
        "related_kb": task.related_kb,
        "estimated_hours": task.estimated_hours,
        "actual_hours": task.actual_hours,
        "created_at": ts_ms_to_rfc3339(task.created_at_ms),
        "started_at": task.started_at_ms.map(ts_ms_to_rfc3339),
        "completed_at": task.completed_at_ms.map(ts_ms_to_rfc3339),
    })
}

fn parse_priority(raw: &str) -> Result<TaskPriority, Value> {
    TaskPriority::parse(raw).ok_or_else(|| {
        ai_error(
            "VALIDATION",
            &format!(
                "invalid priority '{raw}' (expected one of: {})",
                TaskPriority::supported_values()
            ),
        )
    })
}

fn parse_status(raw: &str) -> Result<TaskStatus, Value> {
    TaskStatus::parse(raw).ok_or_else(|| {
        ai_error(
            "VALIDATION",
            &format!(
                "invalid status '{raw}' (expected one of: {})",
                TaskStatus::supported_values()
            ),
        )
    })
}

pub(crate) fn task_add(server: &mut McpServer, args: Value) -> Value {
    let args = match crate::args_object(&args) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let parsed = (|| {
        let name = require_string(args, "name")?;
        let description = optional_string(args, "description")?;
        let priority = match optional_string(args, "priority")? {
            Some(raw) => parse_priority(&raw)?,
            None => TaskPriority::Medium,
        };
        let estimated_hours = optional_f64(args, "estimated_hours")?;
        if let Some(hours) = estimated_hours
            && !(hours.is_finite() && hours >= 0.0)
        {
            return Err(ai_error(
                "VALIDATION",
                "estimated_hours must be a non-negative number",
            ));
        }
        Ok(TaskAddRequest {
            name,
            description,
            priority,
            depends_on: optional_string_array(args, "depends_on")?.unwrap_or_default(),
            files_to_edit: optional_string_array(args, "files_to_edit")?.unwrap_or_default(),
            related_kb: optional_string_array(args, "related_kb")?.unwrap_or_default(),
            estimated_hours,
        })
    })();
    let request = match parsed {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match server.store.task_add(request) {
        Ok(task) => ai_ok(
            "task_add",
            json!({
                "task_id": task.id,
                "name": task.name,
                "priority": task.priority.as_str(),
                "message": format!("Added task {} ({})", task.id, task.name),
            }),
        ),
        Err(err) => store_error_to_ai(err),
    }
}

pub(crate) fn task_get(server: &mut McpServer, args: Value) -> Value {
    let args = match crate::args_object(&args) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let task_id = match require_string(args, "task_id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match server.store.task_get(&task_id) {
        Ok(task) => ai_ok("task_get", task_detail(&task)),
        Err(err) => store_error_to_ai(err),
    }
}

pub(crate) fn task_list(server: &mut McpServer, args: Value) -> Value {
    let args = match crate::args_object(&args) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let filters = (|| {
        let status = match optional_string(args, "status")? {
            Some(raw) => Some(parse_status(&raw)?),
            None => None,
        };
        let priority = match optional_string(args, "priority")? {
            Some(raw) => Some(parse_priority(&raw)?),
            None => None,
        };
        Ok((status, priority))
    })();
    let (status, priority) = match filters {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match server.store.task_list(status, priority) {
        Ok(tasks) => ai_ok(
            "task_list",
            json!({
                "count": tasks.len(),
                "tasks": tasks.iter().map(task_detail).collect::<Vec<_>>(),
            }),
        ),
        Err(err) => store_error_to_ai(err),
    }
}

pub(crate) fn task_update(server: &mut McpServer, args: Value) -> Value {
    let args = match crate::args_object(&args) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let parsed = (|| {
        let task_id = require_string(args, "task_id")?;
        let patch = TaskPatch {
            name: optional_string(args, "name")?,
            description: optional_string(args, "description")?.map(Some),
            status: match optional_string(args, "status")? {
                Some(raw) => Some(parse_status(&raw)?),
                None => None,
            },
            priority: match optional_string(args, "priority")? {
                Some(raw) => Some(parse_priority(&raw)?),
                None => None,
            },
            estimated_hours: optional_f64(args, "estimated_hours")?.map(Some),
            actual_hours: optional_f64(args, "actual_hours")?.map(Some),
        };
        Ok((task_id, patch))
    })();
    let (task_id, patch) = match parsed {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match server.store.task_update(&task_id, &patch) {
        Ok(task) => {
            let mut result = task_detail(&task);
            if let Some(obj) = result.as_object_mut() {
                obj.insert(
                    "message".to_string(),
                    Value::String(format!("Updated task {}", task.id)),
                );
            }
            ai_ok("task_update", result)
        }
        Err(err) => store_error_to_ai(err),
    }
}

pub(crate) fn task_delete(server: &mut McpServer, args: Value) -> Value {
    let args = match crate::args_object(&args) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let task_id = match require_string(args, "task_id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match server.store.task_delete(&task_id) {
        Ok(task) => ai_ok(
            "task_delete",
            json!({
                "task_id": task.id,
                "message": format!("Deleted task {} ({})", task.id, task.name),
            }),
        ),
        Err(err) => store_error_to_ai(err),
    }
}

pub(crate) fn task_next(server: &mut McpServer, _args: Value) -> Value {
    match server.store.next_task() {
        Ok(Some(task)) => ai_ok(
            "task_next",
            json!({
                "task": task_detail(&task),
                "message": format!("Work on {} next", task.id),
            }),
        ),
        Ok(None) => ai_ok(
            "task_next",
            json!({
                "task": null,
                "message": "No pending task is ready to start",
            }),
        ),
        Err(err) => store_error_to_ai(err),
    }
}
