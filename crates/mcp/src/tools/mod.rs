#![forbid(unsafe_code)]

mod conflicts;
mod history;
mod import;
mod tasks;

use crate::McpServer;
use serde_json::{Value, json};

pub(crate) fn is_known_tool(name: &str) -> bool {
    matches!(
        name,
        "task_add"
            | "task_get"
            | "task_list"
            | "task_update"
            | "task_delete"
            | "task_next"
            | "task_import"
            | "detect_conflicts"
            | "recommend_safe_order"
            | "check_file_conflicts"
            | "list_operations"
            | "undo_last_operation"
    )
}

pub(crate) fn dispatch_tool(server: &mut McpServer, name: &str, args: Value) -> Option<Value> {
    let resp = match name {
        "task_add" => tasks::task_add(server, args),
        "task_get" => tasks::task_get(server, args),
        "task_list" => tasks::task_list(server, args),
        "task_update" => tasks::task_update(server, args),
        "task_delete" => tasks::task_delete(server, args),
        "task_next" => tasks::task_next(server, args),
        "task_import" => import::task_import(server, args),
        "detect_conflicts" => conflicts::detect_conflicts(server, args),
        "recommend_safe_order" => conflicts::recommend_safe_order(server, args),
        "check_file_conflicts" => conflicts::check_file_conflicts(server, args),
        "list_operations" => history::list_operations(server, args),
        "undo_last_operation" => history::undo_last_operation(server, args),
        _ => return None,
    };
    Some(resp)
}

pub(crate) fn tool_definitions() -> Vec<Value> {
    vec![
        json!({
            "name": "task_add",
            "description": "Create a task. Dependencies must reference existing task ids.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "description": { "type": "string" },
                    "priority": { "type": "string", "enum": ["low", "medium", "high", "critical"] },
                    "depends_on": { "type": "array", "items": { "type": "string" } },
                    "files_to_edit": { "type": "array", "items": { "type": "string" } },
                    "related_kb": { "type": "array", "items": { "type": "string" } },
                    "estimated_hours": { "type": "number" }
                },
                "required": ["name"]
            }
        }),
        json!({
            "name": "task_get",
            "description": "Fetch one task by id.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "task_id": { "type": "string" }
                },
                "required": ["task_id"]
            }
        }),
        json!({
            "name": "task_list",
            "description": "List tasks, optionally filtered by status and/or priority.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "status": { "type": "string", "enum": ["pending", "in_progress", "completed", "blocked"] },
                    "priority": { "type": "string", "enum": ["low", "medium", "high", "critical"] }
                },
                "required": []
            }
        }),
        json!({
            "name": "task_update",
            "description": "Apply a partial update to a task. Moving to in_progress/completed stamps the matching timestamp.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "task_id": { "type": "string" },
                    "name": { "type": "string" },
                    "description": { "type": "string" },
                    "status": { "type": "string", "enum": ["pending", "in_progress", "completed", "blocked"] },
                    "priority": { "type": "string", "enum": ["low", "medium", "high", "critical"] },
                    "estimated_hours": { "type": "number" },
                    "actual_hours": { "type": "number" }
                },
                "required": ["task_id"]
            }
        }),
        json!({
            "name": "task_delete",
            "description": "Delete a task by id.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "task_id": { "type": "string" }
                },
                "required": ["task_id"]
            }
        }),
        json!({
            "name": "task_next",
            "description": "Recommend the next task: highest-priority pending task whose dependencies are all completed.",
            "inputSchema": {
                "type": "object",
                "properties": {},
                "required": []
            }
        }),
        json!({
            "name": "task_import",
            "description": "Import a batch of tasks from a YAML document (`tasks: [...]`) with a recovery strategy.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "yaml": { "type": "string" },
                    "dry_run": { "type": "boolean" },
                    "skip_validation": { "type": "boolean" },
                    "skip_confirmation": { "type": "boolean" },
                    "confirmation_threshold": { "type": "integer" },
                    "on_error": { "type": "string", "enum": ["rollback", "skip", "abort"] }
                },
                "required": ["yaml"]
            }
        }),
        json!({
            "name": "detect_conflicts",
            "description": "File-overlap conflicts between a task and every in-progress task, with risk scores.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "task_id": { "type": "string" }
                },
                "required": ["task_id"]
            }
        }),
        json!({
            "name": "recommend_safe_order",
            "description": "Order a set of tasks so dependencies come first and risky overlaps are minimized.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "task_ids": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["task_ids"]
            }
        }),
        json!({
            "name": "check_file_conflicts",
            "description": "Which in-progress tasks are editing any of the given files.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "files": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["files"]
            }
        }),
        json!({
            "name": "list_operations",
            "description": "Recent operations, newest first (default limit 10).",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "limit": { "type": "integer" }
                },
                "required": []
            }
        }),
        json!({
            "name": "undo_last_operation",
            "description": "Reverse the most recent not-yet-undone operation.",
            "inputSchema": {
                "type": "object",
                "properties": {},
                "required": []
            }
        }),
    ]
}
