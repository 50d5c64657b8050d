#![forbid(unsafe_code)]

use crate::{McpServer, ai_ok, require_string, require_string_array, store_error_to_ai};
use serde_json::{Value, json};
use td_core::conflict::ConflictRecord;

fn conflict_to_json(record: &ConflictRecord) -> Value {
    json!({
        "task_a_id": record.task_a_id,
        "task_b_id": record.task_b_id,
        "conflict_type": record.conflict_type,
        "risk_level": record.risk_level.as_str(),
        "risk_score": record.risk_score,
        "overlapping_files": record.overlapping_files,
        "details": record.details,
        "recommendation": record.recommendation,
    })
}

pub(crate) fn detect_conflicts(server: &mut McpServer, args: Value) -> Value {
    let args = match crate::args_object(&args) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let task_id = match require_string(args, "task_id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match server.store.detect_conflicts(&task_id) {
        Ok(conflicts) => ai_ok(
            "detect_conflicts",
            json!({
                "task_id": task_id,
                "conflict_count": conflicts.len(),
                "conflicts": conflicts.iter().map(conflict_to_json).collect::<Vec<_>>(),
            }),
        ),
        Err(err) => store_error_to_ai(err),
    }
}

pub(crate) fn recommend_safe_order(server: &mut McpServer, args: Value) -> Value {
    let args = match crate::args_object(&args) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let task_ids = match require_string_array(args, "task_ids") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match server.store.recommend_safe_order(&task_ids) {
        Ok(order) => ai_ok(
            "recommend_safe_order",
            json!({
                "task_count": order.len(),
                "recommended_order": order,
                "message": "Work through the tasks in this order to respect dependencies and minimize conflicting edits",
            }),
        ),
        Err(err) => store_error_to_ai(err),
    }
}

pub(crate) fn check_file_conflicts(server: &mut McpServer, args: Value) -> Value {
    let args = match crate::args_object(&args) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let files = match require_string_array(args, "files") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match server.store.check_file_conflicts(&files) {
        Ok(hits) => {
            let message = if hits.is_empty() {
                "No in_progress task is editing these files".to_string()
            } else {
                format!("{} in_progress task(s) are editing these files", hits.len())
            };
            ai_ok(
                "check_file_conflicts",
                json!({
                    "file_count": files.len(),
                    "files": files,
                    "conflicting_tasks": hits
                        .iter()
                        .map(|hit| json!({
                            "task_id": hit.task_id,
                            "task_name": hit.task_name,
                            "status": hit.status,
                            "overlapping_files": hit.overlapping_files,
                        }))
                        .collect::<Vec<_>>(),
                    "message": message,
                }),
            )
        }
        Err(err) => store_error_to_ai(err),
    }
}
