#![forbid(unsafe_code)]

use serde_json::{Value, json};
use td_storage::StoreError;

/// Maps a storage failure to the envelope error codes tools report.
pub(crate) fn store_error_to_ai(err: StoreError) -> Value {
    match err {
        StoreError::Io(e) => ai_error("IO", &format!("IO: {e}")),
        StoreError::Sql(e) => ai_error("SQL", &format!("SQL: {e}")),
        StoreError::InvalidInput(msg) => ai_error("VALIDATION", msg),
        StoreError::DuplicateId { id } => {
            ai_error("DUPLICATE_ID", &format!("duplicate task id: {id}"))
        }
        StoreError::NotFound { id } => ai_error("NOT_FOUND", &format!("task not found: {id}")),
        StoreError::DependencyCycle { cycle } => ai_error(
            "VALIDATION",
            &format!("dependency cycle: {}", td_core::graph::format_cycle(&cycle)),
        ),
        StoreError::StaleOperation { seq, reason } => ai_error(
            "STALE_OPERATION",
            &format!("stale operation (seq={seq}): {reason}"),
        ),
    }
}

pub(crate) fn ai_ok(intent: &str, result: Value) -> Value {
    json!({
        "success": true,
        "intent": intent,
        "result": result,
        "warnings": [],
        "refs": [],
        "error": null
    })
}

pub(crate) fn ai_error(code: &str, message: &str) -> Value {
    json!({
        "success": false,
        "intent": "error",
        "result": {},
        "warnings": [],
        "refs": [],
        "error": { "code": code, "message": message.trim() }
    })
}

pub(crate) fn error_unknown_tool(name: &str) -> Value {
    ai_error("UNKNOWN_TOOL", &format!("Unknown tool: {name}"))
}

pub(crate) fn error_internal(message: String) -> Value {
    ai_error("INTERNAL", &message)
}
