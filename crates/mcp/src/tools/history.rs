#![forbid(unsafe_code)]

use crate::{McpServer, ai_ok, optional_usize, store_error_to_ai, ts_ms_to_rfc3339};
use serde_json::{Value, json};

const DEFAULT_HISTORY_LIMIT: usize = 10;

pub(crate) fn list_operations(server: &mut McpServer, args: Value) -> Value {
    let args = match crate::args_object(&args) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let limit = match optional_usize(args, "limit") {
        Ok(v) => v.unwrap_or(DEFAULT_HISTORY_LIMIT),
        Err(resp) => return resp,
    };

    match server.store.list_operations(limit) {
        Ok(operations) => ai_ok(
            "list_operations",
            json!({
                "count": operations.len(),
                "operations": operations
                    .iter()
                    .map(|op| json!({
                        "seq": op.seq,
                        "timestamp": ts_ms_to_rfc3339(op.ts_ms),
                        "operation_type": op.operation_type,
                        "description": op.description,
                        "undone": op.undone,
                    }))
                    .collect::<Vec<_>>(),
            }),
        ),
        Err(err) => store_error_to_ai(err),
    }
}

pub(crate) fn undo_last_operation(server: &mut McpServer, _args: Value) -> Value {
    match server.store.undo_last() {
        Ok(outcome) => ai_ok(
            "undo_last_operation",
            json!({
                "status": "success",
                "operation_type": outcome.operation_type,
                "description": outcome.description,
                "details": outcome.details,
                "message": format!("Undid: {}", outcome.description),
            }),
        ),
        Err(err) => store_error_to_ai(err),
    }
}
