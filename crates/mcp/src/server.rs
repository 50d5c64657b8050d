#![forbid(unsafe_code)]

use crate::McpServer;
use serde_json::{Value, json};

impl McpServer {
    pub(crate) fn handle(&mut self, request: crate::JsonRpcRequest) -> Option<Value> {
        let method = request.method.as_str();
        let expects_response = !matches!(request.id.as_ref(), None | Some(Value::Null));

        if method == "initialize" {
            // Some clients are strict about the server echoing the chosen protocol
            // version; reflect theirs back when present.
            let protocol_version = request
                .params
                .as_ref()
                .and_then(|v| v.get("protocolVersion"))
                .and_then(|v| v.as_str())
                .unwrap_or(crate::MCP_VERSION);

            return Some(crate::json_rpc_response(
                request.id,
                json!({
                    "protocolVersion": protocol_version,
                    "serverInfo": {
                        "name": crate::SERVER_NAME,
                        "version": crate::SERVER_VERSION
                    },
                    // Advertise the optional surfaces we implement as deterministic,
                    // empty stubs. Some clients probe these by default and may treat
                    // "method not found" as a hard failure.
                    "capabilities": {
                        "tools": {},
                        "resources": {},
                        "prompts": {},
                        "logging": {}
                    }
                }),
            ));
        }

        // The protocol names this `notifications/initialized`; some clients send a plain
        // `initialized`. Accept both and never respond (notification).
        if method == "notifications/initialized" || method == "initialized" {
            self.initialized = true;
            return None;
        }

        if !self.initialized {
            if expects_response {
                return Some(crate::json_rpc_error(
                    request.id,
                    -32002,
                    "Server not initialized",
                ));
            }
            // Unknown notification before initialization: ignore.
            return None;
        }

        if method == "ping" {
            return Some(crate::json_rpc_response(request.id, json!({})));
        }

        // Optional surfaces some clients probe unconditionally: keep them
        // deterministic and empty.
        if method == "resources/list" {
            return Some(crate::json_rpc_response(
                request.id,
                json!({ "resources": [] }),
            ));
        }
        if method == "resources/templates/list" {
            return Some(crate::json_rpc_response(
                request.id,
                json!({ "resourceTemplates": [] }),
            ));
        }
        if method == "resources/read" {
            return Some(crate::json_rpc_response(
                request.id,
                json!({ "contents": [] }),
            ));
        }
        if method == "prompts/list" {
            return Some(crate::json_rpc_response(
                request.id,
                json!({ "prompts": [] }),
            ));
        }

        if method == "tools/list" {
            let tools = crate::tools::tool_definitions();
            return Some(crate::json_rpc_response(
                request.id,
                json!({ "tools": tools }),
            ));
        }

        if method == "tools/call" {
            let Some(params) = request.params else {
                return Some(crate::json_rpc_error(
                    request.id,
                    -32602,
                    "params must be an object",
                ));
            };
            let Some(params_obj) = params.as_object() else {
                return Some(crate::json_rpc_error(
                    request.id,
                    -32602,
                    "params must be an object",
                ));
            };

            let tool_name = params_obj
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            // Some clients send `"arguments": null` for empty-args tools. Treat
            // missing/null as `{}` but keep non-object values as-is so tool
            // validators can return a precise INVALID_ARGS error.
            let args = match params_obj.get("arguments") {
                None | Some(Value::Null) => json!({}),
                Some(v) => v.clone(),
            };
            let response_body = self.call_tool(tool_name, args);

            return Some(crate::json_rpc_response(
                request.id,
                json!({
                    "content": [crate::tool_text_content(&response_body)],
                    "isError": !response_body.get("success").and_then(|v| v.as_bool()).unwrap_or(false)
                }),
            ));
        }

        // Notifications (no id / id=null) must not receive a response, even if unknown.
        if !expects_response {
            return None;
        }

        Some(crate::json_rpc_error(
            request.id,
            -32601,
            &format!("Method not found: {method}"),
        ))
    }

    pub(crate) fn call_tool(&mut self, name: &str, args: Value) -> Value {
        let name = name.trim();
        if !crate::tools::is_known_tool(name) {
            return crate::error_unknown_tool(name);
        }
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            crate::tools::dispatch_tool(self, name, args)
                .unwrap_or_else(|| crate::error_unknown_tool(name))
        }));

        match result {
            Ok(resp) => resp,
            Err(_) => crate::error_internal(format!("Internal panic while handling {name}")),
        }
    }
}
