#![forbid(unsafe_code)]

mod support;
use support::*;

use serde_json::json;

#[test]
fn initialize_echoes_protocol_version_and_server_info() {
    let mut server = Server::start("initialize_echoes_protocol_version");

    let init = server.request(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": { "protocolVersion": "2024-11-05", "capabilities": {}, "clientInfo": { "name": "test", "version": "0" } }
    }));
    let result = init.get("result").expect("initialize result");
    assert_eq!(
        result.get("protocolVersion").and_then(|v| v.as_str()),
        Some("2024-11-05")
    );
    assert_eq!(
        result
            .get("serverInfo")
            .and_then(|v| v.get("name"))
            .and_then(|v| v.as_str()),
        Some("taskdeck-mcp")
    );
}

#[test]
fn requests_before_initialize_are_rejected() {
    let mut server = Server::start("requests_before_initialize_are_rejected");
    let resp = server.request(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/list",
        "params": {}
    }));
    assert_json_rpc_error(&resp, -32002);
}

#[test]
fn ping_and_empty_resource_surfaces() {
    let mut server = Server::start_initialized("ping_and_empty_resource_surfaces");

    let ping = server.request(json!({ "jsonrpc": "2.0", "id": 5, "method": "ping" }));
    assert!(ping.get("result").is_some());

    let resources = server.request(json!({
        "jsonrpc": "2.0",
        "id": 6,
        "method": "resources/list",
        "params": {}
    }));
    assert_eq!(
        resources
            .get("result")
            .and_then(|v| v.get("resources"))
            .and_then(|v| v.as_array())
            .map(Vec::len),
        Some(0)
    );
}

#[test]
fn unknown_method_returns_method_not_found() {
    let mut server = Server::start_initialized("unknown_method_returns_method_not_found");
    let resp = server.request(json!({
        "jsonrpc": "2.0",
        "id": 7,
        "method": "definitely/not/a/method",
        "params": {}
    }));
    assert_json_rpc_error(&resp, -32601);
}

#[test]
fn tools_list_advertises_the_full_surface() {
    let mut server = Server::start_initialized("tools_list_advertises_the_full_surface");
    let resp = server.request(json!({
        "jsonrpc": "2.0",
        "id": 8,
        "method": "tools/list",
        "params": {}
    }));
    let tools = resp
        .get("result")
        .and_then(|v| v.get("tools"))
        .and_then(|v| v.as_array())
        .expect("result.tools");

    let mut names = tools
        .iter()
        .filter_map(|tool| tool.get("name").and_then(|v| v.as_str()))
        .collect::<Vec<_>>();
    names.sort_unstable();
    assert_eq!(
        names,
        vec![
            "check_file_conflicts",
            "detect_conflicts",
            "list_operations",
            "recommend_safe_order",
            "task_add",
            "task_delete",
            "task_get",
            "task_import",
            "task_list",
            "task_next",
            "task_update",
            "undo_last_operation",
        ]
    );
}

#[test]
fn unknown_tool_is_a_tool_error_not_a_protocol_error() {
    let mut server = Server::start_initialized("unknown_tool_is_a_tool_error");
    let resp = server.request(json!({
        "jsonrpc": "2.0",
        "id": 9,
        "method": "tools/call",
        "params": { "name": "kb_search", "arguments": {} }
    }));
    assert_eq!(
        resp.get("result")
            .and_then(|v| v.get("isError"))
            .and_then(|v| v.as_bool()),
        Some(true)
    );
    let payload = extract_tool_text(&resp);
    assert_tool_error(&payload, "UNKNOWN_TOOL");
}

#[test]
fn parse_error_and_invalid_request_frames() {
    let mut server = Server::start("parse_error_and_invalid_request_frames");

    server.send_raw_line("{ this is not json");
    let resp = server.recv();
    assert_json_rpc_error(&resp, -32700);

    let resp = server.request(json!({ "jsonrpc": "2.0", "id": 2 }));
    assert_json_rpc_error(&resp, -32600);
}

#[test]
fn notifications_produce_no_response() {
    let mut server = Server::start_initialized("notifications_produce_no_response");

    // A notification (no id) for an unknown method must be ignored; the
    // next real request is answered in order.
    server.send(json!({ "jsonrpc": "2.0", "method": "unknown/notification" }));
    let ping = server.request(json!({ "jsonrpc": "2.0", "id": 3, "method": "ping" }));
    assert_eq!(ping.get("id").and_then(|v| v.as_i64()), Some(3));
}
