//! Tests for MCP types module

use serde_json::json;
use sse_mcp::mcp::types::*;

#[test]
fn test_json_rpc_request_serialization() {
    let request = JsonRpcRequest::new(1, "tools/list", None);

    let json = serde_json::to_string(&request).unwrap();
    assert!(json.contains("\"jsonrpc\":\"2.0\""));
    assert!(json.contains("\"method\":\"tools/list\""));
    assert!(!json.contains("params"));

    let deserialized: JsonRpcRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized.method, "tools/list");
    assert!(!deserialized.is_notification());
}

#[test]
fn test_notification_has_no_id() {
    let request: JsonRpcRequest =
        serde_json::from_str(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .unwrap();
    assert!(request.is_notification());
}

#[test]
fn test_success_response_omits_error() {
    let response = JsonRpcResponse::success(Some(json!("abc")), json!({"ok": true}));
    let value = serde_json::to_value(&response).unwrap();

    assert_eq!(value["id"], "abc");
    assert_eq!(value["result"]["ok"], true);
    assert!(value.get("error").is_none());
}

#[test]
fn test_error_response_keeps_null_id() {
    let response = JsonRpcResponse::error(None, -32700, "Parse error".to_string());
    let value = serde_json::to_value(&response).unwrap();

    assert!(value.get("id").unwrap().is_null());
    assert_eq!(value["error"]["code"], -32700);
    assert!(value.get("result").is_none());
    assert!(response.is_error());
}

#[test]
fn test_content_block_tags() {
    let text = serde_json::to_value(ContentBlock::text("hi")).unwrap();
    assert_eq!(text, json!({"type": "text", "text": "hi"}));

    let image = serde_json::to_value(ContentBlock::Image {
        data: "aGk=".to_string(),
        mime_type: "image/png".to_string(),
    })
    .unwrap();
    assert_eq!(image["type"], "image");
    assert_eq!(image["mimeType"], "image/png");

    let embedded = serde_json::to_value(ContentBlock::EmbeddedResource {
        resource: ResourceContents::text("config://app", None, "body"),
    })
    .unwrap();
    assert_eq!(embedded["type"], "resource");
    assert_eq!(embedded["resource"]["uri"], "config://app");
    assert!(embedded["resource"].get("mimeType").is_none());
}

#[test]
fn test_content_block_as_text() {
    assert_eq!(ContentBlock::text("x").as_text(), Some("x"));
    let image = ContentBlock::Image {
        data: String::new(),
        mime_type: "image/png".to_string(),
    };
    assert!(image.as_text().is_none());
}

#[test]
fn test_initialize_params_camel_case() {
    let params: InitializeParams = serde_json::from_value(json!({
        "protocolVersion": "2025-06-18",
        "capabilities": {},
        "clientInfo": {"name": "inspector", "version": "0.9"}
    }))
    .unwrap();

    assert_eq!(params.protocol_version.as_deref(), Some("2025-06-18"));
    assert_eq!(params.client_info.unwrap().name, "inspector");
}

#[test]
fn test_initialize_result_wire_shape() {
    let result = InitializeResult {
        protocol_version: "2025-06-18".to_string(),
        capabilities: ServerCapabilities {
            tools: Some(ListChangedCapability {
                list_changed: false,
            }),
            resources: None,
            prompts: None,
        },
        server_info: ServerInfo {
            name: "srv".to_string(),
            version: "1".to_string(),
        },
        instructions: None,
    };

    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["protocolVersion"], "2025-06-18");
    assert_eq!(value["capabilities"]["tools"]["listChanged"], false);
    assert!(value["capabilities"].get("resources").is_none());
    assert_eq!(value["serverInfo"]["name"], "srv");
    assert!(value.get("instructions").is_none());
}

#[test]
fn test_tool_serializes_input_schema() {
    let tool = Tool {
        name: "calculate_sum".to_string(),
        description: "Calculate the sum of two numbers".to_string(),
        input_schema: json!({"type": "object"}),
    };
    let value = serde_json::to_value(&tool).unwrap();
    assert_eq!(value["inputSchema"]["type"], "object");
}

#[test]
fn test_call_tool_params_optional_fields() {
    let params: CallToolParams = serde_json::from_value(json!({})).unwrap();
    assert!(params.name.is_none());
    assert!(params.arguments.is_none());
}

#[test]
fn test_call_tool_result_is_error_flag() {
    let result = CallToolResult {
        content: vec![ContentBlock::text("Error: boom")],
        is_error: true,
    };
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["isError"], true);
}

#[test]
fn test_prompt_message_role() {
    let message = PromptMessage {
        role: Role::Assistant,
        content: ContentBlock::text("ok"),
    };
    let value = serde_json::to_value(&message).unwrap();
    assert_eq!(value["role"], "assistant");
}
