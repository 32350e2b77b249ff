//! Tests for the protocol dispatcher

use std::sync::Arc;

use serde_json::{json, Value};

use sse_mcp::config::Settings;
use sse_mcp::error::codes;
use sse_mcp::mcp::types::{JsonRpcRequest, JsonRpcResponse};
use sse_mcp::mcp::{Dispatcher, ServerContext, LATEST_PROTOCOL_VERSION};

fn settings() -> Arc<Settings> {
    let settings = Settings::from_lookup(|key| match key {
        "APP_ENV" => Some("test".to_string()),
        "APP_NAME" => Some("Dispatch Server".to_string()),
        "VERSION" => Some("0.0.1".to_string()),
        _ => None,
    })
    .unwrap();
    Arc::new(settings)
}

fn context() -> Arc<ServerContext> {
    Arc::new(ServerContext::with_defaults(settings()))
}

async fn request(dispatcher: &mut Dispatcher, method: &str, params: Value) -> JsonRpcResponse {
    let params = if params.is_null() { None } else { Some(params) };
    dispatcher
        .handle_request(JsonRpcRequest::new(1, method, params))
        .await
        .unwrap()
}

fn result(response: JsonRpcResponse) -> Value {
    assert!(!response.is_error(), "unexpected error: {:?}", response.error);
    response.result.unwrap()
}

fn error_code(response: &JsonRpcResponse) -> i64 {
    response.error.as_ref().unwrap().code
}

// ========================================================================
// Lifecycle
// ========================================================================

#[tokio::test]
async fn test_initialize() {
    let mut dispatcher = Dispatcher::new(context());
    let value = result(
        request(
            &mut dispatcher,
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "test-client", "version": "1.0"}
            }),
        )
        .await,
    );

    assert_eq!(value["protocolVersion"], "2024-11-05");
    assert_eq!(value["serverInfo"]["name"], "Dispatch Server");
    assert_eq!(value["serverInfo"]["version"], "0.0.1");
    assert!(value["capabilities"]["tools"].is_object());
    assert!(value["capabilities"]["resources"].is_object());
    assert!(value["capabilities"]["prompts"].is_object());
}

#[tokio::test]
async fn test_initialize_advertises_instructions() {
    let guided = ServerContext::with_defaults(settings())
        .with_instructions("Use the calculators for arithmetic");
    let mut dispatcher = Dispatcher::new(Arc::new(guided));
    let value = result(request(&mut dispatcher, "initialize", json!({})).await);
    assert_eq!(value["instructions"], "Use the calculators for arithmetic");

    let mut plain = Dispatcher::new(context());
    let value = result(request(&mut plain, "initialize", json!({})).await);
    assert!(value.get("instructions").is_none());
}

#[tokio::test]
async fn test_initialize_unknown_version_gets_latest() {
    let mut dispatcher = Dispatcher::new(context());
    let value = result(
        request(
            &mut dispatcher,
            "initialize",
            json!({"protocolVersion": "1999-01-01"}),
        )
        .await,
    );
    assert_eq!(value["protocolVersion"], LATEST_PROTOCOL_VERSION);
}

#[tokio::test]
async fn test_protocol_version_fixed_by_first_initialize() {
    let mut dispatcher = Dispatcher::new(context());
    request(
        &mut dispatcher,
        "initialize",
        json!({"protocolVersion": "2025-03-26"}),
    )
    .await;

    let value = result(
        request(
            &mut dispatcher,
            "initialize",
            json!({"protocolVersion": "2024-11-05"}),
        )
        .await,
    );
    assert_eq!(value["protocolVersion"], "2025-03-26");
    assert_eq!(dispatcher.protocol_version(), Some("2025-03-26"));
}

#[tokio::test]
async fn test_ping() {
    let mut dispatcher = Dispatcher::new(context());
    assert_eq!(result(request(&mut dispatcher, "ping", Value::Null).await), json!({}));
}

#[tokio::test]
async fn test_notification_gets_no_response() {
    let mut dispatcher = Dispatcher::new(context());
    let response = dispatcher
        .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .await;
    assert!(response.is_none());
}

// ========================================================================
// Tools
// ========================================================================

#[tokio::test]
async fn test_tools_list() {
    let mut dispatcher = Dispatcher::new(context());
    let value = result(request(&mut dispatcher, "tools/list", Value::Null).await);
    let tools = value["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 5);
    assert!(tools.iter().any(|t| t["name"] == "calculate_divide"));
    assert!(tools[0]["inputSchema"].is_object());
}

#[tokio::test]
async fn test_tools_call() {
    let mut dispatcher = Dispatcher::new(context());
    let value = result(
        request(
            &mut dispatcher,
            "tools/call",
            json!({"name": "calculate_sum", "arguments": {"a": 40, "b": 2}}),
        )
        .await,
    );
    assert_eq!(value["content"][0]["type"], "text");
    assert_eq!(value["content"][0]["text"], "42");
    assert_eq!(value["isError"], false);
}

#[tokio::test]
async fn test_tools_call_divide_by_zero() {
    let mut dispatcher = Dispatcher::new(context());
    let value = result(
        request(
            &mut dispatcher,
            "tools/call",
            json!({"name": "calculate_divide", "arguments": {"a": 10, "b": 0}}),
        )
        .await,
    );
    assert!(value["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("Error"));
}

#[tokio::test]
async fn test_tools_call_unknown_tool_is_error_block() {
    let mut dispatcher = Dispatcher::new(context());
    let value = result(
        request(&mut dispatcher, "tools/call", json!({"name": "missing"})).await,
    );
    assert_eq!(value["isError"], true);
    assert!(value["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("Unknown tool: missing"));
}

#[tokio::test]
async fn test_tools_call_missing_name() {
    let mut dispatcher = Dispatcher::new(context());
    let value = result(request(&mut dispatcher, "tools/call", json!({})).await);
    assert_eq!(value["isError"], true);
}

// ========================================================================
// Resources and prompts
// ========================================================================

#[tokio::test]
async fn test_resources_read() {
    let mut dispatcher = Dispatcher::new(context());
    let value = result(
        request(
            &mut dispatcher,
            "resources/read",
            json!({"uri": "config://app"}),
        )
        .await,
    );
    let text = value["contents"][0]["text"].as_str().unwrap();
    assert!(text.contains("Dispatch Server"));
    assert!(text.contains("test"));
}

#[tokio::test]
async fn test_resources_read_unknown() {
    let mut dispatcher = Dispatcher::new(context());
    let response = request(
        &mut dispatcher,
        "resources/read",
        json!({"uri": "config://nope"}),
    )
    .await;
    assert_eq!(error_code(&response), codes::RESOURCE_NOT_FOUND);
}

#[tokio::test]
async fn test_resources_list() {
    let mut dispatcher = Dispatcher::new(context());
    let value = result(request(&mut dispatcher, "resources/list", Value::Null).await);
    assert_eq!(value["resources"][0]["uri"], "config://app");
    assert_eq!(value["resources"][0]["mimeType"], "text/plain");
}

#[tokio::test]
async fn test_prompts_get() {
    let mut dispatcher = Dispatcher::new(context());
    let value = result(
        request(
            &mut dispatcher,
            "prompts/get",
            json!({"name": "greeting", "arguments": {"name": "World"}}),
        )
        .await,
    );
    assert_eq!(value["messages"][0]["role"], "user");
    assert_eq!(
        value["messages"][0]["content"]["text"],
        "Hello, World! How can I help you today?"
    );
}

#[tokio::test]
async fn test_prompts_get_unknown() {
    let mut dispatcher = Dispatcher::new(context());
    let response = request(&mut dispatcher, "prompts/get", json!({"name": "nope"})).await;
    assert_eq!(error_code(&response), codes::INVALID_PARAMS);
}

#[tokio::test]
async fn test_prompts_list() {
    let mut dispatcher = Dispatcher::new(context());
    let value = result(request(&mut dispatcher, "prompts/list", Value::Null).await);
    assert_eq!(value["prompts"][0]["name"], "greeting");
    assert_eq!(value["prompts"][0]["arguments"][0]["name"], "name");
}

// ========================================================================
// Protocol errors
// ========================================================================

#[tokio::test]
async fn test_unknown_method() {
    let mut dispatcher = Dispatcher::new(context());
    let response = request(&mut dispatcher, "sampling/createMessage", Value::Null).await;
    assert_eq!(error_code(&response), codes::METHOD_NOT_FOUND);
    assert_eq!(response.id, Some(json!(1)));
}

#[tokio::test]
async fn test_parse_error_has_null_id() {
    let mut dispatcher = Dispatcher::new(context());
    let response = dispatcher.handle_message("{oops").await.unwrap();
    assert_eq!(error_code(&response), codes::PARSE_ERROR);

    let wire = serde_json::to_value(&response).unwrap();
    assert!(wire["id"].is_null());
}

#[tokio::test]
async fn test_invalid_params() {
    let mut dispatcher = Dispatcher::new(context());
    let response = request(&mut dispatcher, "resources/read", json!({"url": "x"})).await;
    assert_eq!(error_code(&response), codes::INVALID_PARAMS);
}
