//! Protocol dispatcher - routes JSON-RPC requests to tools, resources and prompts

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::types::*;
use crate::catalog::Catalog;
use crate::config::Settings;
use crate::error::{codes, McpError};
use crate::tools::ToolRegistry;

pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

/// Echo a supported version, otherwise answer with the latest one
pub fn negotiate_protocol_version(requested: Option<&str>) -> String {
    match requested {
        Some(version) if SUPPORTED_PROTOCOL_VERSIONS.contains(&version) => version.to_string(),
        _ => LATEST_PROTOCOL_VERSION.to_string(),
    }
}

/// Everything a dispatcher needs, built once at startup and shared by all sessions
pub struct ServerContext {
    pub tools: ToolRegistry,
    pub catalog: Catalog,
    pub server_info: ServerInfo,
    pub instructions: Option<String>,
}

impl ServerContext {
    pub fn new(tools: ToolRegistry, catalog: Catalog, server_info: ServerInfo) -> Self {
        Self {
            tools,
            catalog,
            server_info,
            instructions: None,
        }
    }

    /// Built-in tools, `config://app` and the greeting prompt
    pub fn with_defaults(settings: Arc<Settings>) -> Self {
        let server_info = ServerInfo {
            name: settings.app_name.clone(),
            version: settings.version.clone(),
        };
        Self::new(
            ToolRegistry::with_defaults(&server_info),
            Catalog::with_defaults(settings),
            server_info,
        )
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities {
            tools: Some(ListChangedCapability {
                list_changed: false,
            }),
            resources: Some(ResourcesCapability {
                subscribe: false,
                list_changed: false,
            }),
            prompts: Some(ListChangedCapability {
                list_changed: false,
            }),
        }
    }
}

impl From<McpError> for JsonRpcError {
    fn from(err: McpError) -> Self {
        JsonRpcError {
            code: err.json_rpc_code(),
            message: err.to_string(),
            data: None,
        }
    }
}

type HandlerResult = Result<Value, JsonRpcError>;

fn rpc_error(code: i64, message: impl Into<String>) -> JsonRpcError {
    JsonRpcError {
        code,
        message: message.into(),
        data: None,
    }
}

fn to_result<T: Serialize>(value: T) -> HandlerResult {
    serde_json::to_value(value)
        .map_err(|e| rpc_error(codes::INTERNAL_ERROR, format!("Internal error: {}", e)))
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    let params = params.ok_or_else(|| rpc_error(codes::INVALID_PARAMS, "Missing params"))?;
    serde_json::from_value(params)
        .map_err(|e| rpc_error(codes::INVALID_PARAMS, format!("Invalid params: {}", e)))
}

/// Parse a raw message; failures come back as the error response to send
pub fn parse_request(raw: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_str(raw).map_err(|e| {
        JsonRpcResponse::error(None, codes::PARSE_ERROR, format!("Parse error: {}", e))
    })?;

    let id = value.get("id").filter(|id| !id.is_null()).cloned();
    let invalid =
        |message: String| JsonRpcResponse::error(id.clone(), codes::INVALID_REQUEST, message);

    if !value.is_object() {
        return Err(invalid("Invalid request: expected a JSON object".to_string()));
    }
    if !matches!(value.get("method"), Some(Value::String(_))) {
        return Err(invalid("Invalid request: missing method".to_string()));
    }

    let request: JsonRpcRequest = serde_json::from_value(value)
        .map_err(|e| invalid(format!("Invalid request: {}", e)))?;
    if request.jsonrpc != JSONRPC_VERSION {
        return Err(invalid(format!(
            "Invalid request: unsupported jsonrpc version {}",
            request.jsonrpc
        )));
    }
    Ok(request)
}

/// Per-session dispatcher; remembers the protocol version fixed by `initialize`
pub struct Dispatcher {
    context: Arc<ServerContext>,
    protocol_version: Option<String>,
}

impl Dispatcher {
    pub fn new(context: Arc<ServerContext>) -> Self {
        Self {
            context,
            protocol_version: None,
        }
    }

    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// Handle one raw inbound message. `None` for notifications.
    pub async fn handle_message(&mut self, raw: &str) -> Option<JsonRpcResponse> {
        match parse_request(raw) {
            Ok(request) => self.handle_request(request).await,
            Err(response) => {
                warn!(
                    "Rejected malformed message: {}",
                    response
                        .error
                        .as_ref()
                        .map(|e| e.message.as_str())
                        .unwrap_or_default()
                );
                Some(response)
            }
        }
    }

    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        // Requests without an id are notifications and never get a response
        if request.is_notification() {
            match request.method.as_str() {
                "notifications/initialized" | "initialized" => {
                    debug!("Client finished initialization")
                }
                "notifications/cancelled" => debug!("Client cancelled a request"),
                other => debug!("Received notification: {}", other),
            }
            return None;
        }

        let id = request.id;
        let params = request.params;
        let result = match request.method.as_str() {
            "initialize" => self.initialize(params),
            "ping" => Ok(json!({})),
            "tools/list" => to_result(ListToolsResult {
                tools: self.context.tools.list(),
            }),
            "tools/call" => self.call_tool(params).await,
            "resources/list" => to_result(ListResourcesResult {
                resources: self.context.catalog.list_resources(),
            }),
            "resources/read" => self.read_resource(params),
            "prompts/list" => to_result(ListPromptsResult {
                prompts: self.context.catalog.list_prompts(),
            }),
            "prompts/get" => self.get_prompt(params),
            other => Err(rpc_error(
                codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            )),
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => JsonRpcResponse {
                jsonrpc: JSONRPC_VERSION.to_string(),
                id,
                result: None,
                error: Some(error),
            },
        })
    }

    fn initialize(&mut self, params: Option<Value>) -> HandlerResult {
        let params: InitializeParams = match params {
            Some(_) => parse_params(params)?,
            None => InitializeParams::default(),
        };

        let protocol_version = match &self.protocol_version {
            Some(established) => established.clone(),
            None => {
                let negotiated = negotiate_protocol_version(params.protocol_version.as_deref());
                match &params.client_info {
                    Some(client) => info!(
                        "Initialized with {} {} (protocol {})",
                        client.name, client.version, negotiated
                    ),
                    None => info!("Initialized (protocol {})", negotiated),
                }
                self.protocol_version = Some(negotiated.clone());
                negotiated
            }
        };

        to_result(InitializeResult {
            protocol_version,
            capabilities: self.context.capabilities(),
            server_info: self.context.server_info.clone(),
            instructions: self.context.instructions.clone(),
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> HandlerResult {
        let params: CallToolParams = match params {
            Some(_) => parse_params(params)?,
            None => CallToolParams::default(),
        };

        let name = params.name.as_deref().unwrap_or_default();
        let outcome = if name.is_empty() {
            Err(McpError::invalid_argument("Missing tool name"))
        } else {
            self.context.tools.execute(name, params.arguments).await
        };

        let result = match outcome {
            Ok(content) => CallToolResult {
                content,
                is_error: false,
            },
            Err(e) => {
                warn!("Error executing tool {}: {}", name, e);
                CallToolResult {
                    content: vec![ContentBlock::text(format!("Error: {}", e))],
                    is_error: true,
                }
            }
        };
        to_result(result)
    }

    fn read_resource(&self, params: Option<Value>) -> HandlerResult {
        let params: ReadResourceParams = parse_params(params)?;
        let contents = self.context.catalog.read_resource(&params.uri)?;
        to_result(ReadResourceResult { contents })
    }

    fn get_prompt(&self, params: Option<Value>) -> HandlerResult {
        let params: GetPromptParams = parse_params(params)?;
        let result = self
            .context
            .catalog
            .render_prompt(&params.name, params.arguments.as_ref())?;
        to_result(result)
    }
}
