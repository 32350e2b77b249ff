//! Tools module - capability registry and the built-in tools

pub mod calculator;
pub mod server_info;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::McpError;
use crate::mcp::types::{ContentBlock, ServerInfo, Tool};

pub use calculator::{CalculatorTool, Number, Operation};
pub use server_info::server_info_tool;

/// Parameter mapping handed to a tool
pub type Arguments = Map<String, Value>;

/// Executable side of a tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn execute(&self, arguments: &Arguments) -> Result<Vec<ContentBlock>, McpError>;
}

/// What a simple tool function returns
#[derive(Debug, Clone, PartialEq)]
pub enum SimpleOutput {
    Text(String),
    Json(Value),
}

impl From<String> for SimpleOutput {
    fn from(text: String) -> Self {
        SimpleOutput::Text(text)
    }
}

impl From<&str> for SimpleOutput {
    fn from(text: &str) -> Self {
        SimpleOutput::Text(text.to_string())
    }
}

impl From<Value> for SimpleOutput {
    fn from(value: Value) -> Self {
        SimpleOutput::Json(value)
    }
}

type SimpleFn = Arc<dyn Fn(&Arguments) -> Result<SimpleOutput, McpError> + Send + Sync>;

/// Tool backed by a plain function; JSON output is rendered pretty-printed in one text block
#[derive(Clone)]
pub struct SimpleTool {
    handler: SimpleFn,
}

impl SimpleTool {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&Arguments) -> Result<SimpleOutput, McpError> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
        }
    }
}

#[async_trait]
impl ToolHandler for SimpleTool {
    async fn execute(&self, arguments: &Arguments) -> Result<Vec<ContentBlock>, McpError> {
        let text = match (self.handler)(arguments)? {
            SimpleOutput::Text(text) => text,
            SimpleOutput::Json(value) => {
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
            }
        };
        Ok(vec![ContentBlock::text(text)])
    }
}

/// Build an object input schema from a property map and the required names
pub fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// A registered tool
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler,
        }
    }

    /// Convenience for `SimpleTool` backed descriptors
    pub fn simple<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(&Arguments) -> Result<SimpleOutput, McpError> + Send + Sync + 'static,
    {
        Self::new(
            name,
            description,
            input_schema,
            Arc::new(SimpleTool::new(handler)),
        )
    }

    /// Names listed under the schema's `required` array
    pub fn required_fields(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|fields| fields.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Name-keyed tool set, kept in registration order
#[derive(Debug, Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the calculators and `get_server_info`
    pub fn with_defaults(server_info: &ServerInfo) -> Self {
        let mut registry = Self::new();
        for operation in Operation::ALL {
            registry.register(CalculatorTool::new(operation).descriptor());
        }
        registry.register(server_info_tool(server_info));
        registry
    }

    /// Insert, or replace in place when the name is already taken
    pub fn register(&mut self, descriptor: ToolDescriptor) {
        match self.tools.iter_mut().find(|t| t.name == descriptor.name) {
            Some(existing) => {
                debug!("Replacing tool {}", descriptor.name);
                *existing = descriptor;
            }
            None => self.tools.push(descriptor),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn list(&self) -> Vec<Tool> {
        self.tools.iter().map(ToolDescriptor::to_tool).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Resolve, validate required fields and run a tool
    pub async fn execute(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> Result<Vec<ContentBlock>, McpError> {
        let tool = self.get(name).ok_or_else(|| McpError::unknown_tool(name))?;

        let arguments = match arguments {
            None | Some(Value::Null) => Arguments::new(),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(McpError::invalid_argument(
                    "Tool arguments must be a JSON object",
                ))
            }
        };

        if let Some(missing) = tool
            .required_fields()
            .into_iter()
            .find(|field| !arguments.contains_key(*field))
        {
            return Err(McpError::invalid_argument(format!(
                "Missing required argument: {}",
                missing
            )));
        }

        debug!("Executing tool {}", name);
        tool.handler.execute(&arguments).await
    }
}
