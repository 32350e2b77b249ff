//! get_server_info tool

use serde_json::json;

use super::{object_schema, ToolDescriptor};
use crate::mcp::types::ServerInfo;

pub const SERVER_INFO_TOOL: &str = "get_server_info";

pub fn server_info_tool(info: &ServerInfo) -> ToolDescriptor {
    let payload = json!({
        "server": info.name,
        "version": info.version,
        "status": "running",
    });

    ToolDescriptor::simple(
        SERVER_INFO_TOOL,
        "Get information about the MCP server",
        object_schema(json!({}), &[]),
        move |_| Ok(payload.clone().into()),
    )
}
