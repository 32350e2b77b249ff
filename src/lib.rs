//! sse-mcp-server library - MCP server over Server-Sent Events with a POST message channel

pub mod catalog;
pub mod config;
pub mod error;
pub mod gateway;
pub mod health;
pub mod logging;
pub mod mcp;
pub mod tools;

// Re-export commonly used types
pub use catalog::Catalog;
pub use config::{CliOverrides, Environment, Settings};
pub use error::McpError;
pub use gateway::Gateway;
pub use mcp::{Dispatcher, ServerContext, SessionId, SessionManager};
pub use tools::ToolRegistry;
