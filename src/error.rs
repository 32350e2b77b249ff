//! Error taxonomy shared by the registry, catalog, session channel and dispatcher

use std::fmt;

use thiserror::Error;

/// JSON-RPC error codes used on the wire
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const RESOURCE_NOT_FOUND: i64 = -32002;
}

/// What kind of entry a lookup failed to find
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum NotFoundKind {
    Tool,
    Resource,
    Prompt,
}

impl fmt::Display for NotFoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundKind::Tool => f.write_str("Unknown tool"),
            NotFoundKind::Resource => f.write_str("Resource not found"),
            NotFoundKind::Prompt => f.write_str("Unknown prompt"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum McpError {
    #[error("{kind}: {name}")]
    NotFound { kind: NotFoundKind, name: String },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Could not find session: {0}")]
    SessionNotFound(String),

    #[error("Session {0} is not keeping up, retry later")]
    SessionBusy(String),

    #[error("{0}")]
    Protocol(String),
}

impl McpError {
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        McpError::NotFound {
            kind: NotFoundKind::Tool,
            name: name.into(),
        }
    }

    pub fn resource_not_found(uri: impl Into<String>) -> Self {
        McpError::NotFound {
            kind: NotFoundKind::Resource,
            name: uri.into(),
        }
    }

    pub fn unknown_prompt(name: impl Into<String>) -> Self {
        McpError::NotFound {
            kind: NotFoundKind::Prompt,
            name: name.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        McpError::InvalidArgument(message.into())
    }

    /// JSON-RPC code reported when this error becomes a protocol-level response
    pub fn json_rpc_code(&self) -> i64 {
        match self {
            McpError::NotFound {
                kind: NotFoundKind::Resource,
                ..
            } => codes::RESOURCE_NOT_FOUND,
            McpError::NotFound { .. } | McpError::InvalidArgument(_) => codes::INVALID_PARAMS,
            McpError::SessionNotFound(_) => codes::INVALID_REQUEST,
            McpError::SessionBusy(_) => codes::INTERNAL_ERROR,
            McpError::Protocol(_) => codes::INVALID_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_tool_message() {
        let err = McpError::unknown_tool("nonexistent");
        assert_eq!(err.to_string(), "Unknown tool: nonexistent");
    }

    #[test]
    fn test_resource_not_found_code() {
        let err = McpError::resource_not_found("config://nope");
        assert_eq!(err.to_string(), "Resource not found: config://nope");
        assert_eq!(err.json_rpc_code(), codes::RESOURCE_NOT_FOUND);
    }

    #[test]
    fn test_prompt_and_argument_codes() {
        assert_eq!(
            McpError::unknown_prompt("x").json_rpc_code(),
            codes::INVALID_PARAMS
        );
        assert_eq!(
            McpError::invalid_argument("bad").json_rpc_code(),
            codes::INVALID_PARAMS
        );
        assert_eq!(
            McpError::Protocol("bad frame".to_string()).json_rpc_code(),
            codes::INVALID_REQUEST
        );
    }

    #[test]
    fn test_session_busy_message() {
        let err = McpError::SessionBusy("abc".to_string());
        assert_eq!(err.to_string(), "Session abc is not keeping up, retry later");
        assert_eq!(err.json_rpc_code(), codes::INTERNAL_ERROR);
    }
}
