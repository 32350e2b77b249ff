//! MCP (Model Context Protocol) module

pub mod dispatcher;
pub mod session;
pub mod sse;
pub mod types;

pub use dispatcher::{
    negotiate_protocol_version, parse_request, Dispatcher, ServerContext,
    LATEST_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS,
};
pub use session::{SessionHandle, SessionId, SessionManager, SessionState};
pub use sse::SseEvent;
