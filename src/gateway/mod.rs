//! HTTP/SSE gateway

pub mod openapi;
mod server;

pub use openapi::{document as openapi_document, ApiDoc, ErrorResponse};
pub use server::{Gateway, GatewayBody, MAX_BODY_SIZE};
