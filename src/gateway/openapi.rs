//! OpenAPI document for the gateway routes

use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::config::Settings;
use crate::health::HealthResponse;
use crate::mcp::types::JsonRpcRequest;

/// Error body returned by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        super::server::health_check,
        super::server::sse_stream,
        super::server::post_message,
    ),
    components(schemas(HealthResponse, JsonRpcRequest, ErrorResponse)),
    tags(
        (name = "mcp", description = "Model Context Protocol transport"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

/// Document with the configured prefix applied to every path
pub fn document(settings: &Settings) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = settings.app_name.clone();
    doc.info.version = settings.version.clone();
    doc.info.description = Some(settings.description.clone());

    let paths = std::mem::take(&mut doc.paths.paths);
    doc.paths.paths = paths
        .into_iter()
        .map(|(path, item)| (settings.route(&path), item))
        .collect();
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_applies_prefix() {
        let settings = Settings::from_lookup(|key| match key {
            "API_V1_STR" => Some("/api/mcp".to_string()),
            "APP_NAME" => Some("Docs Server".to_string()),
            _ => None,
        })
        .unwrap();

        let doc = document(&settings);
        assert_eq!(doc.info.title, "Docs Server");
        assert!(doc.paths.paths.contains_key("/api/mcp/health"));
        assert!(doc.paths.paths.contains_key("/api/mcp/sse"));
        assert!(doc.paths.paths.contains_key("/api/mcp/messages"));
        assert!(!doc.paths.paths.contains_key("/health"));
    }
}
