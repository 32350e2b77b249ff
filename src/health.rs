//! Health service consumed by the gateway's health endpoint

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::Settings;

/// Body of `GET {prefix}/health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
}

#[async_trait]
pub trait HealthService: Send + Sync {
    async fn check_health(&self) -> HealthResponse;
}

/// Reports the process as online with the configured version and environment
pub struct SystemHealthService {
    settings: Arc<Settings>,
}

impl SystemHealthService {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl HealthService for SystemHealthService {
    async fn check_health(&self) -> HealthResponse {
        HealthResponse {
            status: "online".to_string(),
            version: self.settings.version.clone(),
            environment: self.settings.environment.to_string(),
        }
    }
}
