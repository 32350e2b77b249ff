//! Resource and prompt catalog

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::Settings;
use crate::error::McpError;
use crate::mcp::types::{
    ContentBlock, GetPromptResult, Prompt, PromptArgument, PromptMessage, Resource,
    ResourceContents, Role,
};

/// Produces the contents of a resource
pub type ResourceReader =
    Arc<dyn Fn(&ResourceDescriptor) -> Result<Vec<ResourceContents>, McpError> + Send + Sync>;

/// Renders a prompt from its resolved arguments
pub type PromptRenderer =
    Arc<dyn Fn(&HashMap<String, String>) -> Result<GetPromptResult, McpError> + Send + Sync>;

#[derive(Clone)]
pub struct ResourceDescriptor {
    pub uri: String,
    pub name: String,
    pub description: Option<String>,
    pub mime_type: Option<String>,
    reader: ResourceReader,
}

impl ResourceDescriptor {
    pub fn new(
        uri: impl Into<String>,
        name: impl Into<String>,
        mime_type: Option<String>,
        reader: ResourceReader,
    ) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: None,
            mime_type,
            reader,
        }
    }

    /// Resource whose contents are a single text produced on each read
    pub fn text<F>(
        uri: impl Into<String>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        render: F,
    ) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        let reader: ResourceReader = Arc::new(move |resource: &ResourceDescriptor| {
            Ok(vec![ResourceContents::text(
                resource.uri.clone(),
                resource.mime_type.clone(),
                render(),
            )])
        });
        Self::new(uri, name, Some(mime_type.into()), reader)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn to_resource(&self) -> Resource {
        Resource {
            uri: self.uri.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

/// Argument definition; `fallback` is used when the client leaves it out
#[derive(Debug, Clone, PartialEq)]
pub struct PromptArgumentSpec {
    pub name: String,
    pub description: Option<String>,
    pub required: bool,
    pub fallback: Option<String>,
}

impl PromptArgumentSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            required: false,
            fallback: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    /// Required and without a fallback
    pub fn is_strict(&self) -> bool {
        self.required && self.fallback.is_none()
    }
}

#[derive(Clone)]
pub struct PromptDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub arguments: Vec<PromptArgumentSpec>,
    renderer: PromptRenderer,
}

impl PromptDescriptor {
    pub fn new<F>(
        name: impl Into<String>,
        description: Option<String>,
        arguments: Vec<PromptArgumentSpec>,
        renderer: F,
    ) -> Self
    where
        F: Fn(&HashMap<String, String>) -> Result<GetPromptResult, McpError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            description,
            arguments,
            renderer: Arc::new(renderer),
        }
    }

    pub fn to_prompt(&self) -> Prompt {
        Prompt {
            name: self.name.clone(),
            description: self.description.clone(),
            arguments: self
                .arguments
                .iter()
                .map(|arg| PromptArgument {
                    name: arg.name.clone(),
                    description: arg.description.clone(),
                    required: arg.required,
                })
                .collect(),
        }
    }

    /// Fill in fallbacks and reject missing strict arguments
    pub fn resolve_arguments(
        &self,
        supplied: Option<&Map<String, Value>>,
    ) -> Result<HashMap<String, String>, McpError> {
        let mut resolved = HashMap::new();

        if let Some(supplied) = supplied {
            for (key, value) in supplied {
                let text = match value {
                    Value::String(s) => s.clone(),
                    Value::Null => continue,
                    other => other.to_string(),
                };
                resolved.insert(key.clone(), text);
            }
        }

        for arg in &self.arguments {
            if resolved.contains_key(&arg.name) {
                continue;
            }
            if let Some(fallback) = &arg.fallback {
                resolved.insert(arg.name.clone(), fallback.clone());
            } else if arg.required {
                return Err(McpError::invalid_argument(format!(
                    "Missing required argument: {}",
                    arg.name
                )));
            }
        }

        Ok(resolved)
    }
}

/// Exact-match lookup tables for resources and prompts
#[derive(Default, Clone)]
pub struct Catalog {
    resources: Vec<ResourceDescriptor>,
    prompts: Vec<PromptDescriptor>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with `config://app` and the `greeting` prompt
    pub fn with_defaults(settings: Arc<Settings>) -> Self {
        let mut catalog = Self::new();
        catalog.register_resource(app_config_resource(settings));
        catalog.register_prompt(greeting_prompt());
        catalog
    }

    pub fn register_resource(&mut self, resource: ResourceDescriptor) {
        match self.resources.iter_mut().find(|r| r.uri == resource.uri) {
            Some(existing) => *existing = resource,
            None => self.resources.push(resource),
        }
    }

    pub fn register_prompt(&mut self, prompt: PromptDescriptor) {
        match self.prompts.iter_mut().find(|p| p.name == prompt.name) {
            Some(existing) => *existing = prompt,
            None => self.prompts.push(prompt),
        }
    }

    pub fn list_resources(&self) -> Vec<Resource> {
        self.resources
            .iter()
            .map(ResourceDescriptor::to_resource)
            .collect()
    }

    pub fn list_prompts(&self) -> Vec<Prompt> {
        self.prompts.iter().map(PromptDescriptor::to_prompt).collect()
    }

    pub fn read_resource(&self, uri: &str) -> Result<Vec<ResourceContents>, McpError> {
        let resource = self
            .resources
            .iter()
            .find(|r| r.uri == uri)
            .ok_or_else(|| McpError::resource_not_found(uri))?;
        debug!("Reading resource {}", uri);
        (resource.reader)(resource)
    }

    pub fn render_prompt(
        &self,
        name: &str,
        arguments: Option<&Map<String, Value>>,
    ) -> Result<GetPromptResult, McpError> {
        let prompt = self
            .prompts
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| McpError::unknown_prompt(name))?;
        let resolved = prompt.resolve_arguments(arguments)?;
        debug!("Rendering prompt {}", name);
        (prompt.renderer)(&resolved)
    }
}

pub const APP_CONFIG_URI: &str = "config://app";
pub const GREETING_PROMPT: &str = "greeting";
pub const GREETING_FALLBACK_NAME: &str = "User";

fn app_config_resource(settings: Arc<Settings>) -> ResourceDescriptor {
    ResourceDescriptor::text(APP_CONFIG_URI, "App Config", "text/plain", move || {
        format!(
            "Application Configuration:\n\
             - Name: {}\n\
             - Version: {}\n\
             - Environment: {}\n\
             - Debug: {}\n\
             - Host: {}\n\
             - Port: {}\n",
            settings.app_name,
            settings.version,
            settings.environment,
            settings.debug,
            settings.host,
            settings.port,
        )
    })
}

fn greeting_prompt() -> PromptDescriptor {
    PromptDescriptor::new(
        GREETING_PROMPT,
        Some("Generate a greeting".to_string()),
        vec![
            PromptArgumentSpec::new("name", "Name of the person to greet")
                .required()
                .with_fallback(GREETING_FALLBACK_NAME),
        ],
        |args| {
            let name = args
                .get("name")
                .map(String::as_str)
                .unwrap_or(GREETING_FALLBACK_NAME);
            Ok(GetPromptResult {
                description: Some("A friendly greeting".to_string()),
                messages: vec![PromptMessage {
                    role: Role::User,
                    content: ContentBlock::text(format!(
                        "Hello, {}! How can I help you today?",
                        name
                    )),
                }],
            })
        },
    )
}
