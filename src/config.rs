//! Configuration module - environment settings and CLI overrides

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

pub const DEFAULT_APP_NAME: &str = "SSE MCP Server";
pub const DEFAULT_DESCRIPTION: &str =
    "Model Context Protocol server over Server-Sent Events with a POST message channel";
pub const DEFAULT_API_PREFIX: &str = "/mcp/v1";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_PING_INTERVAL_SECS: u64 = 15;

/// Deployment environment, selected by `APP_ENV`
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Environment {
    Development,
    Staging,
    Production,
    Test,
}

impl Environment {
    /// Unknown values fall back to development
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "staging" | "stage" => Environment::Staging,
            "test" => Environment::Test,
            _ => Environment::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }

    /// (debug, log level, log format) applied when not set explicitly
    fn profile(&self) -> (bool, &'static str, Option<LogFormat>) {
        match self {
            Environment::Development => (true, "DEBUG", Some(LogFormat::Console)),
            Environment::Staging => (false, "INFO", None),
            Environment::Production => (false, "WARNING", None),
            Environment::Test => (true, "DEBUG", Some(LogFormat::Console)),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LogFormat {
    Json,
    Console,
}

impl LogFormat {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "console" | "text" | "pretty" => Ok(LogFormat::Console),
            other => Err(anyhow!("Invalid LOG_FORMAT: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl LogConfig {
    /// Level as an `EnvFilter` directive (`WARNING` -> `warn`)
    pub fn filter_directive(&self) -> String {
        match self.log_level.trim().to_ascii_uppercase().as_str() {
            "WARNING" | "WARN" => "warn".to_string(),
            "CRITICAL" | "FATAL" | "ERROR" => "error".to_string(),
            "DEBUG" => "debug".to_string(),
            "TRACE" => "trace".to_string(),
            "INFO" => "info".to_string(),
            _ => self.log_level.trim().to_ascii_lowercase(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn allows_any(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allows_any() || self.allowed_origins.iter().any(|o| o == origin)
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

/// CLI flags that take precedence over the environment
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub api_prefix: Option<String>,
}

/// Application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: Environment,
    pub app_name: String,
    pub version: String,
    pub description: String,
    pub api_prefix: String,
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub sse_ping_interval: Duration,
    pub cors: CorsConfig,
    pub logging: LogConfig,
    /// `.env` file the settings were read from, if any
    pub env_file: Option<PathBuf>,
}

impl Settings {
    /// Load from the process environment, falling back to the first `.env` file found
    /// in the working directory. Process variables win over file entries.
    pub fn from_env() -> Result<Self> {
        let environment = std::env::var("APP_ENV")
            .map(|v| Environment::parse(&v))
            .unwrap_or(Environment::Development);
        let dir = std::env::current_dir().context("Failed to read working directory")?;

        let env_file = find_env_file(&dir, environment);
        let file_vars = match &env_file {
            Some(path) => read_env_file(path)?,
            None => HashMap::new(),
        };

        let mut settings = Self::from_lookup(|key| {
            std::env::var(key)
                .ok()
                .or_else(|| file_vars.get(key).cloned())
        })?;
        settings.env_file = env_file;
        Ok(settings)
    }

    /// Load through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let environment = get("APP_ENV")
            .map(|v| Environment::parse(&v))
            .unwrap_or(Environment::Development);
        let (profile_debug, profile_level, profile_format) = environment.profile();

        let port = match get("APP_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("Invalid APP_PORT: {}", raw))?,
            None => DEFAULT_PORT,
        };

        let ping_secs = match get("SSE_PING_INTERVAL") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("Invalid SSE_PING_INTERVAL: {}", raw))?,
            None => DEFAULT_PING_INTERVAL_SECS,
        };
        if ping_secs == 0 {
            return Err(anyhow!("SSE_PING_INTERVAL must be greater than zero"));
        }

        let log_format = match get("LOG_FORMAT") {
            Some(raw) => LogFormat::parse(&raw)?,
            None => profile_format.unwrap_or(LogFormat::Json),
        };

        let allowed_origins = get("ALLOWED_ORIGINS")
            .map(|raw| parse_list(&raw))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| vec!["*".to_string()]);

        Ok(Self {
            environment,
            app_name: get("APP_NAME").unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            version: get("VERSION").unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            description: get("DESCRIPTION").unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            api_prefix: normalize_prefix(
                &get("API_V1_STR").unwrap_or_else(|| DEFAULT_API_PREFIX.to_string()),
            ),
            host: get("APP_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            debug: get("DEBUG")
                .map(|v| parse_bool(&v))
                .unwrap_or(profile_debug),
            sse_ping_interval: Duration::from_secs(ping_secs),
            cors: CorsConfig { allowed_origins },
            logging: LogConfig {
                log_dir: get("LOG_DIR").map(PathBuf::from),
                log_level: get("LOG_LEVEL").unwrap_or_else(|| profile_level.to_string()),
                log_format,
            },
            env_file: None,
        })
    }

    pub fn with_overrides(mut self, overrides: &CliOverrides) -> Self {
        if let Some(host) = &overrides.host {
            self.host = host.clone();
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(prefix) = &overrides.api_prefix {
            self.api_prefix = normalize_prefix(prefix);
        }
        self
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// `host:port` for binding the listener
    pub fn bind_target(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Absolute path of a route under the API prefix
    pub fn route(&self, suffix: &str) -> String {
        format!("{}{}", self.api_prefix, suffix)
    }
}

/// `.env` candidates for an environment, highest priority first
pub fn env_file_candidates(dir: &Path, environment: Environment) -> [PathBuf; 4] {
    [
        dir.join(format!(".env.{}.local", environment)),
        dir.join(format!(".env.{}", environment)),
        dir.join(".env.local"),
        dir.join(".env"),
    ]
}

/// Only the first existing candidate is used; files are not merged
pub fn find_env_file(dir: &Path, environment: Environment) -> Option<PathBuf> {
    env_file_candidates(dir, environment)
        .into_iter()
        .find(|path| path.is_file())
}

/// Parse a `.env` file without touching the process environment
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let entries = dotenvy::from_path_iter(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    entries
        .map(|entry| entry.with_context(|| format!("Invalid entry in {}", path.display())))
        .collect()
}

/// Leading slash, no trailing slash; `/` collapses to an empty prefix
pub fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Comma separated list, surrounding quotes stripped
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
