//! sse-mcp-server - MCP server over Server-Sent Events

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sse_mcp::config::{CliOverrides, Settings};
use sse_mcp::gateway::{openapi_document, Gateway};
use sse_mcp::logging::init_logging;
use sse_mcp::mcp::ServerContext;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "sse-mcp-server")]
#[command(about = "MCP server over Server-Sent Events with a POST message channel")]
#[command(version)]
struct Args {
    /// Bind host (overrides APP_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides APP_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Route prefix (overrides API_V1_STR)
    #[arg(long)]
    api_prefix: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write openapi.json and exit
    ExportOpenapi {
        #[arg(long, default_value = "docs")]
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let overrides = CliOverrides {
        host: args.host,
        port: args.port,
        api_prefix: args.api_prefix,
    };
    let settings = Settings::from_env()?.with_overrides(&overrides);

    if let Some(Command::ExportOpenapi { out_dir }) = args.command {
        return export_openapi(&settings, &out_dir);
    }

    let _log_guard = init_logging(&settings.logging)?;
    info!(
        "Starting {} {} ({})",
        settings.app_name, settings.version, settings.environment
    );
    if let Some(path) = &settings.env_file {
        info!("Loaded settings from {}", path.display());
    }

    let settings = Arc::new(settings);
    let context = Arc::new(ServerContext::with_defaults(settings.clone()));
    let gateway = Gateway::new(settings, context);

    if let Err(e) = gateway.run().await {
        error!("Server error: {:#}", e);
        std::process::exit(1);
    }

    info!("Server stopped");
    Ok(())
}

fn export_openapi(settings: &Settings, out_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let path = out_dir.join("openapi.json");
    let json = openapi_document(settings)
        .to_pretty_json()
        .context("Failed to render OpenAPI document")?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("OpenAPI document written to {}", path.display());
    Ok(())
}
