//! Tests for logging setup

use sse_mcp::config::{LogConfig, LogFormat};
use sse_mcp::logging::{init_logging, LOG_FILE_PREFIX};
use tempfile::TempDir;

// Installs the global subscriber, so this binary holds a single test
#[test]
fn test_file_logging() {
    let temp_dir = TempDir::new().unwrap();
    let log_dir = temp_dir.path().join("logs");
    let config = LogConfig {
        log_dir: Some(log_dir.clone()),
        log_level: "INFO".to_string(),
        log_format: LogFormat::Json,
    };

    let guard = init_logging(&config).unwrap();
    assert!(guard.is_some());
    tracing::info!("file logging ready");
    drop(guard);

    let entries: Vec<String> = std::fs::read_dir(&log_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(entries.iter().any(|name| name.starts_with(LOG_FILE_PREFIX)));

    // A second subscriber cannot be installed
    assert!(init_logging(&config).is_err());
}
