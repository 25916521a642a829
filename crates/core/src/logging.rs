//! Logging infrastructure for the Hybrid Agent.
//!
//! This module initializes the tracing subscriber for structured logging.
//! Logs are emitted to stderr to keep stdout clean for data output, and can
//! additionally be appended to a log file.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Initialize the tracing subscriber.
///
/// This sets up structured logging with:
/// - Output to stderr (stdout is reserved for data)
/// - Environment-based filtering (RUST_LOG or provided level)
/// - Optional ANSI color control
/// - Optional append-only log file (never colored)
///
/// # Arguments
/// * `log_level` - Optional log level override (e.g., "debug", "info")
/// * `no_color` - Disable colored output
/// * `log_file` - Optional file that receives a copy of every event
///
/// # Example
/// ```no_run
/// use hybrid_core::logging::init_logging;
///
/// init_logging(None, false, None).expect("Failed to initialize logging");
/// ```
pub fn init_logging(
    log_level: Option<&str>,
    no_color: bool,
    log_file: Option<&Path>,
) -> AppResult<()> {
    let env_filter = build_filter(log_level)?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(!no_color && supports_color());

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::Config(format!("Failed to create log directory {:?}: {}", parent, e))
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| AppError::Config(format!("Failed to open log file {:?}: {}", path, e)))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_target(true)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))?;

    Ok(())
}

/// Resolve the filter: explicit level, then RUST_LOG, then "info".
fn build_filter(log_level: Option<&str>) -> AppResult<EnvFilter> {
    let default_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_str = log_level.unwrap_or(&default_level);

    EnvFilter::try_new(filter_str)
        .map_err(|e| AppError::Config(format!("Invalid log filter: {}", e)))
}

/// Check if the terminal supports color output.
fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
}
