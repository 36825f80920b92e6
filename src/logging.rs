//! Tracing setup: daily rolling log file plus console output.

use display_info::DisplayInfo;
use std::path::{Path, PathBuf};
use sysinfo::System;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};

const LOG_TARGET_STARTUP: &str = "d4_assistant::startup";

/// Log directory under the user config folder, `./logs` as a fallback
pub fn log_dir() -> PathBuf {
    crate::config::app_dir()
        .map(|dir| dir.join("logs"))
        .unwrap_or_else(|_| PathBuf::from("logs"))
}

/// Daily file `<dir>/<name>.YYYY-MM-DD.log`
pub fn file_appender(dir: &Path, name: &str) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(name)
        .filename_suffix("log")
        .build(dir)
}

/// Initialize tracing with file rotation; `name` becomes the log file prefix
pub fn init(name: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = log_dir();
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let file_appender = match file_appender(&log_dir, name) {
        Ok(appender) => Some(appender),
        Err(e) => {
            eprintln!("Warning: File logging disabled: {}", e);
            None
        }
    };

    // Configure filter (info level by default)
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = file_appender.map(|appender| {
        fmt::layer()
            .with_writer(appender)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false)
            .with_line_number(true)
    });

    // Console program: progress messages always go to stderr too
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false);

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();

    if installed.is_ok() {
        tracing::info!("Log directory: {}", log_dir.display());
    }
}

pub fn log_runtime_environment() {
    let version = env!("CARGO_PKG_VERSION");
    let os_name = System::long_os_version()
        .or_else(System::name)
        .unwrap_or_else(|| "Unknown OS".to_string());
    let kernel = System::kernel_version().unwrap_or_else(|| "Unknown Kernel".to_string());
    let architecture = std::env::consts::ARCH;

    tracing::info!(target: LOG_TARGET_STARTUP, "Starting D4 Assistant v{} on ({})", version, architecture);
    tracing::info!(target: LOG_TARGET_STARTUP, "Operating System: {} (kernel {})", os_name, kernel);

    match DisplayInfo::all() {
        Ok(displays) => {
            tracing::info!(target: LOG_TARGET_STARTUP, "Displays: {} detected", displays.len());
            for (index, disp) in displays.iter().enumerate() {
                tracing::debug!(
                    target: LOG_TARGET_STARTUP,
                    "  Display {}: {}x{} at ({}, {}){}",
                    index,
                    disp.width,
                    disp.height,
                    disp.x,
                    disp.y,
                    if disp.is_primary { " (primary)" } else { "" }
                );
            }
        }
        Err(e) => tracing::warn!(target: LOG_TARGET_STARTUP, "Could not query displays: {}", e),
    }
}
