//! Logging initialization and configuration.
//!
//! Logs are written to files in the `logs/` directory next to the executable
//! so they never interleave with the shell output streamed to the terminal.
//!
//! # Configuration
//!
//! The log level can be controlled via the `RUST_LOG` environment variable:
//! - `RUST_LOG=debug` - Show spawn, resize and exit details
//! - `RUST_LOG=info` - Show info and higher level logs (default)
//! - `RUST_LOG=warn` - Show warnings and errors only

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Directory logs go to: `logs/` beside the executable, else `./logs`.
pub fn default_log_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join("logs")))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Log file name for a run started now, e.g. `pty-run.2024-12-06-14-30-25.log`.
pub fn log_file_name(app: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d-%H-%M-%S");
    format!("{}.{}.log", app, timestamp)
}

/// Initialize file-based logging for one run of `app`.
///
/// The returned guard flushes the non-blocking writer when dropped; keep it
/// alive until the program ends. Returns `None` (logging disabled) when the
/// log file cannot be created.
pub fn init_logging(app: &str, log_dir: &Path) -> Option<WorkerGuard> {
    // Ensure the logs directory exists
    if let Err(e) = fs::create_dir_all(log_dir) {
        eprintln!("Warning: Failed to create logs directory: {}", e);
        return None;
    }

    // One file per run, named after the start time
    let log_path = log_dir.join(log_file_name(app));
    let log_file = match fs::File::create(&log_path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Warning: Failed to create log file: {}", e);
            return None;
        }
    };

    // Use non-blocking writer so logging never stalls the output pump
    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false) // No ANSI colors in log files
        .with_target(true) // Include module path
        .with_thread_names(true) // pty-reader-<pid> / pty-wait-<pid>
        .with_line_number(true);

    // Default to "info" level if RUST_LOG is not set
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Build and initialize the subscriber
    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
    {
        eprintln!("Warning: Failed to install log subscriber: {}", e);
        return None;
    }

    tracing::info!("Logging initialized - writing to {}", log_path.display());
    Some(guard)
}
