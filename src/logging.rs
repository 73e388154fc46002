//! # Structured Logging Module
//!
//! Console plus JSON-file logging for scheduler nodes. Every node writes to
//! `log/<environment>.<pid>.<timestamp>.log` so that traces from several
//! nodes on one host stay apart.

use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging once per process
///
/// `RUST_LOG` wins over the environment-derived level when set. If the log
/// directory cannot be created only the console layer is installed.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);
        let filter = || {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
        };

        let console = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_filter(filter());

        let log_dir = PathBuf::from("log");
        let pid = process::id();
        let log_filename = format!(
            "{}.{}.{}.log",
            environment,
            pid,
            Utc::now().format("%Y%m%d_%H%M%S")
        );

        if let Err(e) = fs::create_dir_all(&log_dir) {
            let _ = tracing_subscriber::registry().with(console).try_init();
            tracing::warn!(error = %e, "Log directory unavailable, logging to console only");
            return;
        }

        let file_appender = tracing_appender::rolling::never(&log_dir, &log_filename);
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

        let json_file = fmt::layer()
            .with_writer(file_writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false)
            .json()
            .with_filter(filter());

        if tracing_subscriber::registry()
            .with(console)
            .with(json_file)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already installed, keeping it");
        }

        tracing::info!(
            pid = pid,
            environment = %environment,
            log_file = %log_dir.join(&log_filename).display(),
            "Structured logging initialized"
        );

        // the writer flushes on drop; keep it for the life of the process
        std::mem::forget(guard);
    });
}

/// Current environment from `TASKER_ENV` or `APP_ENV`
fn get_environment() -> String {
    std::env::var("TASKER_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
        .to_lowercase()
}

fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Task lifecycle event: enqueue, claim, run, retire
pub fn log_task_operation(
    operation: &str,
    task_id: &str,
    task_name: &str,
    queue: Option<&str>,
    status: &str,
) {
    tracing::info!(
        operation = %operation,
        task_id = %task_id,
        task_name = %task_name,
        queue = queue,
        status = %status,
        "TASK_OPERATION"
    );
}

/// A task id moving between two store lists
pub fn log_queue_transition(task_id: &str, from_queue: &str, to_queue: &str) {
    tracing::debug!(
        task_id = %task_id,
        from_queue = %from_queue,
        to_queue = %to_queue,
        "QUEUE_TRANSITION"
    );
}

/// Error with component context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        "ERROR"
    );
}
