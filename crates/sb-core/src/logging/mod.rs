//! Structured logging foundation for sb-core.
//!
//! Provides dual-mode logging:
//! - Human-readable console output for interactive use
//! - Machine-parseable JSONL for automation
//!
//! # Usage
//!
//! ```ignore
//! use sb_core::logging::{init_logging, LogConfig, LogContext, Stage, event_names};
//!
//! let config = LogConfig::from_env(None, None);
//! init_logging(&config);
//!
//! let ctx = LogContext::new(generate_run_id()).with_collection("Stream Night");
//! log_event!(ctx, INFO, event_names::EXPORT_STARTED, Stage::Collect, "Starting export");
//! ```
//!
//! stdout is reserved for command payloads; all log output goes to stderr.

pub mod config;
pub mod events;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, LogContext, Stage};

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the logging subsystem.
///
/// Must be called once at startup before any logging occurs. A second call
/// is ignored.
pub fn init_logging(config: &LogConfig) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if std::env::var("SB_LOG").is_err() => EnvFilter::new(directives),
        _ => EnvFilter::new(default_directives(config.level)),
    };

    match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_ansi(use_ansi);

            if config.timestamps {
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .try_init();
            } else {
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .try_init();
            }
        }
        LogFormat::Jsonl => {
            let json_layer = fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_target(true)
                .with_writer(std::io::stderr);
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .try_init();
        }
    }
}

/// Filter directives for the workspace crates at `level`.
///
/// Event names are used as tracing targets, so their prefixes are listed too.
fn default_directives(level: LogLevel) -> String {
    [
        "sb_core",
        "sb_archive",
        "sb_config",
        "sb_common",
        "export",
        "import",
        "handshake",
        "config",
    ]
    .iter()
    .map(|target| format!("{}={}", target, level))
    .collect::<Vec<_>>()
    .join(",")
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("run-{}", &uuid[..12])
}

/// Structured event logging with run correlation.
///
/// Usage:
/// ```ignore
/// log_event!(ctx, INFO, event_names::EXPORT_PACKAGED, Stage::Package, "Archive written",
///     entries = 12, bytes = 4096);
/// ```
#[macro_export]
macro_rules! log_event {
    ($ctx:expr, INFO, $event:expr, $stage:expr, $msg:expr $(, $($fields:tt)*)?) => {
        tracing::info!(
            target: $event,
            run_id = %$ctx.run_id,
            collection = ?$ctx.collection,
            stage = %$stage,
            message = $msg,
            $($($fields)*)?
        )
    };
    ($ctx:expr, DEBUG, $event:expr, $stage:expr, $msg:expr $(, $($fields:tt)*)?) => {
        tracing::debug!(
            target: $event,
            run_id = %$ctx.run_id,
            collection = ?$ctx.collection,
            stage = %$stage,
            message = $msg,
            $($($fields)*)?
        )
    };
    ($ctx:expr, WARN, $event:expr, $stage:expr, $msg:expr $(, $($fields:tt)*)?) => {
        tracing::warn!(
            target: $event,
            run_id = %$ctx.run_id,
            collection = ?$ctx.collection,
            stage = %$stage,
            message = $msg,
            $($($fields)*)?
        )
    };
    ($ctx:expr, ERROR, $event:expr, $stage:expr, $msg:expr $(, $($fields:tt)*)?) => {
        tracing::error!(
            target: $event,
            run_id = %$ctx.run_id,
            collection = ?$ctx.collection,
            stage = %$stage,
            message = $msg,
            $($($fields)*)?
        )
    };
}
