//! Opt-in tracing setup for binaries and tests embedding the engine.
//!
//! The library itself only emits events; installing a subscriber is the
//! host's choice. `init` wires a console layer honoring `RUST_LOG` and an
//! optional daily-rolling file layer.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str = "info";
pub const DEFAULT_LOG_FILE_PREFIX: &str = "voldenoa";
pub const DEFAULT_LOG_FILE_SUFFIX: &str = "log";

/// Install the global subscriber. Returns the appender guard when a file
/// layer was requested; keep it alive for the file layer to flush.
pub fn init(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match log_dir {
        Some(dir) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(DEFAULT_LOG_FILE_PREFIX)
                .filename_suffix(DEFAULT_LOG_FILE_SUFFIX)
                .build(dir)
                .with_context(|| format!("Failed to open log directory: {}", dir.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .try_init()
                .context("Failed to install tracing subscriber")?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .try_init()
                .context("Failed to install tracing subscriber")?;
            Ok(None)
        }
    }
}
