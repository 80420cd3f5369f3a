//!
//! src/logging.rs
//!
//! Initializes the tracing subscriber. Logs go to stderr so stdout only
//! ever carries command output.
//!

use tracing_appender::non_blocking;
use tracing_error::ErrorLayer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};
use crate::errors::InsightsError;

/// Keeps the background writer alive; drop it last so buffered lines flush.
pub struct LoggingGuard(tracing_appender::non_blocking::WorkerGuard);

pub fn init_logging(cfg: &LoggingConfig) -> Result<LoggingGuard, InsightsError> {
    let (writer, guard) = non_blocking(std::io::stderr());
    let filter = std::env::var("RUST_LOG")
        .ok()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new(&cfg.filter_directives));

    let time = fmt::time::UtcTime::rfc_3339();
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default());

    let result = match cfg.format {
        LogFormat::Json => registry
            .with(fmt::layer()
                .with_writer(writer)
                .with_timer(time)
                .with_target(cfg.include_target)
                .with_file(cfg.include_file_line)
                .with_line_number(cfg.include_file_line)
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(true))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer()
                .with_writer(writer)
                .with_timer(time)
                .with_ansi(cfg.with_ansi)
                .with_target(cfg.include_target)
                .with_file(cfg.include_file_line)
                .with_line_number(cfg.include_file_line))
            .try_init(),
    };
    result.map_err(|e| InsightsError::Config(format!("logging init: {e}")))?;

    Ok( LoggingGuard(guard) )
}
