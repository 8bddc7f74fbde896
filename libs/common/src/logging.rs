//! Logging setup shared by services
//!
//! Console output always goes to stderr: services that use stdout as a data
//! channel must not interleave log lines with it.

use std::io::IsTerminal;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::{Error, Result};

/// Custom format for log level with brackets: `[INFO]`, `[WARN]`, etc.
fn format_level(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "[TRACE]",
        Level::DEBUG => "[DEBUG]",
        Level::INFO => "[INFO]",
        Level::WARN => "[WARN]",
        Level::ERROR => "[ERROR]",
    }
}

/// Event formatter that outputs: `timestamp [LEVEL] message`
///
/// Example output: `2025-12-02T00:50:44.809123Z [INFO] Compiled 3 rules watching 4 signals`
pub struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = chrono::Utc::now();
        write!(writer, "{} ", now.format("%Y-%m-%dT%H:%M:%S%.6fZ"))?;

        let level = *event.metadata().level();
        if writer.has_ansi_escapes() {
            let color = match level {
                Level::TRACE => "\x1b[35m", // magenta
                Level::DEBUG => "\x1b[34m", // blue
                Level::INFO => "\x1b[32m",  // green
                Level::WARN => "\x1b[33m",  // yellow
                Level::ERROR => "\x1b[31m", // red
            };
            write!(writer, "{}{}\x1b[0m ", color, format_level(&level))?;
        } else {
            write!(writer, "{} ", format_level(&level))?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Logger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Service name, used for the log file name
    #[serde(skip)]
    pub service_name: String,
    /// Filter directive when `RUST_LOG` is unset (e.g. "info", "debug,hyper=warn")
    pub level: String,
    /// JSON lines instead of the bracketed format
    pub json: bool,
    /// Also write a daily-rolling log file into this directory
    pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".to_string(),
            level: "info".to_string(),
            json: false,
            dir: None,
        }
    }
}

/// Filter from `RUST_LOG`, else from the configured level
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    match std::env::var("RUST_LOG") {
        Ok(env) if !env.trim().is_empty() => EnvFilter::try_new(&env)
            .map_err(|e| Error::Logging(format!("Invalid RUST_LOG '{}': {}", env, e))),
        _ => EnvFilter::try_new(level)
            .map_err(|e| Error::Logging(format!("Invalid log level '{}': {}", level, e))),
    }
}

/// Initialize the global subscriber
///
/// Returns the file writer guard when a log directory is configured; keep it
/// alive until exit so buffered lines are flushed.
pub fn init_with_config(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let filter = build_filter(&config.level)?;
    let ansi = std::io::stderr().is_terminal();

    let console_layer = if config.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(ansi)
            .event_format(BracketedLevelFormat)
            .boxed()
    };

    let (file_layer, guard) = match &config.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender =
                tracing_appender::rolling::daily(dir, format!("{}.log", config.service_name));
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .event_format(BracketedLevelFormat)
                .boxed();
            (Some(layer), Some(guard))
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))?;

    tracing::debug!(
        "Logging: {} @ {} (json: {}, dir: {:?})",
        config.service_name,
        config.level,
        config.json,
        config.dir
    );
    Ok(guard)
}
