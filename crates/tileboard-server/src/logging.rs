//! Structured logging for the tileboard server
//!
//! - Human-readable console logging for development
//! - JSON logging for production
//! - Daily rotated log files

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

const LOG_FILE: &str = "tileboard-server.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format for development
    Pretty,
    /// JSON format for production
    Json,
    /// Compact format for testing
    Compact,
}

impl LogFormat {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("json") => LogFormat::Json,
            Some("compact") => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }

    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_FORMAT").ok().as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    File,
    Both,
}

impl LogOutput {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("file") => LogOutput::File,
            Some("both") => LogOutput::Both,
            _ => LogOutput::Stdout,
        }
    }

    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_OUTPUT").ok().as_deref())
    }
}

/// Base filter from `RUST_LOG` plus fixed directives for noisy crates.
fn env_filter() -> EnvFilter {
    let base = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    ["tileboard_server=debug", "hyper=warn", "tokio=warn", "tower=warn", "h2=warn"]
        .iter()
        .filter_map(|d| d.parse().ok())
        .fold(base, |filter, directive| filter.add_directive(directive))
}

fn file_appender() -> RollingFileAppender {
    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string());
    std::fs::create_dir_all(&log_dir).ok();
    RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE)
}

/// Initialize the global subscriber.
///
/// Environment variables:
/// - `RUST_LOG`: Log level (e.g., "debug", "info", "tileboard_server=trace")
/// - `LOG_FORMAT`: Output format ("pretty", "json", "compact")
/// - `LOG_OUTPUT`: Where to write logs ("stdout", "file", "both")
/// - `LOG_DIR`: Directory for log files (default: "./logs")
///
/// ```bash
/// RUST_LOG=info LOG_FORMAT=json LOG_OUTPUT=file LOG_DIR=/var/log/tileboard tileboard-server
/// ```
pub fn init() {
    let format = LogFormat::from_env();
    let output = LogOutput::from_env();

    let stdout_layer = || -> BoxedLayer {
        match format {
            LogFormat::Pretty => fmt::layer().pretty().with_thread_ids(true).with_target(true).boxed(),
            LogFormat::Json => fmt::layer().json().with_current_span(true).boxed(),
            LogFormat::Compact => fmt::layer().compact().boxed(),
        }
    };
    let file_layer = || -> BoxedLayer { fmt::layer().with_writer(file_appender()).with_ansi(false).boxed() };

    let layers = match output {
        LogOutput::Stdout => vec![stdout_layer()],
        LogOutput::File => vec![file_layer()],
        LogOutput::Both => vec![stdout_layer(), file_layer()],
    };

    tracing_subscriber::registry().with(layers).with(env_filter()).init();

    tracing::info!(format = ?format, output = ?output, "logging initialized");
    if matches!(output, LogOutput::File | LogOutput::Both) {
        tracing::debug!(
            log_dir = %std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string()),
            "writing log files"
        );
    }
}

/// Log a named event with structured fields
///
/// ```ignore
/// log_event!(
///     level: tracing::Level::INFO,
///     event: "visualization_created",
///     program: "prog-1",
///     widgets: 3
/// );
/// ```
#[macro_export]
macro_rules! log_event {
    (level: $level:expr, event: $event:expr $(, $key:ident: $value:expr)* $(,)?) => {
        tracing::event!(
            $level,
            event = $event
            $(, $key = ?$value)*
        );
    };
}
