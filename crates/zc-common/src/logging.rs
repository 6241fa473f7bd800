//! Structured Logging Configuration
//!
//! - JSON output for production (LOG_FORMAT=json)
//! - Human-readable output for development (default)
//!
//! # Usage
//!
//! ```rust,ignore
//! use zc_common::logging::init_logging;
//!
//! fn main() {
//!     init_logging("mp-orders");
//!
//!     tracing::info!(resource_type = "User", "Resolving remote resource");
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `LOG_FORMAT`: Set to "json" for JSON output, anything else for text (default: text)
//! - `RUST_LOG`: Standard log level filter (default: info)
//!   Examples: `RUST_LOG=debug`, `RUST_LOG=zc_remote=trace,reqwest=info`

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }

    fn from_env() -> Self {
        Self::parse(&std::env::var("LOG_FORMAT").unwrap_or_default())
    }
}

/// Initialize logging for the named service.
///
/// Must be called at most once per process.
pub fn init_logging(service_name: &str) {
    let format = LogFormat::from_env();

    // Only one of the two layers is ever present
    let json = (format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_file(true)
            .with_line_number(true)
            .flatten_event(true)
    });
    let text = (format == LogFormat::Text).then(|| fmt::layer().with_target(true));

    tracing_subscriber::registry()
        .with(default_filter())
        .with(json)
        .with(text)
        .init();

    tracing::debug!(service = %service_name, ?format, "Logging initialized");
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
