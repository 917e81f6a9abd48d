//! Logging infrastructure for windfield
//!
//! This module provides configurable logging using the `tracing` crate.
//! The estimation crates only emit events; installing a subscriber is left to
//! the host application through [`init_logging`] or [`init_logging_with_filter`].

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

/// Crates whose events follow the selected [`LogLevel`].
const ENGINE_TARGETS: [&str; 2] = ["windfield_common", "windfield_fusion"];

/// How much of the engine's own reasoning to log.
///
/// Events from other crates stay at `warn` whatever level is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Also every source's skill, consistency and agreement breakdown
    Trace,
    /// Also the fusion tier, prior blending and regression fallbacks
    Debug,
    /// One line per appended fused estimate
    #[default]
    Info,
    /// Only discarded observations and rejected input
    Warn,
    /// Engine output silenced apart from hard failures
    Error,
}

impl LogLevel {
    /// Every level, most verbose first
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    /// Name used in filter directives
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// `EnvFilter` directive applying this level to the windfield crates.
    pub fn directive(self) -> String {
        ENGINE_TARGETS
            .iter()
            .fold(String::from("warn"), |mut directive, target| {
                directive.push_str(&format!(",{target}={}", self.as_str()));
                directive
            })
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A log level name that is not one of [`LogLevel::ALL`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unrecognised windfield log level '{0}' (expected trace, debug, info, warn or error)")]
pub struct ParseLogLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.eq_ignore_ascii_case("warning") {
            return Ok(LogLevel::Warn);
        }
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| ParseLogLevelError(s.to_string()))
    }
}

/// Installs a subscriber logging the windfield crates at `level`.
///
/// Call once at startup; later calls keep the first subscriber. `RUST_LOG`
/// overrides the level when set.
///
/// # Example
///
/// ```no_run
/// use windfield_common::logging::{init_logging, LogLevel};
///
/// init_logging(LogLevel::Debug);
/// ```
pub fn init_logging(level: LogLevel) {
    init_logging_with_filter(&level.directive());
}

/// Initialize logging with a custom filter string.
///
/// Allows fine-grained control over which modules log at which levels.
///
/// # Example
///
/// ```no_run
/// use windfield_common::logging::init_logging_with_filter;
///
/// // Info everywhere, per-source scores from the fusion crate
/// init_logging_with_filter("info,windfield_fusion=trace");
/// ```
pub fn init_logging_with_filter(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // A second initialisation (e.g. several tests in one binary) keeps the
    // first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_span_events(FmtSpan::NONE)
        .try_init();
}
