// ==========================================
// School Closure - logging setup
// ==========================================
// tracing + tracing-subscriber
// Level from RUST_LOG, output format from SCHOOL_CLOSURE_LOG_FORMAT
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable selecting the output format ("json" or "text")
pub const LOG_FORMAT_ENV: &str = "SCHOOL_CLOSURE_LOG_FORMAT";

/// Output format of the global subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Read the format from the environment, text unless "json" is requested
    pub fn from_env() -> Self {
        match std::env::var(LOG_FORMAT_ENV) {
            Ok(v) if v.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Initialise the global subscriber
///
/// # Environment
/// - RUST_LOG: filter directive (default: info),
///   e.g. `RUST_LOG=school_closure::engine=debug`
/// - SCHOOL_CLOSURE_LOG_FORMAT=json: one JSON object per event, for
///   shipping closure runs to a log collector
///
/// # Example
/// ```no_run
/// use school_closure::logging;
/// logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match LogFormat::from_env() {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .init(),
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_line_number(true)
            .init(),
    }
}

/// Subscriber for tests: debug level, captured by the test harness
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
