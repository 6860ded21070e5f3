// ==========================================
// Logging initialization
// ==========================================
// tracing + tracing-subscriber
// Level filter from the environment
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging
///
/// # Environment
/// - RUST_LOG: level filter (default: info)
///   e.g. RUST_LOG=debug or RUST_LOG=catalog_import=trace
/// - CATALOG_IMPORT_LOG_JSON: any non-empty value switches to JSON lines
///
/// # Example
/// ```no_run
/// use catalog_import::logging;
/// logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var("CATALOG_IMPORT_LOG_JSON")
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false);

    if json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_line_number(true)
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_line_number(true)
            .init();
    }
}

/// Initialize logging for tests
///
/// Debug level, captured by the test harness
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
