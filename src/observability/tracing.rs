//! Tracing subscriber setup.
//!
//! Every executed statement is logged at `debug` under the `quarry` target
//! with its operation id, so the default filter shows them.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,quarry=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize human-readable tracing with the given service name.
///
/// This sets up:
/// - Console logging with targets, thread ids, file and line
/// - Environment-based filter (via RUST_LOG)
///
/// # Panics
///
/// Panics if tracing has already been initialized.
pub fn init_tracing(service_name: &str) {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .init();

    tracing::info!(service = service_name, "Tracing initialized");
}

/// Like [`init_tracing`], but writes one JSON object per event.
///
/// # Panics
///
/// Panics if tracing has already been initialized.
pub fn init_json_tracing(service_name: &str) {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_target(true)
        .with_thread_ids(true);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .init();

    tracing::info!(service = service_name, "Tracing initialized");
}

/// Initialize tracing for tests (only logs errors).
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("error")
        .with_test_writer()
        .try_init();
}
