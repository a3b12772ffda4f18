//! Tracing setup for embedders and manual test runs.
//!
//! The library itself only emits through `tracing` macros; installing a
//! subscriber is the embedder's choice. This helper wires up a console
//! subscriber filtered by `RUST_LOG`:
//! - `RUST_LOG=debug` - all debug logs
//! - `RUST_LOG=graft::binder=debug` - module-level filtering

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install a console subscriber. Safe to call more than once; later
/// calls are no-ops if a global subscriber is already set.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let console_layer = fmt::layer().with_target(true).with_filter(filter);

    let _ = tracing_subscriber::registry()
        .with(console_layer)
        .try_init();
}
