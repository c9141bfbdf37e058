//! Logging setup for hosts embedding scriptdeps.
//!
//! The crate only emits `tracing` events; installing a subscriber is up to the host.
//! [`init_logging`] is the default choice for hosts that do not have their own.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber.
///
/// With `level == None` the filter comes from `RUST_LOG`, falling back to `warn`.
/// Returns `false` when a global subscriber was already installed.
pub fn init_logging(level: Option<Level>) -> bool {
    let filter = match level {
        Some(level) => EnvFilter::new(format!("scriptdeps={level}")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}
