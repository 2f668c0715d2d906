//! Logging setup, mirroring the `tracing_subscriber` wiring in `kairei`'s
//! `src/bin/kairei.rs`: an `EnvFilter`-driven formatter, defaulting to
//! `info` when `RUST_LOG` isn't set.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global tracing subscriber. Safe to call more than once;
/// later calls are no-ops (the global default can only be set once).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init();
}
