//! Tracing subscriber bootstrap
//!
//! Repositories and services emit structured `tracing` events; the binary
//! installs one subscriber at startup. `RUST_LOG` controls the filter.

use tracing_subscriber::{prelude::*, EnvFilter};

/// Install the global tracing subscriber. Call once, from the binary.
pub fn init() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(
            tracing_subscriber::fmt::layer()
                .with_line_number(true)
                .with_file(true),
        )
        .init();
}
