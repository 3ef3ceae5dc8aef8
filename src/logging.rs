// SPDX-License-Identifier: MPL-2.0

//! Tracing subscriber setup
//!
//! Set `RUST_LOG` to control the level, e.g. `RUST_LOG=obs_bridge=debug`.

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber, preferring `RUST_LOG` over `default_filter`
///
/// Returns false if a global subscriber was already installed.
pub fn init(default_filter: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(true)
        .with_level(true)
        .try_init()
        .is_ok()
}

/// Same as [`init`], for test binaries (output captured by the harness)
pub fn init_for_tests() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init()
        .is_ok()
}
