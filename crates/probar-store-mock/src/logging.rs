//! Test log output.
//!
//! The store emits `tracing` events (`debug` for commits, dispatches,
//! resets and failed module lookups; `trace` for subscriber bookkeeping).
//! Call [`init_test_logging`] from test setup to see them, filtered with
//! `RUST_LOG` (for example `RUST_LOG=probar_store_mock=trace`).

use tracing_subscriber::EnvFilter;

/// Filter applied when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "warn";

/// Install a fmt subscriber writing through the test harness
///
/// Safe to call from every test; only the first call in a process
/// installs anything. Returns `true` if this call installed the subscriber.
pub fn init_test_logging() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_repeatable() {
        init_test_logging();
        assert!(!init_test_logging());
    }
}
