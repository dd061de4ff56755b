//! Telemetry helpers for applications embedding `chart-lifecycle`.
//!
//! Every lifecycle transition is logged through `tracing`; installing a
//! subscriber stays the host application's decision. `init_default_tracing`
//! is a shortcut for binaries and tests that do not wire their own.

/// Default filter used when `RUST_LOG` is unset.
pub const DEFAULT_TRACING_FILTER: &str = "chart_lifecycle=info";

/// Initializes a compact `tracing` subscriber when the `telemetry` feature is enabled.
///
/// Returns `false` when the feature is disabled or a global subscriber was
/// already installed by the host.
#[must_use]
pub fn init_default_tracing() -> bool {
    init_tracing_with_filter(DEFAULT_TRACING_FILTER)
}

/// Same as [`init_default_tracing`] with explicit fallback directives.
///
/// `RUST_LOG` still wins when present.
#[must_use]
pub fn init_tracing_with_filter(fallback_directives: &str) -> bool {
    #[cfg(feature = "telemetry")]
    {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback_directives));
        return tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .try_init()
            .is_ok();
    }

    #[cfg(not(feature = "telemetry"))]
    {
        let _ = fallback_directives;
        false
    }
}
