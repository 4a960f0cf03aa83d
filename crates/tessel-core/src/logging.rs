#![forbid(unsafe_code)]

//! Logging and tracing support.
//!
//! With the `tracing` feature the usual `tracing` macros are re-exported from
//! the crate root, so layout code writes `tessel_core::debug!(..)` either way.
//! Without it, every macro expands to nothing and spans become [`NoopSpan`].
//!
//! `tracing-json` adds [`init_json_subscriber`] for hosts that want
//! line-delimited JSON logs filtered by `RUST_LOG` / [`LOG_FILTER_ENV`].

#[cfg(feature = "tracing")]
pub use tracing::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};

/// Target used by layout resolution events.
pub const LAYOUT_TARGET: &str = "tessel::layout";

/// Environment variable consulted before `RUST_LOG` by [`init_json_subscriber`].
pub const LOG_FILTER_ENV: &str = "TESSEL_LOG";

#[cfg(not(feature = "tracing"))]
mod noop_macros {
    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! debug_span {
        ($($arg:tt)*) => {
            $crate::logging::NoopSpan
        };
    }

    #[macro_export]
    macro_rules! error {
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! error_span {
        ($($arg:tt)*) => {
            $crate::logging::NoopSpan
        };
    }

    #[macro_export]
    macro_rules! info {
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! info_span {
        ($($arg:tt)*) => {
            $crate::logging::NoopSpan
        };
    }

    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! trace_span {
        ($($arg:tt)*) => {
            $crate::logging::NoopSpan
        };
    }

    #[macro_export]
    macro_rules! warn {
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! warn_span {
        ($($arg:tt)*) => {
            $crate::logging::NoopSpan
        };
    }
}

/// Span stand-in when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub struct NoopSpan;

#[cfg(not(feature = "tracing"))]
impl NoopSpan {
    /// Enter the span (does nothing).
    pub fn enter(&self) -> NoopGuard {
        NoopGuard
    }
}

/// Guard returned by [`NoopSpan::enter`].
#[cfg(not(feature = "tracing"))]
pub struct NoopGuard;

/// Install a global JSON subscriber.
///
/// The filter comes from [`LOG_FILTER_ENV`], then `RUST_LOG`, then `warn`.
/// Returns `false` if a global subscriber was already installed.
#[cfg(feature = "tracing-json")]
pub fn init_json_subscriber() -> bool {
    use tracing_subscriber::EnvFilter;

    let filter = std::env::var(LOG_FILTER_ENV)
        .ok()
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
