//! Logging macros used throughout the library.
//!
//! With the `logging` feature each macro becomes a `tracing` event at its
//! level; without it they expand to nothing and the library never forces a
//! subscriber on its users. Call them in statement position only.
//!
//! ```rust,ignore
//! use crate::logging::{debug, warn};
//!
//! debug!(database = name, store = store, "querying store");
//! warn!(database = name, error = %err, "store inspection failed");
//! ```
//!
//! Levels in use: `trace` for connection and record churn, `debug` for
//! operations, `info` for engine lifecycle, `warn` for degraded results,
//! `error` for failures swallowed on teardown.

#[cfg(feature = "logging")]
mod emit {
    macro_rules! log_trace {
        ($($arg:tt)*) => { tracing::event!(tracing::Level::TRACE, $($arg)*) };
    }

    macro_rules! log_debug {
        ($($arg:tt)*) => { tracing::event!(tracing::Level::DEBUG, $($arg)*) };
    }

    macro_rules! log_info {
        ($($arg:tt)*) => { tracing::event!(tracing::Level::INFO, $($arg)*) };
    }

    macro_rules! log_warn {
        ($($arg:tt)*) => { tracing::event!(tracing::Level::WARN, $($arg)*) };
    }

    macro_rules! log_error {
        ($($arg:tt)*) => { tracing::event!(tracing::Level::ERROR, $($arg)*) };
    }

    pub(crate) use {log_debug, log_error, log_info, log_trace, log_warn};
}

#[cfg(not(feature = "logging"))]
mod emit {
    // Arguments are dropped unexpanded.
    macro_rules! log_trace {
        ($($arg:tt)*) => {};
    }

    macro_rules! log_debug {
        ($($arg:tt)*) => {};
    }

    macro_rules! log_info {
        ($($arg:tt)*) => {};
    }

    macro_rules! log_warn {
        ($($arg:tt)*) => {};
    }

    macro_rules! log_error {
        ($($arg:tt)*) => {};
    }

    pub(crate) use {log_debug, log_error, log_info, log_trace, log_warn};
}

pub(crate) use emit::{
    log_debug as debug, log_error as error, log_info as info, log_trace as trace,
    log_warn as warn,
};
