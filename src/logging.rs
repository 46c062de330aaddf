//! Logging abstraction layer.
//!
//! Every log line in the crate goes through one of five macros, which forward
//! to the [`log`](https://docs.rs/log) or [`tracing`](https://docs.rs/tracing)
//! crate depending on the enabled feature. Enable at most one of them.
//!
//! | Feature    | Backend         | Default |
//! |------------|-----------------|---------|
//! | `log`      | `log` crate     | yes     |
//! | `tracing`  | `tracing` crate | no      |
//!
//! With neither feature enabled the macros expand to nothing.
//!
//! Levels used by the coordinator and the cache:
//!
//! - `trace_log!`: cache hits, coalesced reads, token checks.
//! - `debug_log!`: staging, commits, invalidations, data source calls.
//! - `info_log!`: user-visible navigations and backend selection.
//! - `warn_log!`: declined interceptions, stale commits, discarded commits.
//! - `error_log!`: failed fetches and mutations.
//!
//! ```ignore
//! use async_navigator::{debug_log, warn_log};
//!
//! debug_log!("Staged '{}' (token {:?})", location, token);
//! warn_log!("Navigation to '{}' cannot be intercepted", url);
//! ```

#[doc(hidden)]
#[macro_export]
macro_rules! __dispatch_log {
    ($level:ident, $($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        ::tracing::$level!($($arg)*);
        #[cfg(feature = "log")]
        ::log::$level!($($arg)*);
    }};
}

/// Emit a **trace**-level log message.
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        $crate::__dispatch_log!(trace, $($arg)*)
    };
}

/// Emit a **debug**-level log message.
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        $crate::__dispatch_log!(debug, $($arg)*)
    };
}

/// Emit an **info**-level log message.
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        $crate::__dispatch_log!(info, $($arg)*)
    };
}

/// Emit a **warn**-level log message.
#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        $crate::__dispatch_log!(warn, $($arg)*)
    };
}

/// Emit an **error**-level log message.
#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => {
        $crate::__dispatch_log!(error, $($arg)*)
    };
}
