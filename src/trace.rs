//! Controller logging
//!
//! The controllers report through these macros:
//!
//! | Macro | Level | Used for |
//! |---|---|---|
//! | [`trace_span!`] | span (debug) | a span the caller enters or instruments itself |
//! | [`trace_enter!`] | span (debug) | one user operation: `playback.play`, `recording.start` |
//! | [`trace_event!`] | debug | state transitions, stale callbacks, absorbed playback errors |
//! | [`trace_warn!`] | warn | recording failures the user is told about |
//!
//! Playback errors never reach warn: the widget recovers from them silently,
//! so they stay at debug next to the transition they caused.
//!
//! The `tracing` feature (default) routes everything to the `tracing` crate;
//! the browser demo installs `tracing-wasm` to forward it to the console.
//! Built without the feature the macros expand to nothing and field
//! expressions are not evaluated.
//!
//! ```rust,ignore
//! let _guard = trace_enter!("playback.set_source", generation = next.value());
//! trace_event!(stale = generation.value(), "native event dropped");
//! trace_warn!(error = %err, "recording failed");
//! ```

/// Build a debug span
#[macro_export]
#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($name:expr) => {
        tracing::debug_span!($name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::debug_span!($name, $($field)*)
    };
}

#[macro_export]
#[cfg(not(feature = "tracing"))]
#[doc(hidden)]
macro_rules! trace_span {
    ($name:expr) => {
        ()
    };
    ($name:expr, $($field:tt)*) => {
        ()
    };
}

/// Enter a debug span that lasts until the guard drops
#[macro_export]
#[cfg(feature = "tracing")]
macro_rules! trace_enter {
    ($name:expr) => {
        $crate::trace_span!($name).entered()
    };
    ($name:expr, $($field:tt)*) => {
        $crate::trace_span!($name, $($field)*).entered()
    };
}

#[macro_export]
#[cfg(not(feature = "tracing"))]
#[doc(hidden)]
macro_rules! trace_enter {
    ($name:expr) => {
        $crate::trace::NoopSpanGuard
    };
    ($name:expr, $($field:tt)*) => {
        $crate::trace::NoopSpanGuard
    };
}

/// Guard returned by [`trace_enter!`] without the `tracing` feature
#[cfg(not(feature = "tracing"))]
#[derive(Debug)]
pub struct NoopSpanGuard;

/// Debug event
#[macro_export]
#[cfg(feature = "tracing")]
macro_rules! trace_event {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[macro_export]
#[cfg(not(feature = "tracing"))]
#[doc(hidden)]
macro_rules! trace_event {
    ($($arg:tt)*) => {};
}

/// Warning for a failure shown to the user
#[macro_export]
#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($($arg:tt)*) => {
        tracing::warn!($($arg)*)
    };
}

#[macro_export]
#[cfg(not(feature = "tracing"))]
#[doc(hidden)]
macro_rules! trace_warn {
    ($($arg:tt)*) => {};
}

pub use trace_enter;
pub use trace_event;
pub use trace_span;
pub use trace_warn;
