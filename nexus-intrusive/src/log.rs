//! Feature-gated tracing of structural events.
//!
//! With the `log` feature enabled, resize and reset events are forwarded to
//! the `log` facade at trace level under the `nexus_intrusive` target.
//! Without it the macro expands to nothing and its arguments are not
//! evaluated.

/// Trace a structural event.
macro_rules! trace {
    ($($arg:tt)+) => {
        #[cfg(feature = "log")]
        {
            ::log::trace!(target: "nexus_intrusive", $($arg)+);
        }
    };
}

pub(crate) use trace;
