//! Profiling support via Tracy.
//!
//! Compile and execute are instrumented with the macros below. With the
//! `profiling` feature disabled (the default) they expand to nothing.
//!
//! ```toml
//! [dependencies]
//! redlilium-rendergraph = { version = "0.1", features = ["profiling"] }
//! ```

#[cfg(feature = "profiling")]
pub use tracy_client::{self, span, Client};

/// Create a profiling span for the current scope.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_scope {
    ($name:expr) => {
        let _profile_span = $crate::profiling::span!($name);
    };
}

/// Create a profiling span (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_scope {
    ($name:expr) => {};
}

/// Create a profiling span covering the enclosing function.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_function {
    () => {
        let _profile_span = $crate::profiling::span!();
    };
}

/// Create a profiling span for function (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_function {
    () => {};
}

pub use profile_function;
pub use profile_scope;
