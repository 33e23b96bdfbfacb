//! Observability for the dalek compute adaptor.
//!
//! Only structured logging lives here: a `tracing` subscriber with an
//! `EnvFilter` and either a human-readable or a JSON formatter.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, TracingConfig, TracingError};

/// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, instrument, trace, warn, span, Level};
