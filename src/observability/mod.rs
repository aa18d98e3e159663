//! Observability module providing structured logging.
//!
//! Log output is configured under `[observability.logging]` and can be
//! overridden at runtime with `RUST_LOG`.

mod tracing_init;

pub use tracing_init::*;
