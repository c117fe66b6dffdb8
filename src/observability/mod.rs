//! Observability module providing structured logging.
//!
//! Log output format (pretty, compact, JSON) and filtering come from
//! `[observability.logging]`; `RUST_LOG` takes precedence when set.

mod tracing_init;

pub use tracing_init::*;
