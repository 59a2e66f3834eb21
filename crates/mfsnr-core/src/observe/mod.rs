//! # Observability
//!
//! Structured logging via `tracing`. The numeric kernel only emits events;
//! installing a subscriber is left to the host through [`init_logging`].

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
