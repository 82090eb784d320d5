//! depman-logging - Tracing to host log sink bridge
//!
//! This crate provides:
//! - [`SinkLoggingLayer`] tracing layer that forwards logs to a host sink
//! - [`LogSink`] type for the host's log function
//! - Dynamic log level filtering through [`set_log_level`]

mod layer;
mod reload;
mod sink;

pub use depman_core::LogLevel;
pub use layer::{SinkLoggingLayer, init_logging, init_logging_with_level, init_logging_with_sink};
pub use reload::{ReloadHandle, set_log_level};
pub use sink::{LogSink, LogSinkManager};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{LogLevel, LogSink, LogSinkManager, SinkLoggingLayer, init_logging};
}
