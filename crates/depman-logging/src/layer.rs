//! Tracing layer that forwards to the host log sink

use crate::reload::ReloadHandle;
use crate::sink::{LogSink, LogSinkManager};
use depman_core::LogLevel;
use std::fmt::Write as _;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// Tracing layer that forwards log events to a [`LogSinkManager`]
pub struct SinkLoggingLayer {
    manager: &'static LogSinkManager,
}

impl SinkLoggingLayer {
    /// Create a new layer using the global sink manager
    pub fn new() -> Self {
        Self {
            manager: LogSinkManager::global(),
        }
    }

    /// Create a layer with a specific sink manager
    pub fn with_manager(manager: &'static LogSinkManager) -> Self {
        Self { manager }
    }

    fn convert_level(level: &Level) -> LogLevel {
        match *level {
            Level::TRACE => LogLevel::Trace,
            Level::DEBUG => LogLevel::Debug,
            Level::INFO => LogLevel::Info,
            Level::WARN => LogLevel::Warn,
            Level::ERROR => LogLevel::Error,
        }
    }
}

impl Default for SinkLoggingLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for SinkLoggingLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = Self::convert_level(metadata.level());

        if !self.manager.is_enabled(level) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        self.manager
            .log(level, metadata.target(), &visitor.into_message());
    }

    fn enabled(&self, metadata: &tracing::Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        self.manager
            .is_enabled(Self::convert_level(metadata.level()))
    }
}

/// Collects the `message` field followed by `key=value` for every other field
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn into_message(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields
        } else {
            format!("{} {}", self.message, self.fields)
        }
    }

    fn push_field(&mut self, name: &str, value: std::fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{name}={value}");
    }
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.push_field(field.name(), format_args!("{value:?}"));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push_field(field.name(), format_args!("{value}"));
        }
    }
}

/// Initialize the logging system with the sink layer
///
/// Installs a global subscriber made of a reloadable level filter and a
/// [`SinkLoggingLayer`]. Call once during host start-up; later calls are
/// ignored.
pub fn init_logging() {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::reload;

    let initial = crate::reload::level_filter(LogSinkManager::global().level());
    let (filter, handle) = reload::Layer::<LevelFilter, tracing_subscriber::Registry>::new(initial);

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(SinkLoggingLayer::new());

    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        ReloadHandle::global().install(handle);
    }
}

/// Initialize logging with a specific log level
pub fn init_logging_with_level(level: LogLevel) {
    LogSinkManager::global().set_level(level);
    init_logging();
}

/// Initialize logging and route it to `sink`
pub fn init_logging_with_sink(level: LogLevel, sink: LogSink) {
    LogSinkManager::global().set_sink(Some(sink));
    init_logging_with_level(level);
}
