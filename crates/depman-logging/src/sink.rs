//! Host log sink management

use depman_core::LogLevel;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Host-supplied function receiving `(level, target, message)` for each log line
pub type LogSink = Arc<dyn Fn(LogLevel, &str, &str) + Send + Sync>;

/// Global log sink manager
static SINK_MANAGER: OnceCell<LogSinkManager> = OnceCell::new();

/// Level-filtered holder of the current log sink
pub struct LogSinkManager {
    sink: RwLock<Option<LogSink>>,
    level: AtomicU8,
}

impl LogSinkManager {
    /// Create a new sink manager
    pub fn new() -> Self {
        Self {
            sink: RwLock::new(None),
            level: AtomicU8::new(LogLevel::Info as u8),
        }
    }

    /// Get the global sink manager instance
    pub fn global() -> &'static LogSinkManager {
        SINK_MANAGER.get_or_init(LogSinkManager::new)
    }

    /// Set or clear the log sink
    pub fn set_sink(&self, sink: Option<LogSink>) {
        *self.sink.write() = sink;
    }

    /// Get the current log sink
    pub fn sink(&self) -> Option<LogSink> {
        self.sink.read().clone()
    }

    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level as u8, Ordering::SeqCst);
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::SeqCst))
    }

    /// Check if a log level is enabled
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.level() && self.level() != LogLevel::Off
    }

    /// Forward to the sink if one is set and the level is enabled
    pub fn log(&self, level: LogLevel, target: &str, message: &str) {
        if !self.is_enabled(level) {
            return;
        }

        // Clone out of the lock so a sink that logs again does not deadlock
        let Some(sink) = self.sink() else {
            return;
        };
        sink(level, target, message);
    }
}

impl Default for LogSinkManager {
    fn default() -> Self {
        Self::new()
    }
}
