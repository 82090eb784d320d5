//! Runtime level changes for the subscriber installed by [`crate::init_logging`]

use crate::sink::LogSinkManager;
use depman_core::{DmError, DmResult, LogLevel};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{Registry, reload};

type FilterHandle = reload::Handle<LevelFilter, Registry>;

/// Slot holding the reloadable level filter, once one is installed
#[derive(Default)]
pub struct ReloadHandle {
    filter: Mutex<Option<FilterHandle>>,
}

static GLOBAL: Lazy<ReloadHandle> = Lazy::new(ReloadHandle::default);

impl ReloadHandle {
    pub fn global() -> &'static ReloadHandle {
        &GLOBAL
    }

    pub(crate) fn install(&self, filter: FilterHandle) {
        *self.filter.lock() = Some(filter);
    }

    pub fn is_installed(&self) -> bool {
        self.filter.lock().is_some()
    }

    /// Replace the installed filter with one admitting `level` and above
    pub fn reload_level(&self, level: LogLevel) -> DmResult<()> {
        let guard = self.filter.lock();
        let filter = guard
            .as_ref()
            .ok_or_else(|| DmError::ConfigError("no log filter installed".to_string()))?;
        filter
            .reload(level_filter(level))
            .map_err(|e| DmError::Internal(format!("log filter reload failed: {e}")))
    }
}

/// Change the global log level
///
/// The sink threshold always changes; the subscriber's filter follows when
/// [`crate::init_logging`] installed one.
pub fn set_log_level(level: LogLevel) -> DmResult<()> {
    LogSinkManager::global().set_level(level);
    let handle = ReloadHandle::global();
    if handle.is_installed() {
        handle.reload_level(level)?;
    }
    Ok(())
}

pub(crate) fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Trace => LevelFilter::TRACE,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Off => LevelFilter::OFF,
    }
}
