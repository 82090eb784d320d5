//! depman-core - Core types, collaborator traits and state classification
//!
//! This crate provides the foundational types for the depman lifecycle engine:
//! - [`DependencyState`] and [`transitions`] for deciding what a state change does
//! - [`ServiceRegistry`] and friends, the narrow view of the service registry
//! - [`Filter`], [`ServiceReference`] and [`ServiceObject`] for describing providers
//! - [`DmError`] for error handling
//! - [`ComponentConfig`] for component configuration

mod config;
mod error;
mod filter;
mod lifecycle;
pub mod properties;
mod reference;
mod registry;
mod value;

pub use config::{AutoConfig, AutoConfigSlots, CallbackNames, ComponentConfig, ContextSlot};
pub use error::{CallbackError, ConfigurationError, DmError, DmResult};
pub use filter::Filter;
pub use lifecycle::{Classification, DependencyState, Requirement, Step, Transition, transitions};
pub use properties::Properties;
pub use reference::{ServiceEvent, ServiceId, ServiceObject, ServiceReference};
pub use registry::{
    ListenerId, MANAGED_SERVICE, ManagedService, RegistrationHandle, ServiceListener,
    ServiceRegistry,
};
pub use value::Value;

/// Log levels understood by host log sinks
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Off = 5,
}

impl LogLevel {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Trace,
            1 => LogLevel::Debug,
            2 => LogLevel::Info,
            3 => LogLevel::Warn,
            4 => LogLevel::Error,
            _ => LogLevel::Off,
        }
    }

    /// Parse a case-insensitive level name such as `"info"`
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            "off" => Some(LogLevel::Off),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Off => write!(f, "OFF"),
        }
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Classification, ComponentConfig, DmError, DmResult, Filter, LogLevel, Properties,
        ServiceObject, ServiceReference, ServiceRegistry, Value,
    };
}
