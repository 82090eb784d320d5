//! Component configuration types

use crate::Properties;
use serde::{Deserialize, Serialize};

/// Declarative configuration of a component, applied before it is started
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// Interface names the component's own service is registered under.
    ///
    /// An empty list means the component is never registered.
    #[serde(default)]
    pub interfaces: Vec<String>,

    /// Base service properties
    #[serde(default)]
    pub properties: Properties,

    #[serde(default)]
    pub callbacks: CallbackNames,

    #[serde(default)]
    pub auto_config: AutoConfigSlots,
}

impl ComponentConfig {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration from JSON bytes
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_slice(bytes)
    }

    /// Whether the component registers a service of its own
    pub fn is_published(&self) -> bool {
        !self.interfaces.is_empty()
    }
}

/// Names of the lifecycle callbacks looked up in a component's callback table.
///
/// `None` disables the callback entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackNames {
    #[serde(default = "default_init")]
    pub init: Option<String>,

    #[serde(default = "default_start")]
    pub start: Option<String>,

    #[serde(default = "default_stop")]
    pub stop: Option<String>,

    #[serde(default = "default_destroy")]
    pub destroy: Option<String>,
}

fn default_init() -> Option<String> {
    Some("init".to_string())
}

fn default_start() -> Option<String> {
    Some("start".to_string())
}

fn default_stop() -> Option<String> {
    Some("stop".to_string())
}

fn default_destroy() -> Option<String> {
    Some("destroy".to_string())
}

impl Default for CallbackNames {
    fn default() -> Self {
        Self {
            init: default_init(),
            start: default_start(),
            stop: default_stop(),
            destroy: default_destroy(),
        }
    }
}

impl CallbackNames {
    /// All four callbacks disabled
    pub fn none() -> Self {
        Self {
            init: None,
            start: None,
            stop: None,
            destroy: None,
        }
    }
}

/// Context values that can be injected into a component's composition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSlot {
    /// The service registry handle
    Registry,
    /// The component's own registration, absent until registered
    Registration,
    /// The owning dependency manager
    Manager,
    /// The lifecycle engine driving the component
    Engine,
}

impl ContextSlot {
    pub const ALL: [ContextSlot; 4] = [
        ContextSlot::Registry,
        ContextSlot::Registration,
        ContextSlot::Manager,
        ContextSlot::Engine,
    ];
}

/// Whether a context slot is injected, and under which name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoConfig {
    /// Inject, optionally addressed by name
    Enabled {
        #[serde(default)]
        name: Option<String>,
    },
    Disabled,
}

impl Default for AutoConfig {
    fn default() -> Self {
        AutoConfig::Enabled { name: None }
    }
}

impl AutoConfig {
    pub fn named(name: impl Into<String>) -> Self {
        AutoConfig::Enabled {
            name: Some(name.into()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, AutoConfig::Enabled { .. })
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            AutoConfig::Enabled { name } => name.as_deref(),
            AutoConfig::Disabled => None,
        }
    }
}

/// One [`AutoConfig`] per [`ContextSlot`], all enabled by default
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoConfigSlots {
    #[serde(default)]
    pub registry: AutoConfig,

    #[serde(default)]
    pub registration: AutoConfig,

    #[serde(default)]
    pub manager: AutoConfig,

    #[serde(default)]
    pub engine: AutoConfig,
}

impl AutoConfigSlots {
    pub fn get(&self, slot: ContextSlot) -> &AutoConfig {
        match slot {
            ContextSlot::Registry => &self.registry,
            ContextSlot::Registration => &self.registration,
            ContextSlot::Manager => &self.manager,
            ContextSlot::Engine => &self.engine,
        }
    }

    pub fn set(&mut self, slot: ContextSlot, config: AutoConfig) {
        match slot {
            ContextSlot::Registry => self.registry = config,
            ContextSlot::Registration => self.registration = config,
            ContextSlot::Manager => self.manager = config,
            ContextSlot::Engine => self.engine = config,
        }
    }
}
