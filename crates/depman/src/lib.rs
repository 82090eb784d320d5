//! # depman
//!
//! A service dependency lifecycle engine.
//!
//! Components declare dependencies on services published in a registry and
//! on configuration dictionaries. Each component is driven by a
//! [`ComponentLifecycleEngine`] that derives its state from the availability
//! of those dependencies:
//!
//! - **Inactive**: not started
//! - **WaitingForRequired**: started, some required dependency missing
//! - **TrackingOptional**: every required dependency present; the component
//!   is activated and its own service published
//!
//! Transitions run serially on a per-component task queue, outside every
//! lock, so callbacks may safely call back into the engine or the registry.
//!
//! ## Example
//!
//! ```ignore
//! use depman::prelude::*;
//!
//! let manager = DependencyManager::in_memory();
//!
//! let store = manager.create_service_dependency();
//! store.set_service("org.example.Store", None)?;
//!
//! let component = manager.create_component();
//! component
//!     .set_interface(["org.example.Greeter"], Properties::new())?
//!     .set_constructor(|| Arc::new(Greeter::default()) as Instance)?;
//! component.add_dependency(store);
//!
//! manager.add(component.clone())?;
//! assert_eq!(component.classification(), Classification::WaitingForRequired);
//! ```
//!
//! ## Crate Structure
//!
//! This is a facade crate that re-exports from:
//! - [`depman_core`] - Core types, collaborator traits and state classification
//! - [`depman_runtime`] - The serial task queue

mod callback;
mod component;
mod configuration_dependency;
mod dependency;
mod description;
mod engine;
mod listener;
mod manager;
mod registration;
mod service_dependency;

#[cfg(test)]
mod test_support;

pub use callback::{CallbackOutcome, CallbackTable, ConfigurationCallback, ServiceCallback};
pub use component::{Component, Injected, Injection, Instance, component_ref, downcast_instance};
pub use configuration_dependency::ConfigurationDependency;
pub use dependency::{Dependency, DependencyId, DependencyService};
pub use description::{ComponentDescription, DependencyDescription};
pub use engine::ComponentLifecycleEngine;
pub use listener::ServiceStateListener;
pub use manager::{DependencyManager, WeakDependencyManager};
pub use registration::{ComponentRegistration, RegistrationStatus};
pub use service_dependency::{Cardinality, ServiceDependency};

// Re-export core types
pub use depman_core::{
    AutoConfig, AutoConfigSlots, CallbackError, CallbackNames, Classification, ComponentConfig,
    ConfigurationError, ContextSlot, DependencyState, DmError, DmResult, Filter, LogLevel,
    MANAGED_SERVICE, ManagedService, Properties, RegistrationHandle, Requirement, ServiceEvent,
    ServiceId, ServiceListener, ServiceObject, ServiceReference, ServiceRegistry, Value,
};
pub use depman_registry::InMemoryRegistry;
pub use depman_runtime::SerialTaskQueue;

// Re-export common dependencies that component authors need
pub use serde_json;
pub use tracing;

/// Prelude module for convenient imports.
///
/// Use `use depman::prelude::*;` to import commonly used types.
pub mod prelude {
    pub use crate::{
        Cardinality, Classification, Component, ComponentLifecycleEngine, ConfigurationDependency,
        DependencyManager, DmError, DmResult, Injected, Injection, Instance, Properties,
        ServiceCallback, ServiceDependency, ServiceObject, ServiceRegistry, Value,
    };
    pub use crate::{CallbackError, CallbackTable, ConfigurationCallback, ConfigurationError};
    pub use std::any::Any;
    pub use std::sync::Arc;
}
