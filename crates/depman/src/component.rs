//! Component instances and the values injected into them

use crate::engine::ComponentLifecycleEngine;
use crate::manager::DependencyManager;
use crate::registration::ComponentRegistration;
use depman_core::{Properties, ServiceObject, ServiceRegistry, Value};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

/// An implementation instance managed by a [`ComponentLifecycleEngine`]
///
/// Components receive context values and dependency values through
/// [`Component::inject`]. Implementations keep whatever they are interested
/// in behind their own interior mutability and ignore the rest.
///
/// # Example
///
/// ```ignore
/// struct Greeter {
///     store: Mutex<Value<ServiceObject>>,
/// }
///
/// impl Component for Greeter {
///     fn inject(&self, injection: &Injection) {
///         if let Injected::Service { value, .. } = &injection.value {
///             *self.store.lock() = value.clone();
///         }
///     }
///
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
/// ```
pub trait Component: Send + Sync + 'static {
    /// Receive an injected value; the default ignores everything
    fn inject(&self, _injection: &Injection) {}

    /// Access to the concrete type, used by typed callbacks
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to an implementation instance
pub type Instance = Arc<dyn Component>;

/// A value delivered to a component, optionally addressed by name
#[derive(Debug, Clone)]
pub struct Injection {
    /// Target name; `None` means "any slot of this kind"
    pub name: Option<String>,
    pub value: Injected,
}

impl Injection {
    pub fn new(name: Option<String>, value: Injected) -> Self {
        Self { name, value }
    }

    /// Whether a slot called `slot` should accept this injection
    pub fn targets(&self, slot: &str) -> bool {
        self.name.as_deref().is_none_or(|name| name == slot)
    }
}

/// The closed set of injectable values
#[derive(Clone)]
pub enum Injected {
    /// The service registry
    Registry(Arc<dyn ServiceRegistry>),
    /// The component's own registration; `None` while not registered
    Registration(Option<ComponentRegistration>),
    Manager(DependencyManager),
    Engine(Weak<ComponentLifecycleEngine>),
    /// Single-valued service dependency
    Service {
        interface: String,
        value: Value<ServiceObject>,
    },
    /// Aggregate service dependency, best provider first
    Services {
        interface: String,
        values: Arc<[ServiceObject]>,
    },
    /// Configuration settings; `None` once deleted
    Configuration {
        pid: String,
        settings: Option<Properties>,
    },
}

impl fmt::Debug for Injected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Injected::Registry(_) => write!(f, "Registry"),
            Injected::Registration(r) => f.debug_tuple("Registration").field(r).finish(),
            Injected::Manager(_) => write!(f, "Manager"),
            Injected::Engine(_) => write!(f, "Engine"),
            Injected::Service { interface, value } => f
                .debug_struct("Service")
                .field("interface", interface)
                .field("present", &value.is_present())
                .finish(),
            Injected::Services { interface, values } => f
                .debug_struct("Services")
                .field("interface", interface)
                .field("count", &values.len())
                .finish(),
            Injected::Configuration { pid, settings } => f
                .debug_struct("Configuration")
                .field("pid", pid)
                .field("present", &settings.is_some())
                .finish(),
        }
    }
}

/// Borrow the component of type `T` registered as `object`
///
/// Components register their [`Instance`] as the provider object, so a
/// consumer holding the [`ServiceObject`] can get back the concrete type.
pub fn component_ref<T: Component>(object: &ServiceObject) -> Option<&T> {
    object
        .downcast_ref::<Instance>()
        .and_then(|instance| instance.as_any().downcast_ref::<T>())
}

/// Borrow the concrete type behind an instance
pub fn downcast_instance<T: Component>(instance: &Instance) -> Option<&T> {
    instance.as_any().downcast_ref::<T>()
}

#[cfg(test)]
#[path = "component/component_tests.rs"]
mod component_tests;
