//! Typed callback tables
//!
//! Callbacks are registered by name against the concrete component type at
//! configuration time. Looking up a name that was never registered, or
//! invoking a callback on an instance of another type, yields
//! [`CallbackOutcome::NotFound`] and is never fatal.

use crate::component::{Component, Instance};
use depman_core::{CallbackError, ConfigurationError, Properties, ServiceObject, ServiceReference};
use depman_runtime::catch_logged;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type LifecycleFn = Arc<dyn Fn(&dyn Component) -> Option<Result<(), CallbackError>> + Send + Sync>;
type FactoryFn = Arc<dyn Fn(&dyn Any) -> Option<Result<Instance, CallbackError>> + Send + Sync>;
type CompositionFn = Arc<dyn Fn(&dyn Any) -> Option<Vec<Instance>> + Send + Sync>;

/// Result of invoking a named callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// At least one target ran the callback successfully
    Invoked,
    /// No callback with that name applies to the target
    NotFound,
    /// The callback returned an error or panicked
    Failed(String),
}

impl CallbackOutcome {
    pub fn is_invoked(&self) -> bool {
        matches!(self, CallbackOutcome::Invoked)
    }
}

/// Name-keyed lifecycle, factory and composition callbacks
///
/// # Example
///
/// ```ignore
/// let table = CallbackTable::new()
///     .lifecycle::<Greeter>("start", |g| g.open())
///     .lifecycle::<Greeter>("stop", |g| g.close());
/// ```
#[derive(Clone, Default)]
pub struct CallbackTable {
    lifecycle: HashMap<String, LifecycleFn>,
    factories: HashMap<String, FactoryFn>,
    compositions: HashMap<String, CompositionFn>,
}

impl CallbackTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a lifecycle callback (`init`, `start`, `stop`, `destroy` or any
    /// custom name) for components of type `T`
    pub fn lifecycle<T: Component>(
        mut self,
        name: impl Into<String>,
        callback: impl Fn(&T) -> Result<(), CallbackError> + Send + Sync + 'static,
    ) -> Self {
        let f: LifecycleFn = Arc::new(move |component: &dyn Component| {
            component.as_any().downcast_ref::<T>().map(&callback)
        });
        self.lifecycle.insert(name.into(), f);
        self
    }

    /// Register a creation method on a factory object of type `F`
    pub fn factory<F: Any>(
        mut self,
        name: impl Into<String>,
        create: impl Fn(&F) -> Result<Instance, CallbackError> + Send + Sync + 'static,
    ) -> Self {
        let f: FactoryFn = Arc::new(move |factory: &dyn Any| factory.downcast_ref::<F>().map(&create));
        self.factories.insert(name.into(), f);
        self
    }

    /// Register a composition accessor on an object of type `M`
    pub fn composition<M: Any>(
        mut self,
        name: impl Into<String>,
        compose: impl Fn(&M) -> Vec<Instance> + Send + Sync + 'static,
    ) -> Self {
        let f: CompositionFn =
            Arc::new(move |manager: &dyn Any| manager.downcast_ref::<M>().map(&compose));
        self.compositions.insert(name.into(), f);
        self
    }

    pub fn has_lifecycle(&self, name: &str) -> bool {
        self.lifecycle.contains_key(name)
    }

    /// Invoke the lifecycle callback `name` on every target of a matching type
    pub fn invoke_lifecycle(&self, name: &str, targets: &[Instance]) -> CallbackOutcome {
        let Some(callback) = self.lifecycle.get(name) else {
            tracing::debug!(callback = name, "Lifecycle callback not registered, skipping");
            return CallbackOutcome::NotFound;
        };

        // Every target gets the callback; the first failure is reported
        let mut outcome = CallbackOutcome::NotFound;
        let mut failure = None;
        for target in targets {
            let context = format!("Lifecycle callback '{name}'");
            match catch_logged(&context, || callback(&**target)) {
                None => {
                    failure.get_or_insert(format!("{context} panicked"));
                }
                Some(None) => {}
                Some(Some(Ok(()))) => outcome = CallbackOutcome::Invoked,
                Some(Some(Err(e))) => {
                    tracing::error!(callback = name, error = %e, "Lifecycle callback failed");
                    failure.get_or_insert(e.to_string());
                }
            }
        }
        if let Some(reason) = failure {
            return CallbackOutcome::Failed(reason);
        }
        if outcome == CallbackOutcome::NotFound {
            tracing::debug!(callback = name, "No target accepts lifecycle callback, skipping");
        }
        outcome
    }

    /// Create an instance through the factory method `name`
    pub fn invoke_factory(&self, name: &str, factory: &dyn Any) -> Option<Instance> {
        let Some(create) = self.factories.get(name) else {
            tracing::error!(method = name, "Factory method not registered");
            return None;
        };
        match catch_logged("Factory method", || create(factory))? {
            Some(Ok(instance)) => Some(instance),
            Some(Err(e)) => {
                tracing::error!(method = name, error = %e, "Factory method failed");
                None
            }
            None => {
                tracing::error!(method = name, "Factory object has an unexpected type");
                None
            }
        }
    }

    /// Resolve the composition through the accessor `name`
    pub fn invoke_composition(&self, name: &str, manager: &dyn Any) -> Option<Vec<Instance>> {
        let Some(compose) = self.compositions.get(name) else {
            tracing::debug!(method = name, "Composition accessor not registered");
            return None;
        };
        catch_logged("Composition accessor", || compose(manager)).flatten()
    }
}

impl fmt::Debug for CallbackTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lifecycle: Vec<&String> = self.lifecycle.keys().collect();
        lifecycle.sort();
        f.debug_struct("CallbackTable")
            .field("lifecycle", &lifecycle)
            .field("factories", &self.factories.len())
            .field("compositions", &self.compositions.len())
            .finish()
    }
}

type ServiceFn = Arc<
    dyn Fn(&dyn Component, &ServiceReference, &ServiceObject) -> Option<Result<(), CallbackError>>
        + Send
        + Sync,
>;

/// Callback receiving a provider's reference and object
#[derive(Clone)]
pub struct ServiceCallback(ServiceFn);

impl ServiceCallback {
    pub fn new<T: Component>(
        callback: impl Fn(&T, &ServiceReference, &ServiceObject) -> Result<(), CallbackError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self(Arc::new(
            move |component: &dyn Component, reference: &ServiceReference, object: &ServiceObject| {
                component
                    .as_any()
                    .downcast_ref::<T>()
                    .map(|target| callback(target, reference, object))
            },
        ))
    }

    pub(crate) fn invoke(
        &self,
        context: &str,
        targets: &[Instance],
        reference: &ServiceReference,
        object: &ServiceObject,
    ) -> CallbackOutcome {
        let mut outcome = CallbackOutcome::NotFound;
        for target in targets {
            match catch_logged(context, || (self.0)(&**target, reference, object)) {
                None => return CallbackOutcome::Failed(format!("{context} panicked")),
                Some(None) => {}
                Some(Some(Ok(()))) => outcome = CallbackOutcome::Invoked,
                Some(Some(Err(e))) => {
                    tracing::error!(service = %reference, error = %e, "{} failed", context);
                    return CallbackOutcome::Failed(e.to_string());
                }
            }
        }
        outcome
    }
}

impl fmt::Debug for ServiceCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceCallback")
    }
}

type ConfigurationFn = Arc<
    dyn Fn(&dyn Component, Option<&Properties>) -> Option<Result<(), ConfigurationError>>
        + Send
        + Sync,
>;

/// Callback receiving configuration settings; `None` means deleted
#[derive(Clone)]
pub struct ConfigurationCallback(ConfigurationFn);

impl ConfigurationCallback {
    pub fn new<T: Component>(
        callback: impl Fn(&T, Option<&Properties>) -> Result<(), ConfigurationError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self(Arc::new(move |component: &dyn Component, settings: Option<&Properties>| {
            component
                .as_any()
                .downcast_ref::<T>()
                .map(|target| callback(target, settings))
        }))
    }

    /// Deliver settings to every matching target; the first rejection wins
    ///
    /// A target without a matching callback accepts the settings.
    pub(crate) fn invoke(
        &self,
        targets: &[Instance],
        settings: Option<&Properties>,
    ) -> Result<(), ConfigurationError> {
        for target in targets {
            match catch_logged("Configuration callback", || (self.0)(&**target, settings)) {
                None => return Err(ConfigurationError::new("configuration callback panicked")),
                Some(Some(Err(e))) => return Err(e),
                Some(_) => {}
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ConfigurationCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfigurationCallback")
    }
}
