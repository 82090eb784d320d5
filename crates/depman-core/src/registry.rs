//! Narrow interfaces of the service registry collaborator

use crate::{
    ConfigurationError, DmResult, Filter, Properties, ServiceEvent, ServiceObject,
    ServiceReference,
};
use std::sync::Arc;

/// Interface name under which configuration sinks are registered
pub const MANAGED_SERVICE: &str = "depman.ManagedService";

/// Identity of a registry subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Receives events for services matching a subscription filter
pub trait ServiceListener: Send + Sync {
    fn service_changed(&self, event: &ServiceEvent);
}

/// Handle returned by [`ServiceRegistry::register`]
pub trait RegistrationHandle: Send + Sync {
    /// Reference of the registered service; fails once unregistered
    fn reference(&self) -> DmResult<ServiceReference>;

    /// Replace the service's properties and notify listeners
    fn set_properties(&self, properties: Properties) -> DmResult<()>;

    /// Remove the service from the registry; fails if already unregistered
    fn unregister(&self) -> DmResult<()>;
}

/// The service registry as seen by the lifecycle engine
///
/// Implementations deliver listener events synchronously and must not hold
/// internal locks while doing so, since listeners re-enter the registry.
pub trait ServiceRegistry: Send + Sync {
    /// All services currently matching `filter`
    fn query(&self, filter: &Filter) -> Vec<ServiceReference>;

    fn subscribe(&self, filter: Filter, listener: Arc<dyn ServiceListener>) -> ListenerId;

    fn unsubscribe(&self, id: ListenerId);

    /// Get the provider object, incrementing its use count
    fn acquire(&self, reference: &ServiceReference) -> Option<ServiceObject>;

    /// Drop one use of the provider object; returns false if it was not in use
    fn release(&self, reference: &ServiceReference) -> bool;

    fn register(
        &self,
        interfaces: &[String],
        service: ServiceObject,
        properties: Properties,
    ) -> DmResult<Box<dyn RegistrationHandle>>;

    fn is_registered(&self, reference: &ServiceReference) -> bool;

    /// Subscribe and return the services already matching.
    ///
    /// The default looks before it listens: a service registered between the
    /// query and the subscription is missed, and one unregistered in that window
    /// is returned stale. Registries that can snapshot and subscribe atomically
    /// should override this.
    fn track(
        &self,
        filter: Filter,
        listener: Arc<dyn ServiceListener>,
    ) -> (ListenerId, Vec<ServiceReference>) {
        let initial = self.query(&filter);
        let id = self.subscribe(filter, listener);
        (id, initial)
    }
}

/// Sink for configuration dictionaries identified by a pid
pub trait ManagedService: Send + Sync {
    /// Deliver new settings, or `None` when the configuration was deleted
    fn updated(&self, settings: Option<Properties>) -> Result<(), ConfigurationError>;
}
