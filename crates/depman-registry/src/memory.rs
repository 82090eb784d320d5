//! Thread-safe in-memory service registry

use dashmap::DashMap;
use depman_core::properties;
use depman_core::{
    DmError, DmResult, Filter, ListenerId, Properties, RegistrationHandle, ServiceEvent, ServiceId,
    ServiceListener, ServiceObject, ServiceReference, ServiceRegistry,
};
use depman_runtime::catch_logged;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

struct Entry {
    reference: ServiceReference,
    object: ServiceObject,
    use_count: usize,
}

struct Subscription {
    id: ListenerId,
    filter: Filter,
    listener: Arc<dyn ServiceListener>,
}

struct RegistryInner {
    services: DashMap<ServiceId, Entry>,
    // Registry mutations hold this for reading while they change `services`;
    // `track` holds it for writing, so its snapshot and subscription are atomic.
    subscriptions: RwLock<Vec<Subscription>>,
    next_service_id: AtomicU64,
    next_listener_id: AtomicU64,
}

/// Registry keeping services in memory and delivering events synchronously
///
/// Events are delivered on the thread that caused them, after every internal
/// lock has been released, so listeners may call back into the registry.
#[derive(Clone)]
pub struct InMemoryRegistry {
    inner: Arc<RegistryInner>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                services: DashMap::new(),
                subscriptions: RwLock::new(Vec::new()),
                next_service_id: AtomicU64::new(1),
                next_listener_id: AtomicU64::new(1),
            }),
        }
    }

    /// Number of registered services
    pub fn service_count(&self) -> usize {
        self.inner.services.len()
    }

    /// Number of active subscriptions
    pub fn listener_count(&self) -> usize {
        self.inner.subscriptions.read().len()
    }

    /// Current use count of a service, `None` if it is not registered
    pub fn use_count(&self, reference: &ServiceReference) -> Option<usize> {
        self.inner
            .services
            .get(&reference.id())
            .map(|entry| entry.use_count)
    }

    /// Every registered service, ordered by id
    pub fn references(&self) -> Vec<ServiceReference> {
        let mut all: Vec<ServiceReference> = self
            .inner
            .services
            .iter()
            .map(|entry| entry.reference.clone())
            .collect();
        all.sort_by_key(ServiceReference::id);
        all
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryInner {
    fn query(&self, filter: &Filter) -> Vec<ServiceReference> {
        let mut matching: Vec<ServiceReference> = self
            .services
            .iter()
            .filter(|entry| filter.matches(entry.reference.properties()))
            .map(|entry| entry.reference.clone())
            .collect();
        matching.sort_by_key(ServiceReference::id);
        matching
    }

    fn listeners_matching(
        subscriptions: &[Subscription],
        properties: &Properties,
    ) -> Vec<Arc<dyn ServiceListener>> {
        subscriptions
            .iter()
            .filter(|s| s.filter.matches(properties))
            .map(|s| s.listener.clone())
            .collect()
    }

    fn dispatch(deliveries: Vec<(Arc<dyn ServiceListener>, ServiceEvent)>) {
        for (listener, event) in deliveries {
            catch_logged("Service listener", || listener.service_changed(&event));
        }
    }

    fn unregister(&self, id: ServiceId) -> DmResult<()> {
        let (reference, listeners) = {
            let subscriptions = self.subscriptions.read();
            let Some((_, entry)) = self.services.remove(&id) else {
                return Err(DmError::IllegalRegistrationState(format!(
                    "service {id} is already unregistered"
                )));
            };
            let listeners = Self::listeners_matching(&subscriptions, entry.reference.properties());
            (entry.reference, listeners)
        };

        tracing::debug!(service = %reference, "Service unregistered");
        Self::dispatch(
            listeners
                .into_iter()
                .map(|l| (l, ServiceEvent::Unregistering(reference.clone())))
                .collect(),
        );
        Ok(())
    }

    fn set_properties(&self, id: ServiceId, properties: Properties) -> DmResult<()> {
        properties::validate(&properties)?;
        let deliveries = {
            let subscriptions = self.subscriptions.read();
            let Some(mut entry) = self.services.get_mut(&id) else {
                return Err(DmError::IllegalRegistrationState(format!(
                    "service {id} is already unregistered"
                )));
            };
            let previous = entry.reference.clone();
            let updated = previous.with_properties(properties);
            entry.reference = updated.clone();
            drop(entry);

            subscriptions
                .iter()
                .filter_map(|s| {
                    let was = s.filter.matches(previous.properties());
                    let now = s.filter.matches(updated.properties());
                    let event = match (was, now) {
                        (true, true) => ServiceEvent::Modified(updated.clone()),
                        (false, true) => ServiceEvent::Registered(updated.clone()),
                        (true, false) => ServiceEvent::ModifiedEndMatch(updated.clone()),
                        (false, false) => return None,
                    };
                    Some((s.listener.clone(), event))
                })
                .collect::<Vec<_>>()
        };

        Self::dispatch(deliveries);
        Ok(())
    }
}

impl ServiceRegistry for InMemoryRegistry {
    fn query(&self, filter: &Filter) -> Vec<ServiceReference> {
        self.inner.query(filter)
    }

    fn subscribe(&self, filter: Filter, listener: Arc<dyn ServiceListener>) -> ListenerId {
        let id = ListenerId(self.inner.next_listener_id.fetch_add(1, Ordering::SeqCst));
        self.inner.subscriptions.write().push(Subscription {
            id,
            filter,
            listener,
        });
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.inner.subscriptions.write().retain(|s| s.id != id);
    }

    fn acquire(&self, reference: &ServiceReference) -> Option<ServiceObject> {
        let mut entry = self.inner.services.get_mut(&reference.id())?;
        entry.use_count += 1;
        Some(entry.object.clone())
    }

    fn release(&self, reference: &ServiceReference) -> bool {
        match self.inner.services.get_mut(&reference.id()) {
            Some(mut entry) if entry.use_count > 0 => {
                entry.use_count -= 1;
                true
            }
            _ => false,
        }
    }

    fn register(
        &self,
        interfaces: &[String],
        service: ServiceObject,
        properties: Properties,
    ) -> DmResult<Box<dyn RegistrationHandle>> {
        if interfaces.is_empty() {
            return Err(DmError::InvalidProperties(
                "a service needs at least one interface name".to_string(),
            ));
        }
        properties::validate(&properties)?;

        let id = ServiceId(self.inner.next_service_id.fetch_add(1, Ordering::SeqCst));
        let reference = ServiceReference::new(id, interfaces, properties);
        let listeners = {
            let subscriptions = self.inner.subscriptions.read();
            self.inner.services.insert(
                id,
                Entry {
                    reference: reference.clone(),
                    object: service,
                    use_count: 0,
                },
            );
            RegistryInner::listeners_matching(&subscriptions, reference.properties())
        };

        tracing::debug!(service = %reference, "Service registered");
        RegistryInner::dispatch(
            listeners
                .into_iter()
                .map(|l| (l, ServiceEvent::Registered(reference.clone())))
                .collect(),
        );

        Ok(Box::new(MemoryRegistration {
            registry: self.inner.clone(),
            id,
        }))
    }

    fn is_registered(&self, reference: &ServiceReference) -> bool {
        self.inner.services.contains_key(&reference.id())
    }

    fn track(
        &self,
        filter: Filter,
        listener: Arc<dyn ServiceListener>,
    ) -> (ListenerId, Vec<ServiceReference>) {
        let id = ListenerId(self.inner.next_listener_id.fetch_add(1, Ordering::SeqCst));
        let mut subscriptions = self.inner.subscriptions.write();
        let initial = self.inner.query(&filter);
        subscriptions.push(Subscription {
            id,
            filter,
            listener,
        });
        (id, initial)
    }
}

/// Registration handle for a service in an [`InMemoryRegistry`]
struct MemoryRegistration {
    registry: Arc<RegistryInner>,
    id: ServiceId,
}

impl RegistrationHandle for MemoryRegistration {
    fn reference(&self) -> DmResult<ServiceReference> {
        self.registry
            .services
            .get(&self.id)
            .map(|entry| entry.reference.clone())
            .ok_or_else(|| {
                DmError::IllegalRegistrationState(format!(
                    "service {} is already unregistered",
                    self.id
                ))
            })
    }

    fn set_properties(&self, properties: Properties) -> DmResult<()> {
        self.registry.set_properties(self.id, properties)
    }

    fn unregister(&self) -> DmResult<()> {
        self.registry.unregister(self.id)
    }
}
