//! Dependency on providers registered in the service registry

use crate::callback::ServiceCallback;
use crate::component::{Injected, Injection};
use crate::dependency::{Dependency, DependencyId, DependencyService};
use depman_core::properties::{OBJECT_CLASS, SERVICE_ID};
use depman_core::{
    DmError, DmResult, Filter, ListenerId, Properties, Requirement, ServiceEvent, ServiceId,
    ServiceListener, ServiceObject, ServiceReference, ServiceRegistry, Value,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};

/// How many providers a dependency injects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// The best provider: highest ranking, then lowest service id
    #[default]
    Single,
    /// Every provider, best first
    Aggregate,
}

#[derive(Clone)]
struct Tracked {
    reference: ServiceReference,
    object: ServiceObject,
}

#[derive(Default, Clone)]
struct DependencyCallbacks {
    added: Option<ServiceCallback>,
    changed: Option<ServiceCallback>,
    removed: Option<ServiceCallback>,
}

#[derive(Clone, Copy)]
enum CallbackKind {
    Added,
    Changed,
    Removed,
}

impl CallbackKind {
    fn label(self) -> &'static str {
        match self {
            CallbackKind::Added => "Dependency added callback",
            CallbackKind::Changed => "Dependency changed callback",
            CallbackKind::Removed => "Dependency removed callback",
        }
    }
}

struct TrackerState {
    interface: Option<String>,
    filter: Option<Filter>,
    required: bool,
    auto_config: bool,
    auto_config_name: Option<String>,
    callbacks: DependencyCallbacks,
    default_implementation: Option<ServiceObject>,
    cardinality: Cardinality,
    propagate: bool,

    started: bool,
    stopping: bool,
    opening: bool,
    removed_while_opening: HashSet<ServiceId>,
    listener: Option<ListenerId>,
    owner: Option<Weak<dyn DependencyService>>,
    tracked: BTreeMap<ServiceId, Tracked>,
    aggregate: Option<Arc<[ServiceObject]>>,
    last_removed: Option<Tracked>,
}

impl TrackerState {
    fn best(&self) -> Option<&Tracked> {
        self.tracked
            .values()
            .min_by(|a, b| a.reference.preference(&b.reference))
    }

    fn aggregate(&mut self) -> Arc<[ServiceObject]> {
        if let Some(cached) = &self.aggregate {
            return cached.clone();
        }
        let mut all: Vec<&Tracked> = self.tracked.values().collect();
        all.sort_by(|a, b| a.reference.preference(&b.reference));
        let built: Arc<[ServiceObject]> = all.into_iter().map(|t| t.object.clone()).collect();
        self.aggregate = Some(built.clone());
        built
    }

    fn owner(&self) -> Option<Arc<dyn DependencyService>> {
        self.owner.as_ref().and_then(Weak::upgrade)
    }

    fn ensure_stopped(&self) -> DmResult<()> {
        if self.started {
            Err(DmError::invalid_state("stopped", "started"))
        } else {
            Ok(())
        }
    }
}

/// Tracks registry providers matching an interface and optional filter
///
/// Required by default. The first matching provider makes the dependency
/// available; losing the last one makes it unavailable. Added, changed and
/// removed callbacks for optional dependencies fire as providers come and go;
/// for required dependencies the first "added" and last "removed" are
/// delivered by the owning component during activation and deactivation.
pub struct ServiceDependency {
    id: DependencyId,
    this: Weak<ServiceDependency>,
    registry: Arc<dyn ServiceRegistry>,
    state: Mutex<TrackerState>,
}

struct TrackerListener(Weak<ServiceDependency>);

impl ServiceListener for TrackerListener {
    fn service_changed(&self, event: &ServiceEvent) {
        if let Some(dependency) = self.0.upgrade() {
            dependency.on_event(event);
        }
    }
}

impl ServiceDependency {
    pub fn new(registry: Arc<dyn ServiceRegistry>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            id: DependencyId::next(),
            this: this.clone(),
            registry,
            state: Mutex::new(TrackerState {
                interface: None,
                filter: None,
                required: true,
                auto_config: true,
                auto_config_name: None,
                callbacks: DependencyCallbacks::default(),
                default_implementation: None,
                cardinality: Cardinality::Single,
                propagate: false,
                started: false,
                stopping: false,
                opening: false,
                removed_while_opening: HashSet::new(),
                listener: None,
                owner: None,
                tracked: BTreeMap::new(),
                aggregate: None,
                last_removed: None,
            }),
        })
    }

    // ---- configuration ----

    fn configure(&self, apply: impl FnOnce(&mut TrackerState)) -> DmResult<&Self> {
        let mut state = self.state.lock();
        state.ensure_stopped()?;
        apply(&mut state);
        Ok(self)
    }

    /// Track providers of `interface`, optionally narrowed by an LDAP filter
    pub fn set_service(&self, interface: &str, filter: Option<&str>) -> DmResult<&Self> {
        let mut combined = Filter::interface(interface);
        if let Some(filter) = filter {
            combined = combined.and(Filter::parse(filter)?);
        }
        self.configure(|s| {
            s.interface = Some(interface.to_string());
            s.filter = Some(combined);
        })
    }

    pub fn set_required(&self, required: bool) -> DmResult<&Self> {
        self.configure(|s| s.required = required)
    }

    pub fn set_auto_config(&self, auto_config: bool) -> DmResult<&Self> {
        self.configure(|s| s.auto_config = auto_config)
    }

    /// Inject only into the slot called `name`; enables injection
    pub fn set_auto_config_name(&self, name: &str) -> DmResult<&Self> {
        self.configure(|s| {
            s.auto_config = true;
            s.auto_config_name = Some(name.to_string());
        })
    }

    pub fn set_callbacks(
        &self,
        added: Option<ServiceCallback>,
        changed: Option<ServiceCallback>,
        removed: Option<ServiceCallback>,
    ) -> DmResult<&Self> {
        self.configure(|s| {
            s.callbacks = DependencyCallbacks {
                added,
                changed,
                removed,
            }
        })
    }

    /// Object injected while no provider is tracked
    pub fn set_default_implementation(&self, object: ServiceObject) -> DmResult<&Self> {
        self.configure(|s| s.default_implementation = Some(object))
    }

    pub fn set_cardinality(&self, cardinality: Cardinality) -> DmResult<&Self> {
        self.configure(|s| s.cardinality = cardinality)
    }

    /// Merge the best provider's properties into the owner's service properties
    pub fn set_propagate(&self, propagate: bool) -> DmResult<&Self> {
        self.configure(|s| s.propagate = propagate)
    }

    // ---- accessors ----

    /// The best provider, else the default implementation, else absent
    pub fn service(&self) -> Value<ServiceObject> {
        let state = self.state.lock();
        match state.best() {
            Some(best) => Value::Present(best.object.clone()),
            None => state.default_implementation.clone().into(),
        }
    }

    /// Every tracked provider, best first
    pub fn services(&self) -> Arc<[ServiceObject]> {
        self.state.lock().aggregate()
    }

    pub fn service_reference(&self) -> Option<ServiceReference> {
        self.state.lock().best().map(|t| t.reference.clone())
    }

    pub fn references(&self) -> Vec<ServiceReference> {
        let state = self.state.lock();
        let mut all: Vec<ServiceReference> =
            state.tracked.values().map(|t| t.reference.clone()).collect();
        all.sort_by(|a, b| a.preference(b));
        all
    }

    pub fn tracked_count(&self) -> usize {
        self.state.lock().tracked.len()
    }

    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }

    pub fn interface(&self) -> Option<String> {
        self.state.lock().interface.clone()
    }

    pub fn filter(&self) -> Option<Filter> {
        self.state.lock().filter.clone()
    }

    pub fn cardinality(&self) -> Cardinality {
        self.state.lock().cardinality
    }

    // ---- tracking ----

    fn on_event(&self, event: &ServiceEvent) {
        match event {
            ServiceEvent::Registered(reference) => self.add(reference.clone()),
            ServiceEvent::Modified(reference) => {
                let known = self.state.lock().tracked.contains_key(&reference.id());
                if known {
                    self.modified(reference.clone());
                } else {
                    self.add(reference.clone());
                }
            }
            ServiceEvent::ModifiedEndMatch(reference) | ServiceEvent::Unregistering(reference) => {
                {
                    let mut state = self.state.lock();
                    if state.opening && !state.tracked.contains_key(&reference.id()) {
                        state.removed_while_opening.insert(reference.id());
                    }
                }
                self.remove(reference);
            }
        }
    }

    fn add(&self, reference: ServiceReference) {
        let id = reference.id();
        {
            let state = self.state.lock();
            if !state.started || state.stopping || state.tracked.contains_key(&id) {
                return;
            }
        }
        let Some(object) = self.registry.acquire(&reference) else {
            tracing::debug!(service = %reference, "Provider went away before it was acquired");
            return;
        };

        let (owner, first, required, callback) = {
            let mut state = self.state.lock();
            if !state.started || state.stopping || state.tracked.contains_key(&id) {
                drop(state);
                self.registry.release(&reference);
                return;
            }
            let first = state.tracked.is_empty();
            state.tracked.insert(
                id,
                Tracked {
                    reference: reference.clone(),
                    object: object.clone(),
                },
            );
            state.aggregate = None;
            (
                state.owner(),
                first,
                state.required,
                state.callbacks.added.clone(),
            )
        };
        tracing::debug!(service = %reference, first, "Provider tracked");

        let Some(owner) = owner else { return };
        if first {
            owner.dependency_available(self);
            if !required {
                self.invoke(callback, CallbackKind::Added, &*owner, &reference, &object);
            }
        } else {
            owner.dependency_changed(self);
            self.invoke(callback, CallbackKind::Added, &*owner, &reference, &object);
        }
    }

    fn modified(&self, reference: ServiceReference) {
        let (owner, object, callback) = {
            let mut state = self.state.lock();
            let Some(tracked) = state.tracked.get_mut(&reference.id()) else {
                return;
            };
            tracked.reference = reference.clone();
            let object = tracked.object.clone();
            state.aggregate = None;
            (state.owner(), object, state.callbacks.changed.clone())
        };
        let Some(owner) = owner else { return };
        owner.dependency_changed(self);
        if owner.is_registered() {
            self.invoke(callback, CallbackKind::Changed, &*owner, &reference, &object);
        }
    }

    fn remove(&self, reference: &ServiceReference) {
        let (owner, last, required, callback, tracked) = {
            let mut state = self.state.lock();
            let Some(tracked) = state.tracked.remove(&reference.id()) else {
                return;
            };
            state.aggregate = None;
            let last = state.tracked.is_empty();
            if last && state.required {
                state.last_removed = Some(tracked.clone());
            }
            (
                state.owner(),
                last,
                state.required,
                state.callbacks.removed.clone(),
                tracked,
            )
        };
        tracing::debug!(service = %tracked.reference, last, "Provider removed");

        if let Some(owner) = owner {
            if last {
                owner.dependency_unavailable(self);
                if !required {
                    self.invoke(
                        callback,
                        CallbackKind::Removed,
                        &*owner,
                        &tracked.reference,
                        &tracked.object,
                    );
                }
            } else {
                owner.dependency_changed(self);
                self.invoke(
                    callback,
                    CallbackKind::Removed,
                    &*owner,
                    &tracked.reference,
                    &tracked.object,
                );
            }
        }
        self.registry.release(&tracked.reference);
    }

    fn invoke(
        &self,
        callback: Option<ServiceCallback>,
        kind: CallbackKind,
        owner: &dyn DependencyService,
        reference: &ServiceReference,
        object: &ServiceObject,
    ) {
        let Some(callback) = callback else { return };
        let targets = owner.composition_instances();
        if targets.is_empty() {
            tracing::debug!(service = %reference, "{} skipped, no instance", kind.label());
            return;
        }
        callback.invoke(kind.label(), &targets, reference, object);
    }
}

impl Requirement for ServiceDependency {
    fn is_required(&self) -> bool {
        self.state.lock().required
    }

    fn is_available(&self) -> bool {
        let state = self.state.lock();
        !state.required || !state.tracked.is_empty()
    }
}

impl Dependency for ServiceDependency {
    fn id(&self) -> DependencyId {
        self.id
    }

    fn start(&self, owner: &Arc<dyn DependencyService>) {
        let filter = {
            let mut state = self.state.lock();
            if state.started {
                tracing::warn!(dependency = %self.name_locked(&state), "Service dependency already started");
                return;
            }
            let Some(filter) = state.filter.clone() else {
                tracing::error!("Cannot track a service dependency without a service name");
                return;
            };
            state.started = true;
            state.stopping = false;
            state.opening = true;
            state.removed_while_opening.clear();
            state.last_removed = None;
            state.owner = Some(Arc::downgrade(owner));
            filter
        };

        let listener = Arc::new(TrackerListener(self.this.clone()));
        let (listener_id, initial) = self.registry.track(filter, listener);
        self.state.lock().listener = Some(listener_id);

        for reference in initial {
            let skip = self
                .state
                .lock()
                .removed_while_opening
                .contains(&reference.id());
            if skip || !self.registry.is_registered(&reference) {
                continue;
            }
            self.add(reference);
        }

        let mut state = self.state.lock();
        state.opening = false;
        state.removed_while_opening.clear();
    }

    fn stop(&self, owner: &Arc<dyn DependencyService>) {
        let listener = {
            let mut state = self.state.lock();
            if !state.started {
                tracing::warn!(dependency = %self.name_locked(&state), "Service dependency was not started");
                return;
            }
            state.stopping = true;
            state.listener.take()
        };
        if let Some(listener) = listener {
            self.registry.unsubscribe(listener);
        }

        let (removed, required, callback) = {
            let mut state = self.state.lock();
            let mut removed: Vec<Tracked> = std::mem::take(&mut state.tracked).into_values().collect();
            removed.sort_by(|a, b| a.reference.preference(&b.reference));
            state.aggregate = None;
            if state.required {
                if let Some(best) = removed.first() {
                    state.last_removed = Some(best.clone());
                }
            }
            state.started = false;
            state.stopping = false;
            state.opening = false;
            state.owner = None;
            (removed, state.required, state.callbacks.removed.clone())
        };

        if !removed.is_empty() {
            owner.dependency_unavailable(self);
            if !required {
                for tracked in &removed {
                    self.invoke(
                        callback.clone(),
                        CallbackKind::Removed,
                        &**owner,
                        &tracked.reference,
                        &tracked.object,
                    );
                }
            }
        }
        for tracked in removed {
            self.registry.release(&tracked.reference);
        }
    }

    fn is_auto_config(&self) -> bool {
        self.state.lock().auto_config
    }

    fn injection(&self) -> Option<Injection> {
        let mut state = self.state.lock();
        let interface = state.interface.clone()?;
        let value = match state.cardinality {
            Cardinality::Single => Injected::Service {
                interface,
                value: match state.best() {
                    Some(best) => Value::Present(best.object.clone()),
                    None => state.default_implementation.clone().into(),
                },
            },
            Cardinality::Aggregate => Injected::Services {
                interface,
                values: state.aggregate(),
            },
        };
        Some(Injection::new(state.auto_config_name.clone(), value))
    }

    fn is_propagated(&self) -> bool {
        self.state.lock().propagate
    }

    fn properties(&self) -> Option<Properties> {
        let state = self.state.lock();
        let best = state.best()?;
        let mut properties = best.reference.properties().clone();
        properties.remove(OBJECT_CLASS);
        properties.remove(SERVICE_ID);
        Some(properties)
    }

    fn invoke_added(&self, owner: &dyn DependencyService) {
        let (best, callback) = {
            let state = self.state.lock();
            (state.best().cloned(), state.callbacks.added.clone())
        };
        if let Some(best) = best {
            self.invoke(callback, CallbackKind::Added, owner, &best.reference, &best.object);
        }
    }

    fn invoke_removed(&self, owner: &dyn DependencyService) {
        let (target, callback) = {
            let mut state = self.state.lock();
            let target = state.last_removed.take().or_else(|| state.best().cloned());
            (target, state.callbacks.removed.clone())
        };
        if let Some(target) = target {
            self.invoke(callback, CallbackKind::Removed, owner, &target.reference, &target.object);
        }
    }

    fn kind(&self) -> &'static str {
        "service"
    }

    fn name(&self) -> String {
        self.name_locked(&self.state.lock())
    }
}

impl ServiceDependency {
    fn name_locked(&self, state: &TrackerState) -> String {
        match &state.filter {
            Some(filter) => filter.to_string(),
            None => format!("unconfigured service dependency {}", self.id),
        }
    }
}

impl fmt::Debug for ServiceDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ServiceDependency")
            .field("id", &self.id)
            .field("filter", &state.filter.as_ref().map(ToString::to_string))
            .field("required", &state.required)
            .field("started", &state.started)
            .field("tracked", &state.tracked.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "service_dependency/service_dependency_tests.rs"]
mod service_dependency_tests;
