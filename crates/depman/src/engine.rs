//! Component lifecycle engine

use crate::callback::CallbackTable;
use crate::component::{Injected, Injection, Instance};
use crate::dependency::{Dependency, DependencyId, DependencyService};
use crate::description::{ComponentDescription, DependencyDescription};
use crate::listener::ServiceStateListener;
use crate::manager::WeakDependencyManager;
use crate::registration::ComponentRegistration;
use depman_core::properties;
use depman_core::{
    AutoConfig, AutoConfigSlots, CallbackNames, Classification, ComponentConfig, ContextSlot,
    DependencyState, DmError, DmResult, Properties, ServiceObject, ServiceRegistry, Step,
    Transition, transitions,
};
use depman_runtime::{SerialTaskQueue, catch_logged};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;

static NEXT_COMPONENT: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_component_name() -> String {
    format!("component-{}", NEXT_COMPONENT.fetch_add(1, Ordering::Relaxed))
}

type Constructor = Arc<dyn Fn() -> Instance + Send + Sync>;
type AnyObject = Arc<dyn Any + Send + Sync>;
type Snapshot = DependencyState<dyn Dependency>;

struct DependencyList {
    dependencies: Vec<Arc<dyn Dependency>>,
    state: Snapshot,
}

struct EngineConfig {
    interfaces: Vec<String>,
    properties: Properties,
    callbacks: CallbackNames,
    auto_config: AutoConfigSlots,
    table: Arc<CallbackTable>,
    constructor: Option<Constructor>,
    factory: Option<(AnyObject, String)>,
    implementation: Option<Instance>,
    // `None` manager means the accessor is called on the instance itself
    composition: Option<(Option<AnyObject>, String)>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interfaces: Vec::new(),
            properties: Properties::new(),
            callbacks: CallbackNames::default(),
            auto_config: AutoConfigSlots::default(),
            table: Arc::new(CallbackTable::new()),
            constructor: None,
            factory: None,
            implementation: None,
            composition: None,
        }
    }
}

#[derive(Default)]
struct InstanceSlot {
    instance: Option<Instance>,
    initialized: bool,
}

#[derive(Clone, Copy)]
enum Notification {
    Starting,
    Started,
    Stopping,
    Stopped,
}

/// Drives one component through its lifecycle
///
/// The engine owns an ordered list of dependencies and derives a
/// [`Classification`] from them. Every change to the list, to the active flag
/// or to a dependency's availability produces a new [`DependencyState`]
/// snapshot under a single lock. The transitions between the previous and
/// the new snapshot are queued on a [`SerialTaskQueue`] and executed outside
/// that lock, one at a time, on whichever thread drains the queue.
///
/// # Example
///
/// ```ignore
/// let engine = ComponentLifecycleEngine::new(registry.clone());
/// engine
///     .set_interface(["org.example.Greeter"], Properties::new())?
///     .set_constructor(|| Arc::new(Greeter::default()) as Instance)?;
/// engine.add_dependency(store_dependency);
/// engine.start()?;
/// ```
pub struct ComponentLifecycleEngine {
    this: Weak<ComponentLifecycleEngine>,
    name: String,
    registry: Arc<dyn ServiceRegistry>,
    manager: Option<WeakDependencyManager>,
    // Serializes start, stop and dependency list changes; reentrant so user
    // code running on the same thread may add or remove dependencies
    structure: ReentrantMutex<()>,
    state: Mutex<DependencyList>,
    config: RwLock<EngineConfig>,
    instance: Mutex<InstanceSlot>,
    registration: Mutex<Option<ComponentRegistration>>,
    bound: AtomicBool,
    listeners: Mutex<Vec<Arc<dyn ServiceStateListener>>>,
    queue: SerialTaskQueue,
    state_tx: watch::Sender<Classification>,
}

impl ComponentLifecycleEngine {
    /// Create an inactive engine with a generated name
    pub fn new(registry: Arc<dyn ServiceRegistry>) -> Arc<Self> {
        Self::create(registry, next_component_name(), None)
    }

    pub fn with_name(registry: Arc<dyn ServiceRegistry>, name: impl Into<String>) -> Arc<Self> {
        Self::create(registry, name.into(), None)
    }

    pub(crate) fn create(
        registry: Arc<dyn ServiceRegistry>,
        name: String,
        manager: Option<WeakDependencyManager>,
    ) -> Arc<Self> {
        let (state_tx, _) = watch::channel(Classification::Inactive);
        let queue = SerialTaskQueue::new(name.clone());
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            name,
            registry,
            manager,
            structure: ReentrantMutex::new(()),
            state: Mutex::new(DependencyList {
                dependencies: Vec::new(),
                state: DependencyState::empty(),
            }),
            config: RwLock::new(EngineConfig::default()),
            instance: Mutex::new(InstanceSlot::default()),
            registration: Mutex::new(None),
            bound: AtomicBool::new(false),
            listeners: Mutex::new(Vec::new()),
            queue,
            state_tx,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &Arc<dyn ServiceRegistry> {
        &self.registry
    }

    // ---- dependency list and lifecycle ----

    /// Add a dependency
    ///
    /// If the engine is already tracking what this dependency belongs to, the
    /// dependency is started before the new state becomes visible.
    pub fn add_dependency(&self, dependency: Arc<dyn Dependency>) -> &Self {
        let structure = self.structure.lock();
        let start_now = {
            let list = self.state.lock();
            list.state.is_tracking_optional()
                || (list.state.is_waiting_for_required() && dependency.is_required())
        };
        if start_now {
            if let Some(owner) = self.owner() {
                dependency.start(&owner);
            }
        }

        {
            let mut list = self.state.lock();
            list.dependencies.push(dependency.clone());
            let (old, new) = self.recompute(&mut list, None);
            self.schedule(&old, &new);
            if new.is_tracking_optional() {
                // Activation already covers required dependencies; a late one
                // gets its added callback here
                if old.is_tracking_optional() && dependency.is_required() {
                    self.schedule_added(dependency.clone());
                }
                self.schedule_update(dependency);
            }
        }
        drop(structure);

        self.queue.run_pending();
        self
    }

    /// Remove a dependency, stopping it if it was being tracked
    pub fn remove_dependency(&self, dependency: &Arc<dyn Dependency>) -> &Self {
        let structure = self.structure.lock();
        let id = dependency.id();
        let (tracked, activated) = {
            let mut list = self.state.lock();
            let before = list.dependencies.len();
            list.dependencies.retain(|d| d.id() != id);
            if list.dependencies.len() == before {
                tracing::debug!(component = %self.name, dependency = %id, "Dependency not present");
                return self;
            }
            let activated = list.state.is_tracking_optional();
            let tracked =
                activated || (list.state.is_waiting_for_required() && dependency.is_required());
            (tracked, activated)
        };
        if tracked {
            if let Some(owner) = self.owner() {
                dependency.stop(&owner);
            }
        }
        if activated && dependency.is_required() {
            self.schedule_removed(dependency.clone());
        }

        {
            let mut list = self.state.lock();
            let (old, new) = self.recompute(&mut list, None);
            self.schedule(&old, &new);
        }
        drop(structure);

        self.queue.run_pending();
        self
    }

    /// Mark the engine active and run the resulting transitions
    pub fn start(&self) -> DmResult<()> {
        let structure = self.structure.lock();
        {
            let mut list = self.state.lock();
            if list.state.is_active() {
                return Err(DmError::invalid_state(
                    "Inactive",
                    list.state.classification().to_string(),
                ));
            }
            let (old, new) = self.recompute(&mut list, Some(true));
            tracing::debug!(component = %self.name, state = %new.classification(), "Component started");
            self.schedule(&old, &new);
        }
        drop(structure);

        self.queue.run_pending();
        Ok(())
    }

    /// Mark the engine inactive and run the resulting transitions
    ///
    /// If another thread is draining the queue, the transitions finish there
    /// and may still be running when this returns; the component's service is
    /// unregistered either way.
    pub fn stop(&self) -> DmResult<()> {
        let structure = self.structure.lock();
        {
            let mut list = self.state.lock();
            if !list.state.is_active() {
                return Err(DmError::invalid_state("active", "Inactive"));
            }
            let (old, new) = self.recompute(&mut list, Some(false));
            tracing::debug!(component = %self.name, from = %old.classification(), "Component stopping");
            self.schedule(&old, &new);
        }
        drop(structure);

        self.queue.run_pending();
        self.withdraw_registration();
        Ok(())
    }

    /// Unregister the published service unless the engine was started again
    ///
    /// Deactivation unregisters the same handle later; both calls are safe.
    fn withdraw_registration(&self) {
        let registration = {
            let _structure = self.structure.lock();
            if self.state.lock().state.is_active() {
                return;
            }
            self.registration.lock().clone()
        };
        let Some(registration) = registration else {
            return;
        };
        if let Err(e) = registration.unregister() {
            tracing::debug!(component = %self.name, error = %e, "Registration not withdrawn on stop");
        }
    }

    /// Compute a new snapshot; must be called with the state lock held
    fn recompute(&self, list: &mut DependencyList, active: Option<bool>) -> (Snapshot, Snapshot) {
        let active = active.unwrap_or_else(|| list.state.is_active());
        let new = DependencyState::new(list.dependencies.clone(), active);
        let old = std::mem::replace(&mut list.state, new.clone());
        self.state_tx.send_replace(new.classification());
        (old, new)
    }

    /// Queue the transitions between two snapshots
    ///
    /// Called with the state lock held so that transitions are queued in the
    /// order the snapshots were taken.
    fn schedule(&self, old: &Snapshot, new: &Snapshot) {
        for transition in transitions(old.classification(), new.classification()) {
            let Some(this) = self.this.upgrade() else {
                return;
            };
            tracing::debug!(component = %self.name, ?transition, "Scheduling transition");
            let (old, new) = (old.clone(), new.clone());
            self.queue
                .enqueue(move || this.perform(transition, &old, &new));
        }
    }

    fn schedule_update(&self, dependency: Arc<dyn Dependency>) {
        if let Some(this) = self.this.upgrade() {
            self.queue.enqueue(move || this.update_instance(&*dependency));
        }
    }

    fn schedule_added(&self, dependency: Arc<dyn Dependency>) {
        if let Some(this) = self.this.upgrade() {
            self.queue
                .enqueue(move || dependency.invoke_added(&*this));
        }
    }

    fn schedule_removed(&self, dependency: Arc<dyn Dependency>) {
        if let Some(this) = self.this.upgrade() {
            self.queue
                .enqueue(move || dependency.invoke_removed(&*this));
        }
    }

    fn perform(&self, transition: Transition, old: &Snapshot, new: &Snapshot) {
        for step in transition.steps() {
            match step {
                Step::StartTrackingRequired => self.start_tracking_required(new),
                Step::StopTrackingRequired => self.stop_tracking_required(old),
                Step::Activate => self.activate(new),
                Step::Deactivate => self.deactivate(old),
                Step::Destroy => self.destroy(),
            }
        }
    }

    fn handle_dependency_event(&self, dependency: &dyn Dependency, event: &str) {
        tracing::trace!(component = %self.name, dependency = %dependency.name(), event, "Dependency event");
        {
            let mut list = self.state.lock();
            let (old, new) = self.recompute(&mut list, None);
            self.schedule(&old, &new);
            if new.is_tracking_optional() {
                let id = dependency.id();
                if let Some(tracked) = list.dependencies.iter().find(|d| d.id() == id) {
                    self.schedule_update(tracked.clone());
                }
            }
        }
        self.queue.run_pending();
    }

    // ---- transition steps ----

    fn owner(&self) -> Option<Arc<dyn DependencyService>> {
        self.this
            .upgrade()
            .map(|engine| engine as Arc<dyn DependencyService>)
    }

    fn start_tracking_required(&self, state: &Snapshot) {
        let Some(owner) = self.owner() else { return };
        for dependency in state.required() {
            dependency.start(&owner);
        }
    }

    fn stop_tracking_required(&self, state: &Snapshot) {
        let Some(owner) = self.owner() else { return };
        for dependency in state.required() {
            dependency.stop(&owner);
        }
    }

    fn activate(&self, state: &Snapshot) {
        tracing::info!(component = %self.name, "Activating component");
        if self.init_service().is_none() {
            tracing::error!(component = %self.name, "No implementation instance available");
        }
        let (callbacks, table) = {
            let config = self.config.read();
            (config.callbacks.clone(), config.table.clone())
        };
        let targets = self.composition_instances();

        let first_activation = {
            let mut slot = self.instance.lock();
            slot.instance.is_some() && !std::mem::replace(&mut slot.initialized, true)
        };
        if first_activation {
            if let Some(init) = &callbacks.init {
                table.invoke_lifecycle(init, &targets);
            }
        }

        for dependency in state.dependencies() {
            if dependency.is_auto_config() {
                if let Some(injection) = dependency.injection() {
                    self.inject(&injection);
                }
            }
            if dependency.is_required() {
                dependency.invoke_added(self);
            }
        }

        self.notify(Notification::Starting);
        if let Some(start) = &callbacks.start {
            table.invoke_lifecycle(start, &targets);
        }
        if let Some(owner) = self.owner() {
            for dependency in state.optional() {
                dependency.start(&owner);
            }
        }
        self.register_service();
        self.bound.store(true, Ordering::SeqCst);
        self.notify(Notification::Started);
    }

    fn deactivate(&self, state: &Snapshot) {
        tracing::info!(component = %self.name, "Deactivating component");
        self.bound.store(false, Ordering::SeqCst);
        self.notify(Notification::Stopping);
        self.unregister_service();
        if let Some(owner) = self.owner() {
            for dependency in state.optional() {
                dependency.stop(&owner);
            }
        }

        let (stop, table) = {
            let config = self.config.read();
            (config.callbacks.stop.clone(), config.table.clone())
        };
        if let Some(stop) = stop {
            table.invoke_lifecycle(&stop, &self.composition_instances());
        }
        for dependency in state.required() {
            dependency.invoke_removed(self);
        }
        self.notify(Notification::Stopped);
    }

    fn destroy(&self) {
        let (destroy, table) = {
            let config = self.config.read();
            (config.callbacks.destroy.clone(), config.table.clone())
        };
        let initialized = self.instance.lock().initialized;
        if initialized {
            if let Some(destroy) = destroy {
                table.invoke_lifecycle(&destroy, &self.composition_instances());
            }
        }
        let mut slot = self.instance.lock();
        slot.instance = None;
        slot.initialized = false;
        tracing::debug!(component = %self.name, "Implementation instance discarded");
    }

    fn update_instance(&self, dependency: &dyn Dependency) {
        if dependency.is_auto_config() {
            if let Some(injection) = dependency.injection() {
                self.inject(&injection);
            }
        }
        if dependency.is_propagated() {
            self.republish_properties();
        }
    }

    fn register_service(&self) {
        let (interfaces, auto_config) = {
            let config = self.config.read();
            (config.interfaces.clone(), config.auto_config.registration.clone())
        };
        if interfaces.is_empty() {
            return;
        }
        let Some(instance) = self.service() else {
            tracing::warn!(component = %self.name, "Nothing to register without an instance");
            return;
        };

        let registration = ComponentRegistration::pending();
        *self.registration.lock() = Some(registration.clone());
        // Published before the state check so a concurrent stop() either
        // sees this handle or is seen here
        if !self.state.lock().state.is_active() {
            tracing::debug!(component = %self.name, "Component stopped while activating, not registering");
            if let Err(e) = registration.unregister() {
                tracing::debug!(component = %self.name, error = %e, "Pending registration not withdrawn");
            }
            return;
        }
        if auto_config.is_enabled() {
            self.inject(&Injection::new(
                auto_config.name().map(str::to_string),
                Injected::Registration(Some(registration.clone())),
            ));
        }

        let properties = self.calculate_service_properties();
        match self
            .registry
            .register(&interfaces, ServiceObject::new(instance), properties)
        {
            Ok(handle) => {
                registration.bind(handle);
                tracing::info!(component = %self.name, interfaces = ?interfaces, "Service registered");
            }
            Err(e) => {
                tracing::error!(component = %self.name, error = %e, "Could not register service");
                registration.poison(e.to_string());
            }
        }
    }

    fn unregister_service(&self) {
        let Some(registration) = self.registration.lock().take() else {
            return;
        };
        if let Err(e) = registration.unregister() {
            tracing::warn!(component = %self.name, error = %e, "Could not unregister service");
        }
        let auto_config = self.config.read().auto_config.registration.clone();
        if auto_config.is_enabled() {
            self.inject(&Injection::new(
                auto_config.name().map(str::to_string),
                Injected::Registration(None),
            ));
        }
    }

    fn calculate_service_properties(&self) -> Properties {
        let mut calculated = self.config.read().properties.clone();
        for dependency in self.dependencies() {
            if dependency.is_propagated() {
                if let Some(extra) = dependency.properties() {
                    properties::merge_into(&mut calculated, &extra);
                }
            }
        }
        calculated
    }

    fn republish_properties(&self) {
        let Some(registration) = self.registration.lock().clone() else {
            return;
        };
        if !registration.is_registered() {
            return;
        }
        if let Err(e) = registration.set_properties(self.calculate_service_properties()) {
            tracing::warn!(component = %self.name, error = %e, "Could not update service properties");
        }
    }

    fn notify(&self, notification: Notification) {
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            self.notify_one(&listener, notification);
        }
    }

    fn notify_one(&self, listener: &Arc<dyn ServiceStateListener>, notification: Notification) {
        catch_logged("State listener", || match notification {
            Notification::Starting => listener.starting(self),
            Notification::Started => listener.started(self),
            Notification::Stopping => listener.stopping(self),
            Notification::Stopped => listener.stopped(self),
        });
    }

    // ---- instance management ----

    fn create_instance(&self) -> Option<Instance> {
        let (constructor, factory, implementation, table) = {
            let config = self.config.read();
            (
                config.constructor.clone(),
                config.factory.clone(),
                config.implementation.clone(),
                config.table.clone(),
            )
        };
        if let Some(constructor) = constructor {
            return catch_logged("Component constructor", || constructor());
        }
        if let Some((factory, method)) = factory {
            if let Some(instance) = table.invoke_factory(&method, &*factory) {
                return Some(instance);
            }
        }
        if implementation.is_none() {
            tracing::error!(component = %self.name, "Implementation cannot be empty");
        }
        implementation
    }

    fn init_service_inner(&self) -> Option<Instance> {
        if let Some(existing) = self.instance.lock().instance.clone() {
            return Some(existing);
        }
        let created = self.create_instance()?;
        let (instance, created_here) = {
            let mut slot = self.instance.lock();
            match &slot.instance {
                Some(existing) => (existing.clone(), false),
                None => {
                    slot.instance = Some(created.clone());
                    (created, true)
                }
            }
        };
        if created_here {
            tracing::debug!(component = %self.name, "Implementation instance created");
            self.inject_context();
        }
        Some(instance)
    }

    fn inject_context(&self) {
        let slots = self.config.read().auto_config.clone();
        for slot in ContextSlot::ALL {
            let auto_config = slots.get(slot);
            if !auto_config.is_enabled() {
                continue;
            }
            let value = match slot {
                ContextSlot::Registry => Injected::Registry(self.registry.clone()),
                ContextSlot::Registration => {
                    Injected::Registration(self.registration.lock().clone())
                }
                ContextSlot::Manager => {
                    match self.manager.as_ref().and_then(WeakDependencyManager::upgrade) {
                        Some(manager) => Injected::Manager(manager),
                        None => continue,
                    }
                }
                ContextSlot::Engine => Injected::Engine(self.this.clone()),
            };
            self.inject(&Injection::new(auto_config.name().map(str::to_string), value));
        }
    }

    fn inject(&self, injection: &Injection) {
        for target in self.composition_instances() {
            catch_logged("Component injection", || target.inject(injection));
        }
    }

    fn composition_of(&self, instance: Instance) -> Vec<Instance> {
        let (composition, table) = {
            let config = self.config.read();
            (config.composition.clone(), config.table.clone())
        };
        let Some((manager, method)) = composition else {
            return vec![instance];
        };
        let resolved = match &manager {
            Some(manager) => table.invoke_composition(&method, &**manager),
            None => table.invoke_composition(&method, instance.as_any()),
        };
        resolved.unwrap_or_else(|| vec![instance])
    }

    // ---- configuration ----

    fn ensure_inactive(&self) -> DmResult<()> {
        let classification = self.classification();
        if classification == Classification::Inactive {
            Ok(())
        } else {
            Err(DmError::invalid_state("Inactive", classification.to_string()))
        }
    }

    fn update_config(&self, apply: impl FnOnce(&mut EngineConfig)) -> DmResult<&Self> {
        self.ensure_inactive()?;
        apply(&mut self.config.write());
        Ok(self)
    }

    /// Apply a serde component configuration
    pub fn configure(&self, config: ComponentConfig) -> DmResult<&Self> {
        properties::validate(&config.properties)?;
        self.update_config(|c| {
            c.interfaces = config.interfaces;
            c.properties = config.properties;
            c.callbacks = config.callbacks;
            c.auto_config = config.auto_config;
        })
    }

    /// Set the interface names and base properties of the published service
    pub fn set_interface<I, S>(&self, interfaces: I, properties: Properties) -> DmResult<&Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let interfaces: Vec<String> = interfaces.into_iter().map(Into::into).collect();
        self.update_config(|c| {
            c.interfaces = interfaces;
            c.properties = properties;
        })
    }

    /// Set lifecycle callback names; `None` disables a callback
    pub fn set_callbacks(
        &self,
        init: Option<&str>,
        start: Option<&str>,
        stop: Option<&str>,
        destroy: Option<&str>,
    ) -> DmResult<&Self> {
        self.update_config(|c| {
            c.callbacks = CallbackNames {
                init: init.map(str::to_string),
                start: start.map(str::to_string),
                stop: stop.map(str::to_string),
                destroy: destroy.map(str::to_string),
            };
        })
    }

    pub fn set_callback_table(&self, table: CallbackTable) -> DmResult<&Self> {
        self.update_config(|c| c.table = Arc::new(table))
    }

    /// Use an existing instance as the implementation
    pub fn set_implementation(&self, instance: Instance) -> DmResult<&Self> {
        self.update_config(|c| c.implementation = Some(instance))
    }

    /// Create the implementation by calling `constructor`
    pub fn set_constructor(
        &self,
        constructor: impl Fn() -> Instance + Send + Sync + 'static,
    ) -> DmResult<&Self> {
        self.update_config(|c| c.constructor = Some(Arc::new(constructor)))
    }

    /// Create the implementation through the factory method `method` of
    /// `factory`, registered in the callback table
    pub fn set_factory<F: Any + Send + Sync>(&self, factory: F, method: &str) -> DmResult<&Self> {
        let factory: AnyObject = Arc::new(factory);
        self.update_config(|c| c.factory = Some((factory, method.to_string())))
    }

    /// Resolve the composition through an accessor on the instance itself
    pub fn set_composition(&self, method: &str) -> DmResult<&Self> {
        self.update_config(|c| c.composition = Some((None, method.to_string())))
    }

    /// Resolve the composition through an accessor on a separate object
    pub fn set_composition_manager<M: Any + Send + Sync>(
        &self,
        manager: M,
        method: &str,
    ) -> DmResult<&Self> {
        let manager: AnyObject = Arc::new(manager);
        self.update_config(|c| c.composition = Some((Some(manager), method.to_string())))
    }

    pub fn set_auto_config(&self, slot: ContextSlot, auto_config: AutoConfig) -> DmResult<&Self> {
        self.update_config(|c| c.auto_config.set(slot, auto_config))
    }

    pub fn interfaces(&self) -> Vec<String> {
        self.config.read().interfaces.clone()
    }

    pub fn service_properties(&self) -> Properties {
        self.config.read().properties.clone()
    }

    /// Replace the base service properties, republishing them if registered
    pub fn set_service_properties(&self, properties: Properties) -> DmResult<()> {
        properties::validate(&properties)?;
        self.config.write().properties = properties;
        self.republish_properties();
        Ok(())
    }

    // ---- accessors ----

    pub fn service(&self) -> Option<Instance> {
        self.instance.lock().instance.clone()
    }

    /// Create the implementation instance if needed
    pub fn init_service(&self) -> Option<Instance> {
        self.init_service_inner()
    }

    pub fn composition_instances(&self) -> Vec<Instance> {
        match self.service() {
            Some(instance) => self.composition_of(instance),
            None => Vec::new(),
        }
    }

    pub fn service_registration(&self) -> Option<ComponentRegistration> {
        self.registration.lock().clone()
    }

    pub fn dependencies(&self) -> Vec<Arc<dyn Dependency>> {
        self.state.lock().dependencies.clone()
    }

    pub fn dependency(&self, id: DependencyId) -> Option<Arc<dyn Dependency>> {
        self.state
            .lock()
            .dependencies
            .iter()
            .find(|d| d.id() == id)
            .cloned()
    }

    pub fn classification(&self) -> Classification {
        self.state.lock().state.classification()
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().state.is_active()
    }

    /// Whether activation completed and has not been undone
    pub fn is_registered(&self) -> bool {
        self.bound.load(Ordering::SeqCst)
    }

    pub fn describe(&self) -> ComponentDescription {
        let (state, dependencies) = {
            let list = self.state.lock();
            (list.state.classification(), list.dependencies.clone())
        };
        ComponentDescription {
            name: self.name.clone(),
            state,
            interfaces: self.interfaces(),
            registration: self.service_registration().map(|r| r.status()),
            instantiated: self.service().is_some(),
            dependencies: dependencies
                .iter()
                .map(|d| DependencyDescription::of(&**d))
                .collect(),
        }
    }

    // ---- state observation ----

    /// Receiver that sees every published classification
    pub fn watch_state(&self) -> watch::Receiver<Classification> {
        self.state_tx.subscribe()
    }

    /// Wait until the engine reaches `target`
    pub async fn wait_for(&self, target: Classification) -> DmResult<()> {
        let mut receiver = self.state_tx.subscribe();
        receiver
            .wait_for(|classification| *classification == target)
            .await
            .map(|_| ())
            .map_err(|_| DmError::Internal("state channel closed".to_string()))
    }

    /// Add a listener; if activation already happened it immediately
    /// receives `starting` and `started`
    pub fn add_state_listener(&self, listener: Arc<dyn ServiceStateListener>) {
        self.listeners.lock().push(listener.clone());
        if self.classification() == Classification::TrackingOptional {
            self.notify_one(&listener, Notification::Starting);
            self.notify_one(&listener, Notification::Started);
        }
    }

    pub fn remove_state_listener(&self, listener: &Arc<dyn ServiceStateListener>) {
        self.listeners.lock().retain(|l| !Arc::ptr_eq(l, listener));
    }

    pub fn remove_state_listeners(&self) {
        self.listeners.lock().clear();
    }
}

impl DependencyService for ComponentLifecycleEngine {
    fn dependency_available(&self, dependency: &dyn Dependency) {
        self.handle_dependency_event(dependency, "available");
    }

    fn dependency_unavailable(&self, dependency: &dyn Dependency) {
        self.handle_dependency_event(dependency, "unavailable");
    }

    fn dependency_changed(&self, dependency: &dyn Dependency) {
        self.handle_dependency_event(dependency, "changed");
    }

    fn service(&self) -> Option<Instance> {
        ComponentLifecycleEngine::service(self)
    }

    fn init_service(&self) -> Option<Instance> {
        self.init_service_inner()
    }

    fn composition_instances(&self) -> Vec<Instance> {
        ComponentLifecycleEngine::composition_instances(self)
    }

    fn is_registered(&self) -> bool {
        self.bound.load(Ordering::SeqCst)
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

impl fmt::Debug for ComponentLifecycleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentLifecycleEngine")
            .field("name", &self.name)
            .field("classification", &self.classification())
            .field("dependencies", &self.state.lock().dependencies.len())
            .field("queue", &self.queue)
            .finish()
    }
}
