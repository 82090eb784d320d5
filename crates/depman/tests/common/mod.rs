//! Fixtures shared by the integration tests

#![allow(dead_code)]

use depman::prelude::*;
use depman::{RegistrationHandle, ServiceCallback};
use parking_lot::Mutex;

pub const GREETER: &str = "org.example.Greeter";
pub const STORE: &str = "org.example.Store";
pub const CACHE: &str = "org.example.Cache";

/// Ordered, shareable record of callback invocations
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == entry).count()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Component that greets through whatever store it was given
pub struct Greeter {
    pub journal: Journal,
    pub store: Mutex<Value<ServiceObject>>,
    pub cache: Mutex<Value<ServiceObject>>,
}

impl Greeter {
    pub fn instance(journal: &Journal) -> Instance {
        Arc::new(Self {
            journal: journal.clone(),
            store: Mutex::new(Value::Absent),
            cache: Mutex::new(Value::Absent),
        })
    }

    fn record(&self, entry: &str) -> Result<(), CallbackError> {
        self.journal.push(entry);
        Ok(())
    }
}

impl Component for Greeter {
    fn inject(&self, injection: &Injection) {
        if let Injected::Service { value, .. } = &injection.value {
            if injection.targets("store") {
                *self.store.lock() = value.clone();
            }
            if injection.targets("cache") {
                *self.cache.lock() = value.clone();
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn greeter_callbacks() -> CallbackTable {
    CallbackTable::new()
        .lifecycle::<Greeter>("init", |g| g.record("init"))
        .lifecycle::<Greeter>("start", |g| g.record("start"))
        .lifecycle::<Greeter>("stop", |g| g.record("stop"))
        .lifecycle::<Greeter>("destroy", |g| g.record("destroy"))
}

/// Service callback journaling `<label>:<provider name>`
pub fn journaling(label: &'static str) -> ServiceCallback {
    ServiceCallback::new::<Greeter>(move |greeter, _, object| {
        let provider = object.downcast_ref::<String>().cloned().unwrap_or_default();
        greeter.record(&format!("{label}:{provider}"))
    })
}

/// A greeter component, not yet added to the manager
pub fn greeter(manager: &DependencyManager, journal: &Journal) -> Arc<ComponentLifecycleEngine> {
    let component = manager.create_named_component("greeter");
    let journal = journal.clone();
    component
        .set_interface([GREETER], Properties::new())
        .unwrap()
        .set_callback_table(greeter_callbacks())
        .unwrap()
        .set_constructor(move || Greeter::instance(&journal))
        .unwrap();
    component
}

pub fn service_dependency(
    manager: &DependencyManager,
    interface: &str,
    slot: &str,
) -> Arc<ServiceDependency> {
    let dependency = manager.create_service_dependency();
    dependency
        .set_service(interface, None)
        .unwrap()
        .set_auto_config_name(slot)
        .unwrap();
    dependency
}

/// Register a provider whose object is its own `name`
pub fn provide(
    manager: &DependencyManager,
    interface: &str,
    name: &str,
) -> Box<dyn RegistrationHandle> {
    manager
        .registry()
        .register(
            &[interface.to_string()],
            ServiceObject::new(name.to_string()),
            Properties::new(),
        )
        .unwrap()
}

pub fn stored(value: &Mutex<Value<ServiceObject>>) -> Option<String> {
    match &*value.lock() {
        Value::Present(object) => object.downcast_ref::<String>().cloned(),
        Value::Absent => None,
    }
}
