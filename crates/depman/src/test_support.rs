//! Shared fixtures for unit tests

use crate::callback::{CallbackTable, ServiceCallback};
use crate::component::{Component, Injected, Injection, Instance};
use crate::registration::ComponentRegistration;
use depman_core::{
    CallbackError, Properties, RegistrationHandle, ServiceObject, ServiceRegistry, Value,
};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;

/// Ordered record of what happened to one or more trackeds
#[derive(Clone, Default)]
pub(crate) struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub(crate) fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub(crate) fn count(&self, event: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == event).count()
    }

    pub(crate) fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Component recording its callbacks and keeping what was injected
pub(crate) struct Tracked {
    pub(crate) log: EventLog,
    pub(crate) store: Mutex<Value<ServiceObject>>,
    pub(crate) stores: Mutex<Vec<ServiceObject>>,
    pub(crate) registration: Mutex<Option<ComponentRegistration>>,
    pub(crate) settings: Mutex<Option<Properties>>,
    pub(crate) injected_engine: Mutex<bool>,
}

impl Tracked {
    pub(crate) fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            store: Mutex::new(Value::Absent),
            stores: Mutex::new(Vec::new()),
            registration: Mutex::new(None),
            settings: Mutex::new(None),
            injected_engine: Mutex::new(false),
        }
    }

    pub(crate) fn instance(log: &EventLog) -> Instance {
        Arc::new(Self::new(log))
    }

    pub(crate) fn record(&self, event: &str) -> Result<(), CallbackError> {
        self.log.push(event);
        Ok(())
    }
}

impl Component for Tracked {
    fn inject(&self, injection: &Injection) {
        match &injection.value {
            Injected::Service { value, .. } => *self.store.lock() = value.clone(),
            Injected::Services { values, .. } => *self.stores.lock() = values.to_vec(),
            Injected::Registration(registration) => {
                *self.registration.lock() = registration.clone()
            }
            Injected::Configuration { settings, .. } => *self.settings.lock() = settings.clone(),
            Injected::Engine(_) => *self.injected_engine.lock() = true,
            Injected::Registry(_) | Injected::Manager(_) => {}
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Lifecycle callbacks that log their own name
pub(crate) fn tracked_table() -> CallbackTable {
    CallbackTable::new()
        .lifecycle::<Tracked>("init", |p| p.record("init"))
        .lifecycle::<Tracked>("start", |p| p.record("start"))
        .lifecycle::<Tracked>("stop", |p| p.record("stop"))
        .lifecycle::<Tracked>("destroy", |p| p.record("destroy"))
}

/// Service callback logging `<label>:<service id>`
pub(crate) fn logging_callback(label: &'static str) -> ServiceCallback {
    ServiceCallback::new::<Tracked>(move |tracked, reference, _| {
        tracked.record(&format!("{label}:{}", reference.id()))
    })
}

pub(crate) fn publish(
    registry: &dyn ServiceRegistry,
    interface: &str,
    properties: Properties,
) -> Box<dyn RegistrationHandle> {
    registry
        .register(
            &[interface.to_string()],
            ServiceObject::new(interface.to_string()),
            properties,
        )
        .unwrap()
}

pub(crate) fn ranked(ranking: i64) -> Properties {
    let mut properties = Properties::new();
    properties.insert(
        depman_core::properties::SERVICE_RANKING.to_string(),
        serde_json::json!(ranking),
    );
    properties
}
