//! Service references, provider objects and registry events

use crate::properties::{self, OBJECT_CLASS, Properties, SERVICE_ID};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Registry-assigned identity of a registered service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceId(pub u64);

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a registered service: its id, interfaces and a snapshot of its properties
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceReference {
    id: ServiceId,
    interfaces: Arc<[String]>,
    properties: Arc<Properties>,
}

impl ServiceReference {
    /// Create a reference; `objectClass` and `service.id` are filled in from the arguments
    pub fn new(id: ServiceId, interfaces: &[String], mut properties: Properties) -> Self {
        properties.insert(OBJECT_CLASS.to_string(), serde_json::json!(interfaces));
        properties.insert(SERVICE_ID.to_string(), serde_json::json!(id.0));
        Self {
            id,
            interfaces: interfaces.into(),
            properties: Arc::new(properties),
        }
    }

    pub fn id(&self) -> ServiceId {
        self.id
    }

    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        properties::get_ignore_case(&self.properties, key)
    }

    pub fn ranking(&self) -> i64 {
        properties::ranking(&self.properties)
    }

    /// Provider preference: higher ranking first, then lower (older) service id
    pub fn preference(&self, other: &ServiceReference) -> Ordering {
        other
            .ranking()
            .cmp(&self.ranking())
            .then_with(|| self.id.cmp(&other.id))
    }

    /// Same reference with replaced properties; identity keys are preserved
    pub fn with_properties(&self, properties: Properties) -> Self {
        Self::new(self.id, &self.interfaces, properties)
    }
}

impl fmt::Display for ServiceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id, self.interfaces.join(", "))
    }
}

/// Type-erased provider object handed out by the registry
#[derive(Clone)]
pub struct ServiceObject(Arc<dyn Any + Send + Sync>);

impl ServiceObject {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self(value)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.0.clone().downcast::<T>().ok()
    }

    /// Whether both handles point at the same provider object
    pub fn ptr_eq(&self, other: &ServiceObject) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ServiceObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceObject({:p})", Arc::as_ptr(&self.0))
    }
}

/// Event delivered to registry listeners whose filter matched the service
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceEvent {
    Registered(ServiceReference),
    Modified(ServiceReference),
    /// Properties changed such that the listener's filter no longer matches
    ModifiedEndMatch(ServiceReference),
    Unregistering(ServiceReference),
}

impl ServiceEvent {
    pub fn reference(&self) -> &ServiceReference {
        match self {
            ServiceEvent::Registered(r)
            | ServiceEvent::Modified(r)
            | ServiceEvent::ModifiedEndMatch(r)
            | ServiceEvent::Unregistering(r) => r,
        }
    }
}
