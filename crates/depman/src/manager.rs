//! Component management

use crate::configuration_dependency::ConfigurationDependency;
use crate::description::ComponentDescription;
use crate::engine::{ComponentLifecycleEngine, next_component_name};
use crate::service_dependency::ServiceDependency;
use depman_core::{DmError, DmResult, ServiceRegistry};
use depman_registry::InMemoryRegistry;
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

struct ManagerInner {
    registry: Arc<dyn ServiceRegistry>,
    components: Mutex<Vec<Arc<ComponentLifecycleEngine>>>,
}

/// Creates components and dependencies and owns the running components
///
/// Cloning is cheap; all clones share the same component list.
#[derive(Clone)]
pub struct DependencyManager {
    inner: Arc<ManagerInner>,
}

/// Non-owning handle to a [`DependencyManager`], held by its components
#[derive(Clone)]
pub struct WeakDependencyManager {
    inner: Weak<ManagerInner>,
}

impl WeakDependencyManager {
    pub fn upgrade(&self) -> Option<DependencyManager> {
        self.inner.upgrade().map(|inner| DependencyManager { inner })
    }
}

impl DependencyManager {
    pub fn new(registry: Arc<dyn ServiceRegistry>) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                registry,
                components: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Manager backed by a fresh [`InMemoryRegistry`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRegistry::new()))
    }

    pub fn registry(&self) -> &Arc<dyn ServiceRegistry> {
        &self.inner.registry
    }

    pub fn downgrade(&self) -> WeakDependencyManager {
        WeakDependencyManager {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn create_component(&self) -> Arc<ComponentLifecycleEngine> {
        self.create_named_component(next_component_name())
    }

    pub fn create_named_component(&self, name: impl Into<String>) -> Arc<ComponentLifecycleEngine> {
        ComponentLifecycleEngine::create(
            self.inner.registry.clone(),
            name.into(),
            Some(self.downgrade()),
        )
    }

    pub fn create_service_dependency(&self) -> Arc<ServiceDependency> {
        ServiceDependency::new(self.inner.registry.clone())
    }

    pub fn create_configuration_dependency(&self) -> Arc<ConfigurationDependency> {
        ConfigurationDependency::new(self.inner.registry.clone())
    }

    /// Take ownership of a component and start it
    pub fn add(&self, component: Arc<ComponentLifecycleEngine>) -> DmResult<()> {
        self.inner.components.lock().push(component.clone());
        if let Err(e) = component.start() {
            self.inner
                .components
                .lock()
                .retain(|c| !Arc::ptr_eq(c, &component));
            return Err(e);
        }
        tracing::debug!(component = %component.name(), "Component added");
        Ok(())
    }

    /// Stop a component and release it
    pub fn remove(&self, component: &Arc<ComponentLifecycleEngine>) -> DmResult<()> {
        let removed = {
            let mut components = self.inner.components.lock();
            let before = components.len();
            components.retain(|c| !Arc::ptr_eq(c, component));
            components.len() != before
        };
        if !removed {
            return Err(DmError::DependencyError(format!(
                "component {} is not managed here",
                component.name()
            )));
        }
        if component.is_active() {
            component.stop()?;
        }
        tracing::debug!(component = %component.name(), "Component removed");
        Ok(())
    }

    pub fn components(&self) -> Vec<Arc<ComponentLifecycleEngine>> {
        self.inner.components.lock().clone()
    }

    /// Stop and release every component, most recently added first
    pub fn clear(&self) {
        let components = std::mem::take(&mut *self.inner.components.lock());
        for component in components.iter().rev() {
            if component.is_active() {
                if let Err(e) = component.stop() {
                    tracing::warn!(component = %component.name(), error = %e, "Could not stop component");
                }
            }
        }
    }

    pub fn describe(&self) -> Vec<ComponentDescription> {
        self.components().iter().map(|c| c.describe()).collect()
    }
}

impl fmt::Debug for DependencyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyManager")
            .field("components", &self.inner.components.lock().len())
            .finish()
    }
}
