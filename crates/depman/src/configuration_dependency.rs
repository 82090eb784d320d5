//! Dependency on a configuration dictionary

use crate::callback::ConfigurationCallback;
use crate::component::{Injected, Injection};
use crate::dependency::{Dependency, DependencyId, DependencyService};
use depman_core::properties::SERVICE_PID;
use depman_core::{
    ConfigurationError, DmError, DmResult, MANAGED_SERVICE, ManagedService, Properties,
    RegistrationHandle, Requirement, ServiceObject, ServiceRegistry,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

struct ConfigState {
    pid: Option<String>,
    propagate: bool,
    auto_config: bool,
    callback: Option<ConfigurationCallback>,

    started: bool,
    owner: Option<Weak<dyn DependencyService>>,
    registration: Option<Box<dyn RegistrationHandle>>,
    settings: Option<Properties>,
}

impl ConfigState {
    fn ensure_stopped(&self) -> DmResult<()> {
        if self.started {
            Err(DmError::invalid_state("stopped", "started"))
        } else {
            Ok(())
        }
    }
}

/// A required dependency on the settings published for one persistent id
///
/// While started it is registered as a [`ManagedService`] under
/// `service.pid`. It becomes available once the component accepted a
/// settings dictionary. Rejected settings leave the stored settings and the
/// availability untouched. Stored settings survive a stop.
pub struct ConfigurationDependency {
    id: DependencyId,
    this: Weak<ConfigurationDependency>,
    registry: Arc<dyn ServiceRegistry>,
    state: Mutex<ConfigState>,
    // One update at a time, so before/after comparisons stay consistent
    updating: Mutex<()>,
}

impl ConfigurationDependency {
    pub fn new(registry: Arc<dyn ServiceRegistry>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            id: DependencyId::next(),
            this: this.clone(),
            registry,
            state: Mutex::new(ConfigState {
                pid: None,
                propagate: false,
                auto_config: false,
                callback: None,
                started: false,
                owner: None,
                registration: None,
                settings: None,
            }),
            updating: Mutex::new(()),
        })
    }

    fn configure(&self, apply: impl FnOnce(&mut ConfigState)) -> DmResult<&Self> {
        let mut state = self.state.lock();
        state.ensure_stopped()?;
        apply(&mut state);
        Ok(self)
    }

    pub fn set_pid(&self, pid: &str) -> DmResult<&Self> {
        self.configure(|s| s.pid = Some(pid.to_string()))
    }

    /// Merge accepted settings into the owner's service properties
    pub fn set_propagate(&self, propagate: bool) -> DmResult<&Self> {
        self.configure(|s| s.propagate = propagate)
    }

    /// Also inject the settings as [`Injected::Configuration`]
    pub fn set_auto_config(&self, auto_config: bool) -> DmResult<&Self> {
        self.configure(|s| s.auto_config = auto_config)
    }

    pub fn set_callback(&self, callback: ConfigurationCallback) -> DmResult<&Self> {
        self.configure(|s| s.callback = Some(callback))
    }

    pub fn pid(&self) -> Option<String> {
        self.state.lock().pid.clone()
    }

    /// The last accepted settings
    pub fn settings(&self) -> Option<Properties> {
        self.state.lock().settings.clone()
    }

    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }
}

impl ManagedService for ConfigurationDependency {
    fn updated(&self, settings: Option<Properties>) -> Result<(), ConfigurationError> {
        let _updating = self.updating.lock();
        let (owner, callback, pid) = {
            let state = self.state.lock();
            (
                state.owner.as_ref().and_then(Weak::upgrade),
                state.callback.clone(),
                state.pid.clone().unwrap_or_default(),
            )
        };
        let Some(owner) = owner else {
            return Err(ConfigurationError::new(format!(
                "configuration dependency for {pid} is not started"
            )));
        };

        // The instance may receive settings before its required dependencies
        if owner.init_service().is_none() {
            tracing::warn!(pid = %pid, "No instance to receive configuration");
        }
        if let Some(callback) = callback {
            let targets = owner.composition_instances();
            if let Err(e) = callback.invoke(&targets, settings.as_ref()) {
                tracing::warn!(pid = %pid, error = %e, "Configuration rejected");
                return Err(e);
            }
        }

        let (before, after) = {
            let mut state = self.state.lock();
            let before = state.settings.is_some();
            state.settings = settings;
            (before, state.settings.is_some())
        };
        tracing::debug!(pid = %pid, present = after, "Configuration accepted");
        match (before, after) {
            (false, true) => owner.dependency_available(self),
            (true, false) => owner.dependency_unavailable(self),
            (true, true) => owner.dependency_changed(self),
            (false, false) => {}
        }
        Ok(())
    }
}

impl Requirement for ConfigurationDependency {
    fn is_required(&self) -> bool {
        true
    }

    fn is_available(&self) -> bool {
        self.state.lock().settings.is_some()
    }
}

impl Dependency for ConfigurationDependency {
    fn id(&self) -> DependencyId {
        self.id
    }

    fn start(&self, owner: &Arc<dyn DependencyService>) {
        let pid = {
            let mut state = self.state.lock();
            if state.started {
                tracing::warn!(pid = ?state.pid, "Configuration dependency already started");
                return;
            }
            state.started = true;
            state.owner = Some(Arc::downgrade(owner));
            state.pid.clone()
        };
        let Some(pid) = pid else {
            tracing::error!(component = %owner.name(), "Configuration dependency has no pid");
            return;
        };
        let Some(this) = self.this.upgrade() else {
            return;
        };

        let sink: Arc<dyn ManagedService> = this;
        let mut properties = Properties::new();
        properties.insert(SERVICE_PID.to_string(), serde_json::json!(pid));
        match self
            .registry
            .register(&[MANAGED_SERVICE.to_string()], ServiceObject::new(sink), properties)
        {
            Ok(handle) => {
                let stale = {
                    let mut state = self.state.lock();
                    if state.started {
                        state.registration = Some(handle);
                        None
                    } else {
                        Some(handle)
                    }
                };
                if let Some(stale) = stale
                    && let Err(e) = stale.unregister()
                {
                    tracing::debug!(pid = %pid, error = %e, "Stale configuration sink already gone");
                }
            }
            Err(e) => tracing::error!(pid = %pid, error = %e, "Could not register configuration sink"),
        }
    }

    fn stop(&self, _owner: &Arc<dyn DependencyService>) {
        let registration = {
            let mut state = self.state.lock();
            if !state.started {
                tracing::warn!(pid = ?state.pid, "Configuration dependency was not started");
                return;
            }
            state.started = false;
            state.owner = None;
            state.registration.take()
        };
        if let Some(registration) = registration {
            if let Err(e) = registration.unregister() {
                tracing::debug!(error = %e, "Configuration sink already unregistered");
            }
        }
    }

    fn is_auto_config(&self) -> bool {
        self.state.lock().auto_config
    }

    fn injection(&self) -> Option<Injection> {
        let state = self.state.lock();
        let pid = state.pid.clone()?;
        Some(Injection::new(
            None,
            Injected::Configuration {
                pid,
                settings: state.settings.clone(),
            },
        ))
    }

    fn is_propagated(&self) -> bool {
        self.state.lock().propagate
    }

    fn properties(&self) -> Option<Properties> {
        self.state.lock().settings.clone()
    }

    fn kind(&self) -> &'static str {
        "configuration"
    }

    fn name(&self) -> String {
        match &self.state.lock().pid {
            Some(pid) => format!("configuration {pid}"),
            None => format!("unconfigured configuration dependency {}", self.id),
        }
    }
}

impl fmt::Debug for ConfigurationDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ConfigurationDependency")
            .field("id", &self.id)
            .field("pid", &state.pid)
            .field("started", &state.started)
            .field("configured", &state.settings.is_some())
            .finish()
    }
}
