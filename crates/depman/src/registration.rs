//! The component's own service registration

use depman_core::{DmError, DmResult, Properties, RegistrationHandle, ServiceReference};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Observable status of a [`ComponentRegistration`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// Created and injected, registry call not made yet
    Pending,
    Registered,
    Unregistered,
    /// The registry refused the registration; the handle is unusable
    Failed,
}

enum RegistrationState {
    Pending,
    Registered(Arc<dyn RegistrationHandle>),
    Unregistered,
    Failed(String),
}

/// Handle to the service a component publishes while it is active
///
/// The handle is created, and injected into the component, before the
/// registry call is made. If the registry rejects the registration the
/// handle is poisoned: every later operation fails with
/// [`DmError::IllegalRegistrationState`].
#[derive(Clone)]
pub struct ComponentRegistration {
    state: Arc<Mutex<RegistrationState>>,
}

impl ComponentRegistration {
    pub(crate) fn pending() -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistrationState::Pending)),
        }
    }

    /// Attach the registry's handle once registration succeeded
    pub(crate) fn bind(&self, handle: Box<dyn RegistrationHandle>) {
        let handle: Arc<dyn RegistrationHandle> = Arc::from(handle);
        {
            let mut state = self.state.lock();
            if matches!(*state, RegistrationState::Pending) {
                *state = RegistrationState::Registered(handle);
                return;
            }
        }
        // Unregistered before the registry answered
        if let Err(e) = handle.unregister() {
            tracing::debug!(error = %e, "Late registration already gone");
        }
    }

    pub(crate) fn poison(&self, reason: impl Into<String>) {
        *self.state.lock() = RegistrationState::Failed(reason.into());
    }

    fn handle(&self) -> DmResult<Arc<dyn RegistrationHandle>> {
        match &*self.state.lock() {
            RegistrationState::Registered(handle) => Ok(handle.clone()),
            RegistrationState::Pending => Err(DmError::IllegalRegistrationState(
                "service is not registered yet".to_string(),
            )),
            RegistrationState::Unregistered => Err(DmError::IllegalRegistrationState(
                "service is unregistered".to_string(),
            )),
            RegistrationState::Failed(reason) => Err(DmError::IllegalRegistrationState(format!(
                "service registration failed: {reason}"
            ))),
        }
    }

    pub fn reference(&self) -> DmResult<ServiceReference> {
        self.handle()?.reference()
    }

    pub fn set_properties(&self, properties: Properties) -> DmResult<()> {
        self.handle()?.set_properties(properties)
    }

    /// Remove the service from the registry
    ///
    /// Unregistering twice is allowed; a failed registration is not.
    pub fn unregister(&self) -> DmResult<()> {
        let previous = {
            let mut state = self.state.lock();
            if let RegistrationState::Failed(reason) = &*state {
                return Err(DmError::IllegalRegistrationState(format!(
                    "service registration failed: {reason}"
                )));
            }
            std::mem::replace(&mut *state, RegistrationState::Unregistered)
        };

        if let RegistrationState::Registered(handle) = previous {
            match handle.unregister() {
                Ok(()) => {}
                Err(DmError::IllegalRegistrationState(reason)) => {
                    tracing::debug!(reason = %reason, "Service was already unregistered");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub fn status(&self) -> RegistrationStatus {
        match &*self.state.lock() {
            RegistrationState::Pending => RegistrationStatus::Pending,
            RegistrationState::Registered(_) => RegistrationStatus::Registered,
            RegistrationState::Unregistered => RegistrationStatus::Unregistered,
            RegistrationState::Failed(_) => RegistrationStatus::Failed,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.status() == RegistrationStatus::Registered
    }

    pub fn ptr_eq(&self, other: &ComponentRegistration) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for ComponentRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistration")
            .field("status", &self.status())
            .finish()
    }
}
