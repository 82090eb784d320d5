//! The seams between a component and the dependencies it tracks

use crate::component::{Injection, Instance};
use depman_core::{Properties, Requirement};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_DEPENDENCY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide identity of a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyId(pub u64);

impl DependencyId {
    pub(crate) fn next() -> Self {
        DependencyId(NEXT_DEPENDENCY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for DependencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dep#{}", self.0)
    }
}

/// A capability tracked on behalf of one component
///
/// `is_required` must not change once the owner has been started.
/// `start` and `stop` are called by the owner, at most once per tracking
/// cycle, and may call back into the owner synchronously.
pub trait Dependency: Requirement + Send + Sync {
    fn id(&self) -> DependencyId;

    /// Begin tracking and report availability changes to `owner`
    fn start(&self, owner: &Arc<dyn DependencyService>);

    /// Stop tracking and release everything held
    fn stop(&self, owner: &Arc<dyn DependencyService>);

    /// Whether the current value is injected into the component
    fn is_auto_config(&self) -> bool;

    /// The value to inject, if this dependency has one
    fn injection(&self) -> Option<Injection>;

    /// Whether [`Dependency::properties`] are merged into the owner's
    /// service properties
    fn is_propagated(&self) -> bool {
        false
    }

    fn properties(&self) -> Option<Properties> {
        None
    }

    /// Deliver the "added" callback for the current value during activation
    fn invoke_added(&self, _owner: &dyn DependencyService) {}

    /// Deliver the "removed" callback during deactivation
    fn invoke_removed(&self, _owner: &dyn DependencyService) {}

    /// Short type label used in descriptions
    fn kind(&self) -> &'static str;

    /// Human-readable description of what is tracked
    fn name(&self) -> String;
}

/// The owner-side interface a dependency reports to
pub trait DependencyService: Send + Sync {
    fn dependency_available(&self, dependency: &dyn Dependency);

    fn dependency_unavailable(&self, dependency: &dyn Dependency);

    fn dependency_changed(&self, dependency: &dyn Dependency);

    /// The implementation instance, if created
    fn service(&self) -> Option<Instance>;

    /// Create the implementation instance if needed and return it
    fn init_service(&self) -> Option<Instance>;

    /// Objects that receive injections and callbacks
    fn composition_instances(&self) -> Vec<Instance>;

    /// Whether the owner's own service is currently published
    fn is_registered(&self) -> bool;

    fn name(&self) -> String;
}
