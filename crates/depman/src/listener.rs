//! Lifecycle observers

use crate::engine::ComponentLifecycleEngine;

/// Observer of a component's activation and deactivation
///
/// Notifications run synchronously on the thread draining the component's
/// task queue. All methods default to doing nothing.
pub trait ServiceStateListener: Send + Sync {
    fn starting(&self, _component: &ComponentLifecycleEngine) {}

    fn started(&self, _component: &ComponentLifecycleEngine) {}

    fn stopping(&self, _component: &ComponentLifecycleEngine) {}

    fn stopped(&self, _component: &ComponentLifecycleEngine) {}
}
