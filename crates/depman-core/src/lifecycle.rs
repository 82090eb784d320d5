//! Dependency state classification and the transition table
//!
//! A component's state is derived from its dependencies and an `active` flag:
//! ```text
//!                  start()                   all required available
//!   Inactive ─────────────────► WaitingForRequired ─────────────────► TrackingOptional
//!      ▲                              │   ▲                                │
//!      │           stop()             │   └──── a required dependency ─────┘
//!      └──────────────────────────────┘               went away
//! ```

use Classification::{Inactive, TrackingOptional, WaitingForRequired};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Three-valued state derived from a [`DependencyState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Component is not started
    #[default]
    Inactive,
    /// Started, but at least one required dependency is unavailable
    WaitingForRequired,
    /// Started with every required dependency available
    TrackingOptional,
}

impl Classification {
    /// Whether the component's own service is (or is about to be) registered
    pub fn is_registered(&self) -> bool {
        matches!(self, Classification::TrackingOptional)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Classification::Inactive => "inactive",
            Classification::WaitingForRequired => "waiting for required dependencies",
            Classification::TrackingOptional => "tracking optional dependencies",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Inactive => write!(f, "Inactive"),
            Classification::WaitingForRequired => write!(f, "WaitingForRequired"),
            Classification::TrackingOptional => write!(f, "TrackingOptional"),
        }
    }
}

/// The two facts about a dependency that drive classification
pub trait Requirement {
    fn is_required(&self) -> bool;
    fn is_available(&self) -> bool;
}

/// Immutable snapshot of a dependency list plus the `active` flag.
///
/// The classification is computed once, at construction, from the
/// availability the dependencies report at that moment.
pub struct DependencyState<D: ?Sized> {
    dependencies: Vec<Arc<D>>,
    active: bool,
    classification: Classification,
}

impl<D: ?Sized + Requirement> DependencyState<D> {
    pub fn new(dependencies: Vec<Arc<D>>, active: bool) -> Self {
        let classification = if !active {
            Classification::Inactive
        } else if dependencies
            .iter()
            .any(|d| d.is_required() && !d.is_available())
        {
            Classification::WaitingForRequired
        } else {
            Classification::TrackingOptional
        };
        Self {
            dependencies,
            active,
            classification,
        }
    }

    /// Inactive state with no dependencies
    pub fn empty() -> Self {
        Self::new(Vec::new(), false)
    }

    pub fn required(&self) -> impl Iterator<Item = &Arc<D>> {
        self.dependencies.iter().filter(|d| d.is_required())
    }

    pub fn optional(&self) -> impl Iterator<Item = &Arc<D>> {
        self.dependencies.iter().filter(|d| !d.is_required())
    }
}

impl<D: ?Sized> DependencyState<D> {
    pub fn dependencies(&self) -> &[Arc<D>] {
        &self.dependencies
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn is_inactive(&self) -> bool {
        self.classification == Classification::Inactive
    }

    pub fn is_waiting_for_required(&self) -> bool {
        self.classification == Classification::WaitingForRequired
    }

    pub fn is_tracking_optional(&self) -> bool {
        self.classification == Classification::TrackingOptional
    }
}

impl<D: ?Sized> Clone for DependencyState<D> {
    fn clone(&self) -> Self {
        Self {
            dependencies: self.dependencies.clone(),
            active: self.active,
            classification: self.classification,
        }
    }
}

impl<D: ?Sized> fmt::Debug for DependencyState<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyState")
            .field("dependencies", &self.dependencies.len())
            .field("active", &self.active)
            .field("classification", &self.classification)
            .finish()
    }
}

/// Side effect performed by a transition, in the order listed by [`Transition::steps`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    StartTrackingRequired,
    StopTrackingRequired,
    Activate,
    Deactivate,
    /// Discard the implementation instance
    Destroy,
}

/// One row of the transition table; each row becomes one queued task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Inactive → WaitingForRequired
    StartTracking,
    /// WaitingForRequired → Inactive
    StopTracking,
    /// WaitingForRequired → TrackingOptional
    Activate,
    /// Inactive → TrackingOptional
    ActivateFromInactive,
    /// TrackingOptional → WaitingForRequired, the instance is kept
    Suspend,
    /// TrackingOptional → Inactive
    Shutdown,
}

impl Transition {
    pub fn steps(&self) -> &'static [Step] {
        match self {
            Transition::StartTracking => &[Step::StartTrackingRequired],
            Transition::StopTracking => &[Step::StopTrackingRequired],
            Transition::Activate => &[Step::Activate],
            Transition::ActivateFromInactive => &[Step::StartTrackingRequired, Step::Activate],
            Transition::Suspend => &[Step::Deactivate],
            Transition::Shutdown => &[Step::Deactivate, Step::StopTrackingRequired, Step::Destroy],
        }
    }
}

const TABLE: &[(Classification, Classification, Transition)] = &[
    (WaitingForRequired, TrackingOptional, Transition::Activate),
    (TrackingOptional, WaitingForRequired, Transition::Suspend),
    (Inactive, TrackingOptional, Transition::ActivateFromInactive),
    (Inactive, WaitingForRequired, Transition::StartTracking),
    (WaitingForRequired, Inactive, Transition::StopTracking),
    (TrackingOptional, Inactive, Transition::Shutdown),
];

/// Every row of the transition table matching `old → new`, in table order
pub fn transitions(old: Classification, new: Classification) -> Vec<Transition> {
    TABLE
        .iter()
        .filter(|(from, to, _)| *from == old && *to == new)
        .map(|(_, _, transition)| *transition)
        .collect()
}


#[cfg(test)]
#[path = "lifecycle/lifecycle_parameterized_tests.rs"]
mod lifecycle_parameterized_tests;
