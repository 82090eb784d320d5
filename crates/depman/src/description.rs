//! Serializable snapshots of a component for diagnostics

use crate::dependency::{Dependency, DependencyId};
use crate::registration::RegistrationStatus;
use depman_core::{Classification, DmResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyDescription {
    pub id: DependencyId,
    pub kind: String,
    pub name: String,
    pub required: bool,
    pub available: bool,
}

impl DependencyDescription {
    pub fn of(dependency: &dyn Dependency) -> Self {
        Self {
            id: dependency.id(),
            kind: dependency.kind().to_string(),
            name: dependency.name(),
            required: dependency.is_required(),
            available: dependency.is_available(),
        }
    }
}

/// Point-in-time view of a component and its dependencies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescription {
    pub name: String,
    pub state: Classification,
    pub interfaces: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<RegistrationStatus>,
    pub instantiated: bool,
    pub dependencies: Vec<DependencyDescription>,
}

impl ComponentDescription {
    /// Dependencies keeping the component from activating
    pub fn missing_required(&self) -> impl Iterator<Item = &DependencyDescription> {
        self.dependencies
            .iter()
            .filter(|d| d.required && !d.available)
    }

    pub fn to_json(&self) -> DmResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
