//! Scenario simulations (power failure, intrusion, fire response).
//!
//! Scenarios are mutually-exclusive visual planning overlays: at most one
//! is active at any instant. Activating a new scenario always resets the
//! previous one first. The visual side effects themselves belong to a
//! rendering collaborator; headless runs attach [`NullEffects`].

use crate::sop::SopId;
use crate::world::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Unique identifier for scenarios (e.g. "scenario_power_failure").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScenarioId(pub String);

impl ScenarioId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ScenarioId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Static definition of a scenario simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    /// Unique scenario id.
    pub id: ScenarioId,

    /// Human-readable scenario name.
    pub name: String,

    /// Scenario description.
    pub description: String,

    /// Tags for organization (e.g. "power", "security").
    pub tags: Vec<String>,

    /// Objects affected by the scenario.
    pub affected_objects: Vec<ObjectId>,

    /// SOPs to highlight while the scenario runs.
    pub related_sops: Vec<SopId>,
}

/// Rendering-side collaborator applying and resetting scenario effects
/// (color overlays, coverage cones, pathing arrows).
pub trait EffectRenderer {
    fn apply_effects(&mut self, scenario: &ScenarioDefinition);
    fn reset_effects(&mut self);
}

/// Renderer that drops all effect requests. Used headless and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEffects;

impl EffectRenderer for NullEffects {
    fn apply_effects(&mut self, _scenario: &ScenarioDefinition) {}
    fn reset_effects(&mut self) {}
}

/// Errors from scenario operations.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("unknown scenario: {0}")]
    UnknownScenario(ScenarioId),

    #[error("duplicate scenario id: {0}")]
    DuplicateScenario(ScenarioId),
}

type ActivatedObserver = Box<dyn FnMut(&ScenarioDefinition) + Send>;
type DeactivatedObserver = Box<dyn FnMut() + Send>;

/// Holds scenario definitions and the at-most-one active scenario.
#[derive(Default)]
pub struct ScenarioManager {
    definitions: HashMap<ScenarioId, ScenarioDefinition>,
    active: Option<ScenarioId>,
    activated_observers: Vec<ActivatedObserver>,
    deactivated_observers: Vec<DeactivatedObserver>,
}

impl ScenarioManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scenario definition. Ids must be unique.
    pub fn add_definition(&mut self, definition: ScenarioDefinition) -> Result<(), ScenarioError> {
        if self.definitions.contains_key(&definition.id) {
            return Err(ScenarioError::DuplicateScenario(definition.id));
        }
        self.definitions.insert(definition.id.clone(), definition);
        Ok(())
    }

    /// Load a batch of definitions, rejecting duplicates.
    pub fn load(&mut self, definitions: Vec<ScenarioDefinition>) -> Result<(), ScenarioError> {
        for definition in definitions {
            self.add_definition(definition)?;
        }
        Ok(())
    }

    pub fn definition(&self, id: &ScenarioId) -> Option<&ScenarioDefinition> {
        self.definitions.get(id)
    }

    pub fn all(&self) -> Vec<&ScenarioDefinition> {
        self.definitions.values().collect()
    }

    pub fn by_tag(&self, tag: &str) -> Vec<&ScenarioDefinition> {
        self.definitions
            .values()
            .filter(|d| d.tags.iter().any(|t| t == tag))
            .collect()
    }

    /// The currently active scenario, if any.
    pub fn active(&self) -> Option<&ScenarioDefinition> {
        self.active.as_ref().and_then(|id| self.definitions.get(id))
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Register an observer called when a scenario activates.
    pub fn on_activated(&mut self, observer: impl FnMut(&ScenarioDefinition) + Send + 'static) {
        self.activated_observers.push(Box::new(observer));
    }

    /// Register an observer called when the active scenario deactivates.
    pub fn on_deactivated(&mut self, observer: impl FnMut() + Send + 'static) {
        self.deactivated_observers.push(Box::new(observer));
    }

    /// Activate a scenario.
    ///
    /// Any active scenario is deactivated first, before the new id is
    /// even looked up; an unknown id therefore leaves the manager idle.
    pub fn activate(
        &mut self,
        id: &ScenarioId,
        effects: &mut dyn EffectRenderer,
    ) -> Result<(), ScenarioError> {
        if self.active.is_some() {
            self.deactivate(effects);
        }

        let definition = self
            .definitions
            .get(id)
            .cloned()
            .ok_or_else(|| ScenarioError::UnknownScenario(id.clone()))?;

        effects.apply_effects(&definition);
        self.active = Some(id.clone());
        tracing::info!(scenario = %id, "scenario activated");

        for observer in &mut self.activated_observers {
            observer(&definition);
        }
        Ok(())
    }

    /// Deactivate the active scenario. No-op when idle.
    pub fn deactivate(&mut self, effects: &mut dyn EffectRenderer) {
        let Some(id) = self.active.take() else {
            return;
        };

        effects.reset_effects();
        tracing::info!(scenario = %id, "scenario deactivated");

        for observer in &mut self.deactivated_observers {
            observer();
        }
    }
}
