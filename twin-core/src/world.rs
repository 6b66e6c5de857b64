//! Homestead world model.
//!
//! Contains the base entity record for every physical object in the twin
//! (racks, containers, sensors, deterrents) plus the registry that holds
//! them. Objects carry an explicit set of optional capability handles
//! instead of inheriting from a framework type: interaction, SOP links,
//! and telemetry display are each opt-in.

use crate::sop::SopId;
use crate::telemetry::StatusThresholds;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// How close to the ray a visible object's position must be to count
/// as a hit, in meters.
const RAY_HIT_RADIUS: f32 = 0.5;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for homestead objects (e.g. "rack_main_42u_01").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ============================================================================
// Capabilities
// ============================================================================

/// Interaction capability: the object can be focused and examined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interactable {
    /// Whether interaction is currently enabled.
    pub enabled: bool,

    /// Prompt shown when the object is focused.
    pub prompt: String,

    /// Maximum interaction distance in meters.
    pub max_distance: f32,

    /// Whether the player is currently focusing this object.
    #[serde(default)]
    pub focused: bool,
}

impl Interactable {
    pub fn new() -> Self {
        Self {
            enabled: true,
            prompt: "Press E to interact".to_string(),
            max_distance: 3.0,
            focused: false,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Mark the object as focused.
    pub fn focus_gained(&mut self) {
        self.focused = true;
    }

    /// Clear the focused flag.
    pub fn focus_lost(&mut self) {
        self.focused = false;
    }

    /// Attempt an interaction. Returns whether it fired.
    ///
    /// Downstream handling of a fired interaction (opening an info panel,
    /// highlighting SOPs) is an extension point left to the embedding
    /// application.
    pub fn interact(&self) -> bool {
        self.enabled
    }
}

impl Default for Interactable {
    fn default() -> Self {
        Self::new()
    }
}

/// SOP capability: the object is linked to one or more procedures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SopLinks {
    ids: Vec<SopId>,
}

impl SopLinks {
    pub fn new(ids: Vec<SopId>) -> Self {
        Self { ids }
    }

    /// Link a SOP. Duplicate links are ignored.
    pub fn add(&mut self, id: SopId) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }

    pub fn remove(&mut self, id: &SopId) {
        self.ids.retain(|existing| existing != id);
    }

    pub fn ids(&self) -> &[SopId] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// How a telemetry reading is displayed on the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TelemetryDisplay {
    #[default]
    FloatingText,
    ColorOverlay,
    Graph,
    Hidden,
}

/// Telemetry capability: the object displays one or more live channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryBinding {
    /// Primary channel key to display.
    pub key: String,

    /// Additional keys for multi-value display.
    pub additional_keys: Vec<String>,

    /// Display mode.
    pub display: TelemetryDisplay,

    /// Thresholds used to color the displayed value.
    pub thresholds: StatusThresholds,
}

impl TelemetryBinding {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            additional_keys: Vec::new(),
            display: TelemetryDisplay::default(),
            thresholds: StatusThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: StatusThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }
}

// ============================================================================
// Homestead objects
// ============================================================================

/// A physical object in the homestead twin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomesteadObject {
    /// Unique object identifier.
    pub id: ObjectId,

    /// Display name.
    pub name: String,

    /// Object category (e.g. "rack", "container", "sensor", "deterrent").
    pub category: String,

    /// Human-readable description.
    pub description: String,

    /// World position in meters.
    pub position: Vec3,

    /// Phase tags controlling visibility (e.g. "phase1").
    pub phase_tags: Vec<String>,

    /// Additional metadata tags.
    pub metadata_tags: Vec<String>,

    /// Whether the object is currently visible.
    pub visible: bool,

    /// Interaction capability, if any.
    pub interactable: Option<Interactable>,

    /// SOP links, if any.
    pub sop_links: Option<SopLinks>,

    /// Telemetry display binding, if any.
    pub telemetry: Option<TelemetryBinding>,
}

impl HomesteadObject {
    pub fn new(
        id: impl Into<ObjectId>,
        name: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            description: String::new(),
            position: Vec3::ZERO,
            phase_tags: Vec::new(),
            metadata_tags: Vec::new(),
            visible: true,
            interactable: None,
            sop_links: None,
            telemetry: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_phase_tag(mut self, tag: impl Into<String>) -> Self {
        self.phase_tags.push(tag.into());
        self
    }

    pub fn with_metadata_tag(mut self, tag: impl Into<String>) -> Self {
        self.metadata_tags.push(tag.into());
        self
    }

    pub fn with_interactable(mut self, interactable: Interactable) -> Self {
        self.interactable = Some(interactable);
        self
    }

    pub fn with_sop_links(mut self, links: SopLinks) -> Self {
        self.sop_links = Some(links);
        self
    }

    pub fn with_telemetry(mut self, binding: TelemetryBinding) -> Self {
        self.telemetry = Some(binding);
        self
    }

    /// Whether this object can be interacted with at all.
    pub fn is_interactive(&self) -> bool {
        self.interactable.is_some()
    }

    /// Whether this object has any linked SOPs.
    pub fn has_sops(&self) -> bool {
        self.sop_links
            .as_ref()
            .map(|links| !links.is_empty())
            .unwrap_or(false)
    }

    pub fn has_metadata_tag(&self, tag: &str) -> bool {
        self.metadata_tags.iter().any(|t| t == tag)
    }
}

/// Errors from the world registry.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("duplicate object id: {0}")]
    DuplicateObject(ObjectId),
}

/// Registry of all objects in the twin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TwinWorld {
    objects: HashMap<ObjectId, HomesteadObject>,
}

impl TwinWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object. Object ids must be unique.
    pub fn register(&mut self, object: HomesteadObject) -> Result<(), WorldError> {
        if self.objects.contains_key(&object.id) {
            return Err(WorldError::DuplicateObject(object.id));
        }
        self.objects.insert(object.id.clone(), object);
        Ok(())
    }

    pub fn get(&self, id: &ObjectId) -> Option<&HomesteadObject> {
        self.objects.get(id)
    }

    pub fn get_mut(&mut self, id: &ObjectId) -> Option<&mut HomesteadObject> {
        self.objects.get_mut(id)
    }

    /// Remove an object. Returns whether something was removed.
    pub fn remove(&mut self, id: &ObjectId) -> bool {
        self.objects.remove(id).is_some()
    }

    pub fn all(&self) -> Vec<&HomesteadObject> {
        self.objects.values().collect()
    }

    pub fn by_category(&self, category: &str) -> Vec<&HomesteadObject> {
        self.objects
            .values()
            .filter(|o| o.category == category)
            .collect()
    }

    pub fn by_metadata_tag(&self, tag: &str) -> Vec<&HomesteadObject> {
        self.objects
            .values()
            .filter(|o| o.has_metadata_tag(tag))
            .collect()
    }

    pub fn visible_objects(&self) -> Vec<&HomesteadObject> {
        self.objects.values().filter(|o| o.visible).collect()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Apply a phase's visible tag set to every object.
    ///
    /// Objects without phase tags are phase-independent and stay visible;
    /// tagged objects are visible iff at least one of their tags is in
    /// the set.
    pub fn apply_visible_tags(&mut self, tags: &[String]) {
        for object in self.objects.values_mut() {
            if object.phase_tags.is_empty() {
                object.visible = true;
            } else {
                object.visible = object.phase_tags.iter().any(|t| tags.contains(t));
            }
        }
    }

    /// Trace a ray through the world and return the closest visible hit.
    ///
    /// An object is hit when its position lies within [`RAY_HIT_RADIUS`]
    /// of the ray segment. This stands in for the engine's scene trace
    /// when running headless.
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<ObjectId> {
        let dir = direction.normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }

        let mut best: Option<(f32, &ObjectId)> = None;
        for object in self.objects.values().filter(|o| o.visible) {
            let t = (object.position - origin).dot(dir);
            if t < 0.0 || t > max_distance {
                continue;
            }
            let closest = origin + dir * t;
            if closest.distance_squared(object.position) <= RAY_HIT_RADIUS * RAY_HIT_RADIUS
                && best.map_or(true, |(best_t, _)| t < best_t)
            {
                best = Some((t, &object.id));
            }
        }

        best.map(|(_, id)| id.clone())
    }
}
