//! Standard Operating Procedures.
//!
//! SOPs are ordered checklists linked to world objects (power-down a
//! rack, winterize the well house). They are immutable once loaded: the
//! library only hands out shared references.

use crate::world::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Unique identifier for SOPs (e.g. "SOP_POWER_DOWN_RACK_01").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SopId(pub String);

impl SopId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SopId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A single step in a procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SopStep {
    /// Step number (1-based).
    pub number: u32,

    /// Step instruction.
    pub description: String,

    /// Optional warning or caution text.
    pub warning: Option<String>,

    /// Expected duration for this step, in seconds.
    pub estimated_duration: f32,
}

/// A complete Standard Operating Procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sop {
    /// Unique SOP id.
    pub id: SopId,

    /// Human-readable title.
    pub title: String,

    /// What this procedure accomplishes.
    pub description: String,

    /// Ordered list of steps.
    pub steps: Vec<SopStep>,

    /// Objects this procedure applies to.
    pub linked_objects: Vec<ObjectId>,

    /// Tags for categorization (e.g. "power", "fire", "security").
    pub tags: Vec<String>,

    /// Total estimated time for the procedure, in seconds.
    pub total_estimated_time: f32,
}

impl Sop {
    /// Build a SOP from its parts, deriving the total estimated time
    /// from the steps.
    pub fn new(
        id: impl Into<SopId>,
        title: impl Into<String>,
        description: impl Into<String>,
        steps: Vec<SopStep>,
    ) -> Self {
        let total_estimated_time = steps.iter().map(|s| s.estimated_duration).sum();
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            steps,
            linked_objects: Vec::new(),
            tags: Vec::new(),
            total_estimated_time,
        }
    }

    pub fn with_linked_objects(mut self, objects: Vec<ObjectId>) -> Self {
        self.linked_objects = objects;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn applies_to(&self, object: &ObjectId) -> bool {
        self.linked_objects.contains(object)
    }
}

/// Errors from SOP loading.
#[derive(Debug, Error)]
pub enum SopError {
    #[error("duplicate SOP id: {0}")]
    DuplicateSop(SopId),
}

/// Read-only library of loaded SOPs.
#[derive(Debug, Clone, Default)]
pub struct SopLibrary {
    sops: HashMap<SopId, Sop>,
}

impl SopLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a SOP. Ids must be unique.
    pub fn add(&mut self, sop: Sop) -> Result<(), SopError> {
        if self.sops.contains_key(&sop.id) {
            return Err(SopError::DuplicateSop(sop.id));
        }
        self.sops.insert(sop.id.clone(), sop);
        Ok(())
    }

    /// Load a batch of SOPs, rejecting duplicates.
    pub fn load(&mut self, sops: Vec<Sop>) -> Result<(), SopError> {
        for sop in sops {
            self.add(sop)?;
        }
        Ok(())
    }

    pub fn get(&self, id: &SopId) -> Option<&Sop> {
        self.sops.get(id)
    }

    pub fn all(&self) -> Vec<&Sop> {
        self.sops.values().collect()
    }

    /// All SOPs linked to a specific object.
    pub fn for_object(&self, object: &ObjectId) -> Vec<&Sop> {
        self.sops.values().filter(|s| s.applies_to(object)).collect()
    }

    pub fn by_tag(&self, tag: &str) -> Vec<&Sop> {
        self.sops
            .values()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }

    /// Case-insensitive text search over titles and descriptions.
    pub fn search(&self, text: &str) -> Vec<&Sop> {
        let needle = text.to_lowercase();
        self.sops
            .values()
            .filter(|s| {
                s.title.to_lowercase().contains(&needle)
                    || s.description.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sops.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn power_down_rack() -> Sop {
        Sop::new(
            "SOP_POWER_DOWN_RACK_01",
            "Power Down Main Rack",
            "Graceful shutdown of the 42U rack before maintenance.",
            vec![
                SopStep {
                    number: 1,
                    description: "Drain workloads from the hypervisor.".to_string(),
                    warning: None,
                    estimated_duration: 300.0,
                },
                SopStep {
                    number: 2,
                    description: "Shut down storage nodes.".to_string(),
                    warning: Some("Wait for disk activity lights to stop.".to_string()),
                    estimated_duration: 120.0,
                },
                SopStep {
                    number: 3,
                    description: "Flip the rack breaker.".to_string(),
                    warning: None,
                    estimated_duration: 30.0,
                },
            ],
        )
        .with_linked_objects(vec![ObjectId::from("rack_main_42u_01")])
        .with_tags(vec!["power".to_string()])
    }

    fn well_winterize() -> Sop {
        Sop::new(
            "SOP_WINTERIZE_WELL_01",
            "Winterize Well House",
            "Prepare the well house for sustained freezing weather.",
            vec![SopStep {
                number: 1,
                description: "Drain the exposed supply line.".to_string(),
                warning: None,
                estimated_duration: 600.0,
            }],
        )
        .with_linked_objects(vec![ObjectId::from("well_house_01")])
        .with_tags(vec!["water".to_string(), "seasonal".to_string()])
    }

    #[test]
    fn test_total_time_derived_from_steps() {
        let sop = power_down_rack();
        assert_eq!(sop.total_estimated_time, 450.0);
    }

    #[test]
    fn test_lookup_and_duplicates() {
        let mut library = SopLibrary::new();
        library.add(power_down_rack()).unwrap();

        assert!(library.get(&SopId::from("SOP_POWER_DOWN_RACK_01")).is_some());
        assert!(library.get(&SopId::from("SOP_MISSING")).is_none());
        assert!(matches!(
            library.add(power_down_rack()),
            Err(SopError::DuplicateSop(_))
        ));
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn test_for_object() {
        let mut library = SopLibrary::new();
        library.load(vec![power_down_rack(), well_winterize()]).unwrap();

        let rack_sops = library.for_object(&ObjectId::from("rack_main_42u_01"));
        assert_eq!(rack_sops.len(), 1);
        assert_eq!(rack_sops[0].title, "Power Down Main Rack");
        assert!(library.for_object(&ObjectId::from("orchard_row_03")).is_empty());
    }

    #[test]
    fn test_by_tag() {
        let mut library = SopLibrary::new();
        library.load(vec![power_down_rack(), well_winterize()]).unwrap();

        assert_eq!(library.by_tag("seasonal").len(), 1);
        assert!(library.by_tag("fire").is_empty());
    }

    #[test]
    fn test_search_case_insensitive() {
        let mut library = SopLibrary::new();
        library.load(vec![power_down_rack(), well_winterize()]).unwrap();

        assert_eq!(library.search("RACK").len(), 1);
        assert_eq!(library.search("freezing").len(), 1);
        assert!(library.search("greenhouse").is_empty());
    }
}
