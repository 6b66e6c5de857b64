//! Row-based definition tables.
//!
//! Phase, SOP, and scenario definitions are authored as rows in a JSON
//! document rather than hardcoded. Each row type converts into its
//! runtime definition record; the combined document loads all three
//! tables at once.

use crate::phases::{Phase, PhaseDefinition};
use crate::scenarios::{ScenarioDefinition, ScenarioError, ScenarioId};
use crate::sop::{Sop, SopError, SopId, SopStep};
use crate::world::ObjectId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Errors from definition loading.
#[derive(Debug, Error)]
pub enum DefsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Sop(#[from] SopError),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),
}

/// A phase definition row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseRow {
    pub phase: Phase,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub visible_object_tags: Vec<String>,
    #[serde(default)]
    pub streamed_levels: Vec<String>,
}

impl From<PhaseRow> for PhaseDefinition {
    fn from(row: PhaseRow) -> Self {
        Self {
            phase: row.phase,
            name: row.name,
            description: row.description,
            visible_object_tags: row.visible_object_tags,
            streamed_levels: row.streamed_levels,
        }
    }
}

/// A single step row inside a SOP row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SopStepRow {
    pub number: u32,
    pub description: String,
    #[serde(default)]
    pub warning: Option<String>,
    #[serde(default)]
    pub estimated_duration: f32,
}

impl From<SopStepRow> for SopStep {
    fn from(row: SopStepRow) -> Self {
        Self {
            number: row.number,
            description: row.description,
            warning: row.warning,
            estimated_duration: row.estimated_duration,
        }
    }
}

/// A SOP definition row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SopRow {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<SopStepRow>,
    #[serde(default)]
    pub linked_objects: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<SopRow> for Sop {
    fn from(row: SopRow) -> Self {
        Sop::new(
            SopId::new(row.id),
            row.title,
            row.description,
            row.steps.into_iter().map(SopStep::from).collect(),
        )
        .with_linked_objects(row.linked_objects.into_iter().map(ObjectId::new).collect())
        .with_tags(row.tags)
    }
}

/// A scenario definition row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub affected_objects: Vec<String>,
    #[serde(default)]
    pub related_sops: Vec<String>,
}

impl From<ScenarioRow> for ScenarioDefinition {
    fn from(row: ScenarioRow) -> Self {
        Self {
            id: ScenarioId::new(row.id),
            name: row.name,
            description: row.description,
            tags: row.tags,
            affected_objects: row.affected_objects.into_iter().map(ObjectId::new).collect(),
            related_sops: row.related_sops.into_iter().map(SopId::new).collect(),
        }
    }
}

/// The combined definition document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefinitionTables {
    #[serde(default)]
    pub phases: Vec<PhaseRow>,

    #[serde(default)]
    pub sops: Vec<SopRow>,

    #[serde(default)]
    pub scenarios: Vec<ScenarioRow>,
}

impl DefinitionTables {
    /// Load a definition document from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, DefsError> {
        let content = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Parse a definition document from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, DefsError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn phase_definitions(&self) -> Vec<PhaseDefinition> {
        self.phases.iter().cloned().map(PhaseDefinition::from).collect()
    }

    pub fn sop_definitions(&self) -> Vec<Sop> {
        self.sops.iter().cloned().map(Sop::from).collect()
    }

    pub fn scenario_definitions(&self) -> Vec<ScenarioDefinition> {
        self.scenarios
            .iter()
            .cloned()
            .map(ScenarioDefinition::from)
            .collect()
    }
}
