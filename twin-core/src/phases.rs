//! Homestead build-out phases (P0-P5).
//!
//! The phase manager holds the single global phase value, applies the
//! phase's visibility tag set to the world, diffs the streamed-level set
//! against the previous phase, and notifies observers with the old and
//! new phase together.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stage of the homestead's build-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    Phase0,
    Phase1,
    Phase2,
    Phase3,
    Phase4,
    Phase5,
}

impl Phase {
    /// Display name matching the build-out plan.
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Phase0 => "Phase 0 - Minimal Containers",
            Phase::Phase1 => "Phase 1 - Workshop & Rack",
            Phase::Phase2 => "Phase 2 - Tiny Home & Orchard",
            Phase::Phase3 => "Phase 3 - Greenhouse & Swales",
            Phase::Phase4 => "Phase 4 - Perimeter & Deterrence",
            Phase::Phase5 => "Phase 5 - Full Build-out",
        }
    }

    /// The tag objects use to mark themselves as part of this phase.
    pub fn tag(&self) -> &'static str {
        match self {
            Phase::Phase0 => "phase0",
            Phase::Phase1 => "phase1",
            Phase::Phase2 => "phase2",
            Phase::Phase3 => "phase3",
            Phase::Phase4 => "phase4",
            Phase::Phase5 => "phase5",
        }
    }

    pub fn all() -> [Phase; 6] {
        [
            Phase::Phase0,
            Phase::Phase1,
            Phase::Phase2,
            Phase::Phase3,
            Phase::Phase4,
            Phase::Phase5,
        ]
    }
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Phase0
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Static configuration for a single phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseDefinition {
    /// Phase identifier.
    pub phase: Phase,

    /// Human-readable phase name.
    pub name: String,

    /// Phase description.
    pub description: String,

    /// Tags of objects visible in this phase.
    pub visible_object_tags: Vec<String>,

    /// Sub-levels streamed in for this phase.
    pub streamed_levels: Vec<String>,
}

/// Scene-side collaborator that applies a phase's visibility pass.
///
/// [`crate::world::TwinWorld`] implements this; a rendering layer can
/// substitute its own scene graph.
pub trait SceneGraph {
    fn apply_visible_tags(&mut self, tags: &[String]);
}

impl SceneGraph for crate::world::TwinWorld {
    fn apply_visible_tags(&mut self, tags: &[String]) {
        crate::world::TwinWorld::apply_visible_tags(self, tags);
    }
}

/// Streaming-side collaborator receiving level stream requests.
pub trait LevelStreamer {
    fn stream_in(&mut self, level: &str);
    fn stream_out(&mut self, level: &str);
}

/// Streamer that drops all requests. Used when no streaming layer is
/// attached (headless runs, tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStreamer;

impl LevelStreamer for NullStreamer {
    fn stream_in(&mut self, _level: &str) {}
    fn stream_out(&mut self, _level: &str) {}
}

type PhaseObserver = Box<dyn FnMut(Phase, Phase) + Send>;

/// Holds the current phase and its definitions.
pub struct PhaseManager {
    current: Phase,
    definitions: Vec<PhaseDefinition>,
    observers: Vec<PhaseObserver>,
}

impl PhaseManager {
    /// Create a manager starting at Phase 0 with the default definitions.
    pub fn new() -> Self {
        Self {
            current: Phase::Phase0,
            definitions: default_definitions(),
            observers: Vec::new(),
        }
    }

    /// Replace the definition table (e.g. after loading from a data file).
    pub fn set_definitions(&mut self, definitions: Vec<PhaseDefinition>) {
        self.definitions = definitions;
    }

    pub fn current(&self) -> Phase {
        self.current
    }

    pub fn definition(&self, phase: Phase) -> Option<&PhaseDefinition> {
        self.definitions.iter().find(|d| d.phase == phase)
    }

    pub fn all_definitions(&self) -> &[PhaseDefinition] {
        &self.definitions
    }

    /// Register an observer called with (old, new) on every phase change.
    pub fn on_phase_changed(&mut self, observer: impl FnMut(Phase, Phase) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Switch to a new phase.
    ///
    /// No-op when the phase is unchanged. Otherwise applies the new
    /// phase's visibility tags to the scene, diffs streamed levels
    /// against the old phase, and notifies observers with both values.
    pub fn set_phase(
        &mut self,
        new: Phase,
        scene: &mut dyn SceneGraph,
        streamer: &mut dyn LevelStreamer,
    ) {
        if new == self.current {
            return;
        }

        let old = std::mem::replace(&mut self.current, new);
        tracing::info!(old = %old.tag(), new = %new.tag(), "phase changed");

        let empty: &[String] = &[];
        let new_tags = self
            .definition(new)
            .map(|d| d.visible_object_tags.as_slice())
            .unwrap_or(empty);
        scene.apply_visible_tags(new_tags);

        let old_levels = self
            .definition(old)
            .map(|d| d.streamed_levels.clone())
            .unwrap_or_default();
        let new_levels = self
            .definition(new)
            .map(|d| d.streamed_levels.clone())
            .unwrap_or_default();

        for level in old_levels.iter().filter(|l| !new_levels.contains(*l)) {
            streamer.stream_out(level);
        }
        for level in new_levels.iter().filter(|l| !old_levels.contains(*l)) {
            streamer.stream_in(level);
        }

        for observer in &mut self.observers {
            observer(old, new);
        }
    }

    /// Whether an object tag is visible in the current phase.
    ///
    /// False when the current phase has no definition.
    pub fn is_visible(&self, tag: &str) -> bool {
        self.definition(self.current)
            .map(|d| d.visible_object_tags.iter().any(|t| t == tag))
            .unwrap_or(false)
    }
}

impl Default for PhaseManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Built-in phase definitions.
///
/// Build-out accumulates: each phase keeps every earlier phase's objects
/// visible and adds its own.
pub fn default_definitions() -> Vec<PhaseDefinition> {
    let descriptions = [
        "Two shipping containers, well pad, and temporary power.",
        "Workshop container fitted out with the 42U rack and PV array.",
        "Tiny home placed and orchard rows planted.",
        "Greenhouse raised and swales cut along the contour lines.",
        "Perimeter fencing, lighting, and deterrence sensors online.",
        "Every planned structure and system in place.",
    ];

    Phase::all()
        .iter()
        .zip(descriptions)
        .map(|(&phase, description)| {
            let visible_object_tags = Phase::all()
                .iter()
                .take_while(|p| **p <= phase)
                .map(|p| p.tag().to_string())
                .collect();
            PhaseDefinition {
                phase,
                name: phase.name().to_string(),
                description: description.to_string(),
                visible_object_tags,
                streamed_levels: vec![format!("L_{}", phase.tag())],
            }
        })
        .collect()
}
