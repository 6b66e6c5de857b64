//! Testing utilities for the homestead twin.
//!
//! This module provides tools for integration testing:
//! - Recording collaborator doubles (`RecordingStreamer`,
//!   `RecordingEffects`, `RecordingHooks`) that capture calls
//! - A `ScriptedRaycaster` for deterministic focus tests
//! - A `TestHarness` wiring the managers with recording collaborators
//! - Assertion helpers for verifying twin state

use crate::annotations::AnnotationStore;
use crate::interaction::{FocusHooks, FocusTracker, Raycaster};
use crate::phases::{LevelStreamer, Phase, PhaseManager};
use crate::scenarios::{EffectRenderer, ScenarioDefinition, ScenarioError, ScenarioId, ScenarioManager};
use crate::sop::SopLibrary;
use crate::telemetry::TelemetryHub;
use crate::world::{HomesteadObject, Interactable, ObjectId, SopLinks, TelemetryBinding, TwinWorld};
use glam::Vec3;

/// Raycaster returning a scripted hit, settable between ticks.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRaycaster {
    /// The hit every cast returns.
    pub hit: Option<ObjectId>,
}

impl ScriptedRaycaster {
    pub fn hitting(id: impl Into<ObjectId>) -> Self {
        Self {
            hit: Some(id.into()),
        }
    }

    pub fn missing() -> Self {
        Self { hit: None }
    }
}

impl Raycaster for ScriptedRaycaster {
    fn cast(&self, _origin: Vec3, _direction: Vec3, _max_distance: f32) -> Option<ObjectId> {
        self.hit.clone()
    }
}

/// Level streamer that records every request.
#[derive(Debug, Clone, Default)]
pub struct RecordingStreamer {
    pub streamed_in: Vec<String>,
    pub streamed_out: Vec<String>,
}

impl LevelStreamer for RecordingStreamer {
    fn stream_in(&mut self, level: &str) {
        self.streamed_in.push(level.to_string());
    }

    fn stream_out(&mut self, level: &str) {
        self.streamed_out.push(level.to_string());
    }
}

/// Effect renderer that records applies and resets.
#[derive(Debug, Clone, Default)]
pub struct RecordingEffects {
    pub applied: Vec<ScenarioId>,
    pub resets: usize,
}

impl EffectRenderer for RecordingEffects {
    fn apply_effects(&mut self, scenario: &ScenarioDefinition) {
        self.applied.push(scenario.id.clone());
    }

    fn reset_effects(&mut self) {
        self.resets += 1;
    }
}

/// Focus hooks that record gained/lost notifications.
#[derive(Debug, Clone, Default)]
pub struct RecordingHooks {
    pub gained: Vec<ObjectId>,
    pub lost: Vec<ObjectId>,
}

impl FocusHooks for RecordingHooks {
    fn focus_gained(&mut self, id: &ObjectId) {
        self.gained.push(id.clone());
    }

    fn focus_lost(&mut self, id: &ObjectId) {
        self.lost.push(id.clone());
    }
}

/// A small world with the common homestead objects used across tests.
pub fn sample_world() -> TwinWorld {
    let mut world = TwinWorld::new();

    world
        .register(
            HomesteadObject::new("rack_main_42u_01", "Main Rack", "rack")
                .with_description("42U rack in the workshop container.")
                .at(Vec3::new(0.0, 1.0, 5.0))
                .with_phase_tag("phase1")
                .with_interactable(Interactable::new())
                .with_sop_links(SopLinks::new(vec!["SOP_POWER_DOWN_RACK_01".into()]))
                .with_telemetry(TelemetryBinding::new("BatteryCharge")),
        )
        .expect("sample world ids are unique");

    world
        .register(
            HomesteadObject::new("well_house_01", "Well House", "structure")
                .at(Vec3::new(12.0, 0.0, -4.0))
                .with_phase_tag("phase0")
                .with_interactable(Interactable::new().with_prompt("Press E to inspect the well")),
        )
        .expect("sample world ids are unique");

    world
        .register(
            HomesteadObject::new("greenhouse_01", "Greenhouse", "structure")
                .at(Vec3::new(-8.0, 0.0, 10.0))
                .with_phase_tag("phase3")
                .with_telemetry(TelemetryBinding::new("GreenhouseTempC")),
        )
        .expect("sample world ids are unique");

    world
}

/// Test harness wiring the managers with recording collaborators.
pub struct TestHarness {
    pub world: TwinWorld,
    pub annotations: AnnotationStore,
    pub phases: PhaseManager,
    pub scenarios: ScenarioManager,
    pub sops: SopLibrary,
    pub telemetry: TelemetryHub,
    pub focus: FocusTracker,
    pub streamer: RecordingStreamer,
    pub effects: RecordingEffects,
    pub hooks: RecordingHooks,
}

impl TestHarness {
    /// Create a harness over [`sample_world`].
    pub fn new() -> Self {
        Self {
            world: sample_world(),
            annotations: AnnotationStore::new(),
            phases: PhaseManager::new(),
            scenarios: ScenarioManager::new(),
            sops: SopLibrary::new(),
            telemetry: TelemetryHub::with_interval(1.0),
            focus: FocusTracker::desktop(),
            streamer: RecordingStreamer::default(),
            effects: RecordingEffects::default(),
            hooks: RecordingHooks::default(),
        }
    }

    /// Switch phase, recording streaming requests.
    pub fn set_phase(&mut self, phase: Phase) {
        self.phases
            .set_phase(phase, &mut self.world, &mut self.streamer);
    }

    /// Activate a scenario, recording effect calls.
    pub fn activate(&mut self, id: &str) -> Result<(), ScenarioError> {
        self.scenarios
            .activate(&ScenarioId::from(id), &mut self.effects)
    }

    /// Deactivate the active scenario, recording the reset.
    pub fn deactivate(&mut self) {
        self.scenarios.deactivate(&mut self.effects);
    }

    /// Feed a raycast result into the focus tracker, recording hooks.
    pub fn focus_hit(&mut self, hit: Option<&str>) {
        self.focus
            .update_focus(hit.map(ObjectId::from), &mut self.hooks);
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the harness is in the expected phase.
#[track_caller]
pub fn assert_phase(harness: &TestHarness, phase: Phase) {
    assert_eq!(
        harness.phases.current(),
        phase,
        "Expected phase {phase}, got {}",
        harness.phases.current()
    );
}

/// Assert an object's current visibility.
#[track_caller]
pub fn assert_visible(harness: &TestHarness, id: &str, visible: bool) {
    let object = harness
        .world
        .get(&ObjectId::from(id))
        .unwrap_or_else(|| panic!("Expected object '{id}' to exist"));
    assert_eq!(
        object.visible, visible,
        "Expected object '{id}' visibility to be {visible}"
    );
}

/// Assert the expected scenario is active.
#[track_caller]
pub fn assert_active_scenario(harness: &TestHarness, id: &str) {
    let active = harness
        .scenarios
        .active()
        .unwrap_or_else(|| panic!("Expected scenario '{id}' to be active, but none is"));
    assert_eq!(
        active.id,
        ScenarioId::from(id),
        "Expected active scenario '{id}', got '{}'",
        active.id
    );
}

/// Assert no scenario is active.
#[track_caller]
pub fn assert_no_active_scenario(harness: &TestHarness) {
    assert!(
        !harness.scenarios.is_active(),
        "Expected no active scenario, but one is active"
    );
}

/// Assert the tracker focuses the expected object (or nothing).
#[track_caller]
pub fn assert_focused(harness: &TestHarness, id: Option<&str>) {
    let expected = id.map(ObjectId::from);
    assert_eq!(
        harness.focus.focused(),
        expected.as_ref(),
        "Expected focus {expected:?}, got {:?}",
        harness.focus.focused()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_world_contents() {
        let world = sample_world();
        assert_eq!(world.len(), 3);
        assert!(world.get(&"rack_main_42u_01".into()).unwrap().has_sops());
        assert!(world.get(&"greenhouse_01".into()).unwrap().telemetry.is_some());
    }

    #[test]
    fn test_harness_phase_flow() {
        let mut harness = TestHarness::new();
        assert_phase(&harness, Phase::Phase0);

        harness.set_phase(Phase::Phase1);
        assert_phase(&harness, Phase::Phase1);
        assert_visible(&harness, "rack_main_42u_01", true);
        assert_visible(&harness, "greenhouse_01", false);
        assert!(!harness.streamer.streamed_in.is_empty());
    }

    #[test]
    fn test_harness_focus_flow() {
        let mut harness = TestHarness::new();
        harness.focus_hit(Some("rack_main_42u_01"));
        assert_focused(&harness, Some("rack_main_42u_01"));
        assert_eq!(harness.hooks.gained.len(), 1);

        harness.focus_hit(None);
        assert_focused(&harness, None);
        assert_eq!(harness.hooks.lost.len(), 1);
    }

    #[test]
    fn test_scripted_raycaster() {
        let raycaster = ScriptedRaycaster::hitting("well_house_01");
        assert_eq!(
            raycaster.cast(Vec3::ZERO, Vec3::Z, 5.0),
            Some(ObjectId::from("well_house_01"))
        );
        assert!(ScriptedRaycaster::missing()
            .cast(Vec3::ZERO, Vec3::Z, 5.0)
            .is_none());
    }
}
