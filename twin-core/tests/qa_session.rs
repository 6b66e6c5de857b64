//! QA tests for the session facade: input routing, focus, SOP lookup,
//! and shutdown behavior.

use glam::Vec3;
use tempfile::TempDir;
use twin_core::defs::DefinitionTables;
use twin_core::pawn::{Action, AxisInput, InputEvent};
use twin_core::phases::Phase;
use twin_core::sop::SopId;
use twin_core::world::{HomesteadObject, Interactable, ObjectId, SopLinks};
use twin_core::{TwinConfig, TwinSession};

const DEFINITIONS: &str = r#"{
    "sops": [
        {
            "id": "SOP_POWER_DOWN_RACK_01",
            "title": "Power Down Main Rack",
            "description": "Graceful shutdown before maintenance.",
            "steps": [
                { "number": 1, "description": "Drain workloads.", "estimated_duration": 300.0 },
                { "number": 2, "description": "Flip the breaker.", "warning": "Verify UPS first.", "estimated_duration": 30.0 }
            ],
            "linked_objects": ["rack_main_42u_01"],
            "tags": ["power"]
        }
    ],
    "scenarios": [
        {
            "id": "scenario_power_failure",
            "name": "Power Failure",
            "tags": ["power"],
            "related_sops": ["SOP_POWER_DOWN_RACK_01"]
        }
    ]
}"#;

fn build_session(temp_dir: &TempDir) -> TwinSession {
    let config = TwinConfig::new("homestead-twin")
        .with_telemetry_interval(1.0)
        .with_save_dir(temp_dir.path());
    let mut session = TwinSession::new(config);

    session
        .world_mut()
        .register(
            HomesteadObject::new("rack_main_42u_01", "Main Rack", "rack")
                .at(Vec3::new(0.0, 1.7, 3.0))
                .with_phase_tag("phase1")
                .with_interactable(Interactable::new())
                .with_sop_links(SopLinks::new(vec![SopId::from("SOP_POWER_DOWN_RACK_01")])),
        )
        .unwrap();

    let tables = DefinitionTables::from_json(DEFINITIONS).unwrap();
    session.load_definitions(&tables).unwrap();
    session
}

#[test]
fn test_movement_input_changes_viewpoint() {
    let temp_dir = TempDir::new().unwrap();
    let mut session = build_session(&temp_dir);

    session.handle_input(InputEvent::Axis(AxisInput::MoveForward, 1.0));
    session.tick(1.0);

    let twin_core::session::InputRig::Desktop(pawn) = session.rig() else {
        panic!("expected desktop rig");
    };
    assert!(pawn.position.z > 2.9, "pawn should have walked forward");
}

#[test]
fn test_focus_and_interact_flow() {
    let temp_dir = TempDir::new().unwrap();
    let mut session = build_session(&temp_dir);

    session.tick(0.1);
    let focused = session.focused_object().cloned();
    assert_eq!(focused, Some(ObjectId::from("rack_main_42u_01")));

    // The interact key fires against the focused object
    session.handle_input(InputEvent::Pressed(Action::Interact));

    // From the focused object's SOP links to the full procedure
    let id = focused.unwrap();
    let object = session.world().get(&id).unwrap();
    let links = object.sop_links.as_ref().unwrap().ids().to_vec();
    let sops: Vec<_> = links
        .iter()
        .filter_map(|sop_id| session.sops().get(sop_id))
        .collect();
    assert_eq!(sops.len(), 1);
    assert_eq!(sops[0].title, "Power Down Main Rack");
    assert_eq!(sops[0].total_estimated_time, 330.0);
    assert_eq!(
        sops[0].steps[1].warning.as_deref(),
        Some("Verify UPS first.")
    );
}

#[test]
fn test_hiding_phase_breaks_focus() {
    let temp_dir = TempDir::new().unwrap();
    let mut session = build_session(&temp_dir);

    session.set_phase(Phase::Phase1);
    session.tick(0.1);
    assert!(session.focused_object().is_some());

    // Phase 0 hides the rack; the next raycast loses it
    session.set_phase(Phase::Phase0);
    session.tick(0.1);
    assert!(session.focused_object().is_none());
}

#[test]
fn test_scenario_sop_cross_reference() {
    let temp_dir = TempDir::new().unwrap();
    let mut session = build_session(&temp_dir);

    session
        .activate_scenario(&"scenario_power_failure".into())
        .unwrap();

    let related: Vec<_> = session
        .scenarios()
        .active()
        .unwrap()
        .related_sops
        .iter()
        .filter_map(|id| session.sops().get(id))
        .collect();
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].id, SopId::from("SOP_POWER_DOWN_RACK_01"));
}

#[tokio::test]
async fn test_shutdown_persists_phase_and_annotations() {
    let temp_dir = TempDir::new().unwrap();
    let mut session = build_session(&temp_dir);

    session.set_phase(Phase::Phase4);
    session
        .annotations_mut()
        .create(Vec3::new(2.0, 0.0, 2.0), "Swap camera battery", None);
    session
        .activate_scenario(&"scenario_power_failure".into())
        .unwrap();
    session.telemetry_mut().start();

    session.shutdown().await.unwrap();
    assert!(!session.scenarios().is_active());
    assert!(!session.telemetry().is_active());

    let mut resumed = build_session(&temp_dir);
    resumed.load(session.auto_save_path()).await.unwrap();

    assert_eq!(resumed.phases().current(), Phase::Phase4);
    assert_eq!(resumed.annotations().len(), 1);
}
