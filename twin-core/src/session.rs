//! TwinSession - the primary public API for the homestead twin.
//!
//! A session owns the world registry, the entity stores, the phase and
//! scenario managers, the telemetry hub, and the active input rig, and
//! drives all of them from an externally-supplied frame clock. Rendering
//! and streaming layers attach as collaborators; headless runs (and
//! tests) use the built-in null implementations.

use crate::annotations::{Annotation, AnnotationError, AnnotationStore};
use crate::defs::{DefinitionTables, DefsError};
use crate::interaction::{FocusHooks, FocusTracker, NullHooks, Pose};
use crate::pawn::{Action, DesktopPawn, InputEvent, VrPawn};
use crate::persist::{self, PersistError};
use crate::phases::{LevelStreamer, NullStreamer, Phase, PhaseManager};
use crate::scenarios::{EffectRenderer, NullEffects, ScenarioError, ScenarioId, ScenarioManager};
use crate::sop::SopLibrary;
use crate::telemetry::{MockChannel, TelemetryHub};
use crate::world::{ObjectId, TwinWorld};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Current session save file version.
const SESSION_SAVE_VERSION: u32 = 1;

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Defs(#[from] DefsError),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    #[error("Save version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Configuration for creating a new twin session.
#[derive(Debug, Clone)]
pub struct TwinConfig {
    /// Application name, used for the default save directory.
    pub app_name: String,

    /// Application version string.
    pub version: String,

    /// Telemetry refresh interval in seconds.
    pub telemetry_interval: f32,

    /// Mock telemetry channels.
    pub mock_channels: Vec<MockChannel>,

    /// Save directory for annotations and session state.
    pub save_dir: PathBuf,

    /// Whether to run the VR input scheme instead of desktop.
    pub vr_mode: bool,
}

impl TwinConfig {
    /// Create a config with defaults for the given application name.
    pub fn new(app_name: impl Into<String>) -> Self {
        let app_name = app_name.into();
        let save_dir = persist::default_save_dir(&app_name);
        Self {
            app_name,
            version: "0.1.0-alpha".to_string(),
            telemetry_interval: 5.0,
            mock_channels: crate::telemetry::default_mock_channels(),
            save_dir,
            vr_mode: false,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_telemetry_interval(mut self, interval: f32) -> Self {
        self.telemetry_interval = interval;
        self
    }

    pub fn with_mock_channels(mut self, channels: Vec<MockChannel>) -> Self {
        self.mock_channels = channels;
        self
    }

    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = dir.into();
        self
    }

    pub fn with_vr_mode(mut self, vr_mode: bool) -> Self {
        self.vr_mode = vr_mode;
        self
    }
}

/// The active input scheme and its pawn.
#[derive(Debug, Clone)]
pub enum InputRig {
    Desktop(DesktopPawn),
    Vr(VrPawn),
}

impl InputRig {
    /// Viewpoint pose for the focus raycast.
    ///
    /// The VR rig has no pose until hand tracking is wired up, so the
    /// laser selects nothing in VR.
    fn pose(&self) -> Option<Pose> {
        match self {
            InputRig::Desktop(pawn) => Some(pawn.pose()),
            InputRig::Vr(pawn) => pawn.laser_pose(),
        }
    }

    fn handle_event(&mut self, event: InputEvent) {
        match self {
            InputRig::Desktop(pawn) => pawn.handle_event(event),
            InputRig::Vr(pawn) => pawn.handle_event(event),
        }
    }

    fn apply_movement(&mut self, dt: f32) {
        match self {
            InputRig::Desktop(pawn) => pawn.apply_movement(dt),
            InputRig::Vr(pawn) => pawn.apply_movement(dt),
        }
    }
}

/// A homestead twin session.
pub struct TwinSession {
    config: TwinConfig,
    world: TwinWorld,
    annotations: AnnotationStore,
    phases: PhaseManager,
    scenarios: ScenarioManager,
    sops: SopLibrary,
    telemetry: TelemetryHub,
    focus: FocusTracker,
    rig: InputRig,
    streamer: Box<dyn LevelStreamer + Send>,
    effects: Box<dyn EffectRenderer + Send>,
    hooks: Box<dyn FocusHooks + Send>,
}

impl TwinSession {
    /// Create a new session from a configuration.
    pub fn new(config: TwinConfig) -> Self {
        let mut telemetry = TelemetryHub::with_interval(config.telemetry_interval);
        telemetry.set_channels(config.mock_channels.clone());

        let (focus, rig) = if config.vr_mode {
            (FocusTracker::vr_laser(), InputRig::Vr(VrPawn::new()))
        } else {
            (FocusTracker::desktop(), InputRig::Desktop(DesktopPawn::new()))
        };

        tracing::info!(app = %config.app_name, vr = config.vr_mode, "session created");

        Self {
            config,
            world: TwinWorld::new(),
            annotations: AnnotationStore::new(),
            phases: PhaseManager::new(),
            scenarios: ScenarioManager::new(),
            sops: SopLibrary::new(),
            telemetry,
            focus,
            rig,
            streamer: Box::new(NullStreamer),
            effects: Box::new(NullEffects),
            hooks: Box::new(NullHooks),
        }
    }

    /// Attach a level-streaming collaborator.
    pub fn set_streamer(&mut self, streamer: Box<dyn LevelStreamer + Send>) {
        self.streamer = streamer;
    }

    /// Attach a scenario-effect rendering collaborator.
    pub fn set_effects(&mut self, effects: Box<dyn EffectRenderer + Send>) {
        self.effects = effects;
    }

    /// Attach focus-change hooks.
    pub fn set_focus_hooks(&mut self, hooks: Box<dyn FocusHooks + Send>) {
        self.hooks = hooks;
    }

    /// Load phase, SOP, and scenario definitions from a table document.
    pub fn load_definitions(&mut self, tables: &DefinitionTables) -> Result<(), DefsError> {
        if !tables.phases.is_empty() {
            self.phases.set_definitions(tables.phase_definitions());
        }
        self.sops.load(tables.sop_definitions())?;
        self.scenarios.load(tables.scenario_definitions())?;
        Ok(())
    }

    /// Advance the session by one frame.
    ///
    /// Drives pawn movement, the telemetry accumulator, and the focus
    /// raycast. Returns true when a live telemetry poll is due (see
    /// [`TelemetryHub::poll_live`]).
    pub fn tick(&mut self, dt: f32) -> bool {
        self.rig.apply_movement(dt);

        let poll_due = self.telemetry.tick(dt);

        if self.focus.due(dt) {
            let hit = self
                .rig
                .pose()
                .and_then(|pose| {
                    self.world
                        .raycast(pose.origin, pose.forward, self.focus.max_distance())
                });
            self.focus.update_focus(hit, &mut *self.hooks);
        }

        poll_due
    }

    /// Route an input event to the active rig and session actions.
    ///
    /// UI-facing actions (e.g. [`Action::PhaseSelector`]) pass through
    /// untouched; the embedding shell decides what they open.
    pub fn handle_input(&mut self, event: InputEvent) {
        if let InputEvent::Pressed(Action::Interact) = event {
            self.interact();
        }
        self.rig.handle_event(event);
    }

    /// Interact with the focused object.
    ///
    /// Returns the object id when the interaction fired (object focused,
    /// interactable, and enabled). What an interaction does downstream
    /// is an extension point for the embedding application.
    pub fn interact(&mut self) -> Option<ObjectId> {
        let id = self.focus.focused()?.clone();
        let object = self.world.get(&id)?;
        let fired = object
            .interactable
            .as_ref()
            .map(|i| i.interact())
            .unwrap_or(false);
        fired.then_some(id)
    }

    /// Switch the homestead build-out phase.
    pub fn set_phase(&mut self, phase: Phase) {
        self.phases
            .set_phase(phase, &mut self.world, &mut *self.streamer);
    }

    /// Activate a scenario, deactivating any previous one.
    pub fn activate_scenario(&mut self, id: &ScenarioId) -> Result<(), ScenarioError> {
        self.scenarios.activate(id, &mut *self.effects)
    }

    /// Deactivate the active scenario, if any.
    pub fn deactivate_scenario(&mut self) {
        self.scenarios.deactivate(&mut *self.effects);
    }

    /// Save annotations and the current phase selection.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let saved = SavedTwin {
            version: SESSION_SAVE_VERSION,
            phase: self.phases.current(),
            annotations: self.annotations.export(),
        };

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(&saved)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Restore annotations and the phase selection from a save file.
    pub async fn load(&mut self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let content = fs::read_to_string(path).await?;
        let saved: SavedTwin = serde_json::from_str(&content)?;

        if saved.version != SESSION_SAVE_VERSION {
            return Err(SessionError::VersionMismatch {
                expected: SESSION_SAVE_VERSION,
                found: saved.version,
            });
        }

        self.annotations.restore(saved.annotations)?;
        self.set_phase(saved.phase);
        Ok(())
    }

    /// Save the annotation store to its canonical file under the save
    /// directory. Returns the path written.
    pub async fn save_annotations(&self) -> Result<PathBuf, SessionError> {
        let path = persist::annotations_path(&self.config.save_dir);
        persist::SavedAnnotations::new(self.annotations.export())
            .save_json(&path)
            .await?;
        Ok(path)
    }

    /// Load the annotation store from its canonical file, if present.
    /// Returns whether a file was loaded.
    pub async fn load_annotations(&mut self) -> Result<bool, SessionError> {
        let path = persist::annotations_path(&self.config.save_dir);
        if !path.exists() {
            return Ok(false);
        }
        let saved = persist::SavedAnnotations::load_json(&path).await?;
        self.annotations.restore(saved.annotations)?;
        Ok(true)
    }

    /// Canonical save path under the configured save directory.
    pub fn auto_save_path(&self) -> PathBuf {
        self.config.save_dir.join("session.json")
    }

    /// Shut the session down: deactivate any scenario, stop telemetry,
    /// and save to the canonical path.
    pub async fn shutdown(&mut self) -> Result<(), SessionError> {
        self.deactivate_scenario();
        self.telemetry.stop();
        let path = self.auto_save_path();
        self.save(&path).await?;
        tracing::info!(path = %path.display(), "session shut down");
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &TwinConfig {
        &self.config
    }

    pub fn world(&self) -> &TwinWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut TwinWorld {
        &mut self.world
    }

    pub fn annotations(&self) -> &AnnotationStore {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut AnnotationStore {
        &mut self.annotations
    }

    pub fn phases(&self) -> &PhaseManager {
        &self.phases
    }

    pub fn phases_mut(&mut self) -> &mut PhaseManager {
        &mut self.phases
    }

    pub fn scenarios(&self) -> &ScenarioManager {
        &self.scenarios
    }

    pub fn scenarios_mut(&mut self) -> &mut ScenarioManager {
        &mut self.scenarios
    }

    pub fn sops(&self) -> &SopLibrary {
        &self.sops
    }

    pub fn sops_mut(&mut self) -> &mut SopLibrary {
        &mut self.sops
    }

    pub fn telemetry(&self) -> &TelemetryHub {
        &self.telemetry
    }

    pub fn telemetry_mut(&mut self) -> &mut TelemetryHub {
        &mut self.telemetry
    }

    pub fn focus(&self) -> &FocusTracker {
        &self.focus
    }

    pub fn rig(&self) -> &InputRig {
        &self.rig
    }

    pub fn rig_mut(&mut self) -> &mut InputRig {
        &mut self.rig
    }

    /// The focused object id, if any.
    pub fn focused_object(&self) -> Option<&ObjectId> {
        self.focus.focused()
    }
}

/// Serializable session state for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct SavedTwin {
    version: u32,
    phase: Phase,
    annotations: Vec<Annotation>,
}
