//! Player locomotion state for the desktop and VR input schemes.
//!
//! The engine's input layer is an external collaborator: it feeds
//! discrete pressed/released/axis events into these pawns, and the
//! per-frame update applies the resulting movement with an explicit
//! elapsed-time parameter.

use crate::interaction::Pose;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Base walking speed, in meters per second.
const BASE_MOVEMENT_SPEED: f32 = 3.0;

/// Speed multiplier while sprinting.
const SPRINT_MULTIPLIER: f32 = 2.0;

/// Speed multiplier while slow-walking.
const SLOW_WALK_MULTIPLIER: f32 = 0.5;

/// Eye height above the pawn origin, in meters.
const EYE_HEIGHT: f32 = 1.7;

/// Snap-turn step for VR, in degrees.
const SNAP_TURN_ANGLE: f32 = 45.0;

/// Maximum VR teleport distance, in meters.
const MAX_TELEPORT_DISTANCE: f32 = 10.0;

/// Launch speed used when projecting the teleport arc, in meters per
/// second.
pub const TELEPORT_ARC_VELOCITY: f32 = 9.0;

/// Discrete button actions fed in by the input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Interact,
    PhaseSelector,
    ToggleFreeFly,
    Sprint,
    SlowWalk,
    ToggleLocomotion,
    SnapTurnLeft,
    SnapTurnRight,
}

/// Continuous axes fed in by the input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisInput {
    MoveForward,
    MoveRight,
    MoveUp,
    LookUp,
    Turn,
}

/// A single input event from the keyboard/mouse or motion controllers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    Pressed(Action),
    Released(Action),
    Axis(AxisInput, f32),
}

/// Current axis values, refreshed by the input layer each frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
struct AxisState {
    forward: f32,
    right: f32,
    up: f32,
}

/// First-person pawn for the desktop (WASD + mouse-look) scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesktopPawn {
    /// Pawn origin in meters.
    pub position: Vec3,

    /// Heading in degrees, 0 facing +Z.
    pub yaw: f32,

    /// Look pitch in degrees, clamped to avoid flipping.
    pub pitch: f32,

    /// Mouse-look sensitivity multiplier.
    pub mouse_sensitivity: f32,

    free_fly: bool,
    sprinting: bool,
    slow_walking: bool,
    axes: AxisState,
}

impl DesktopPawn {
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            mouse_sensitivity: 1.0,
            free_fly: false,
            sprinting: false,
            slow_walking: false,
            axes: AxisState::default(),
        }
    }

    /// Route an input event into the pawn state.
    pub fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::Pressed(Action::Sprint) => self.sprinting = true,
            InputEvent::Released(Action::Sprint) => self.sprinting = false,
            InputEvent::Pressed(Action::SlowWalk) => self.slow_walking = true,
            InputEvent::Released(Action::SlowWalk) => self.slow_walking = false,
            InputEvent::Pressed(Action::ToggleFreeFly) => self.free_fly = !self.free_fly,
            InputEvent::Axis(AxisInput::MoveForward, value) => self.axes.forward = value,
            InputEvent::Axis(AxisInput::MoveRight, value) => self.axes.right = value,
            InputEvent::Axis(AxisInput::MoveUp, value) => self.axes.up = value,
            InputEvent::Axis(AxisInput::Turn, value) => {
                self.yaw += value * self.mouse_sensitivity;
            }
            InputEvent::Axis(AxisInput::LookUp, value) => {
                self.pitch = (self.pitch + value * self.mouse_sensitivity).clamp(-89.0, 89.0);
            }
            _ => {}
        }
    }

    /// Movement speed with the sprint/slow-walk modifiers applied.
    /// Sprint wins when both are held.
    pub fn current_speed(&self) -> f32 {
        if self.sprinting {
            BASE_MOVEMENT_SPEED * SPRINT_MULTIPLIER
        } else if self.slow_walking {
            BASE_MOVEMENT_SPEED * SLOW_WALK_MULTIPLIER
        } else {
            BASE_MOVEMENT_SPEED
        }
    }

    pub fn is_free_fly(&self) -> bool {
        self.free_fly
    }

    pub fn set_free_fly(&mut self, enabled: bool) {
        self.free_fly = enabled;
    }

    /// Horizontal forward vector derived from the yaw heading.
    pub fn heading(&self) -> Vec3 {
        let yaw = self.yaw.to_radians();
        Vec3::new(yaw.sin(), 0.0, yaw.cos())
    }

    /// Full look direction including pitch, for the interaction raycast.
    pub fn look_direction(&self) -> Vec3 {
        let yaw = self.yaw.to_radians();
        let pitch = self.pitch.to_radians();
        Vec3::new(
            pitch.cos() * yaw.sin(),
            pitch.sin(),
            pitch.cos() * yaw.cos(),
        )
    }

    /// Viewpoint pose for the focus raycast.
    pub fn pose(&self) -> Pose {
        Pose::new(
            self.position + Vec3::new(0.0, EYE_HEIGHT, 0.0),
            self.look_direction(),
        )
    }

    /// Advance the pawn by the held axis values. Vertical movement only
    /// applies in free-fly mode.
    pub fn apply_movement(&mut self, dt: f32) {
        let heading = self.heading();
        let right = Vec3::new(heading.z, 0.0, -heading.x);
        let mut delta = heading * self.axes.forward + right * self.axes.right;
        if self.free_fly {
            delta += Vec3::Y * self.axes.up;
        }
        if delta != Vec3::ZERO {
            self.position += delta.normalize_or_zero() * self.current_speed() * dt;
        }
    }
}

impl Default for DesktopPawn {
    fn default() -> Self {
        Self::new()
    }
}

/// VR locomotion style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum VrLocomotion {
    #[default]
    Teleport,
    Smooth,
}

/// Room-scale pawn for the VR scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VrPawn {
    /// Play-space origin in meters.
    pub position: Vec3,

    /// Play-space heading in degrees.
    pub yaw: f32,

    locomotion: VrLocomotion,
    axes: AxisState,
}

impl VrPawn {
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: 0.0,
            locomotion: VrLocomotion::default(),
            axes: AxisState::default(),
        }
    }

    pub fn locomotion(&self) -> VrLocomotion {
        self.locomotion
    }

    /// Route an input event into the pawn state.
    pub fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::Pressed(Action::ToggleLocomotion) => {
                self.locomotion = match self.locomotion {
                    VrLocomotion::Teleport => VrLocomotion::Smooth,
                    VrLocomotion::Smooth => VrLocomotion::Teleport,
                };
            }
            InputEvent::Pressed(Action::SnapTurnLeft) => self.yaw -= SNAP_TURN_ANGLE,
            InputEvent::Pressed(Action::SnapTurnRight) => self.yaw += SNAP_TURN_ANGLE,
            InputEvent::Axis(AxisInput::MoveForward, value) => self.axes.forward = value,
            InputEvent::Axis(AxisInput::MoveRight, value) => self.axes.right = value,
            _ => {}
        }
    }

    /// Whether a teleport destination is acceptable: within the maximum
    /// teleport distance of the current position.
    pub fn is_teleport_destination_valid(&self, target: Vec3) -> bool {
        self.position.distance_squared(target) <= MAX_TELEPORT_DISTANCE * MAX_TELEPORT_DISTANCE
    }

    /// Teleport to the target when valid. Returns whether the pawn moved.
    pub fn execute_teleport(&mut self, target: Vec3) -> bool {
        if self.is_teleport_destination_valid(target) {
            self.position = target;
            true
        } else {
            false
        }
    }

    /// Project the teleport arc from a controller pose and return the
    /// destination surface point.
    ///
    /// Not implemented: the arc projection needs tracked-controller data
    /// and walkable-surface queries that only the engine layer has.
    /// Callers must treat `None` as "no destination".
    pub fn compute_teleport_arc(&self, _controller: Pose) -> Option<Vec3> {
        None
    }

    /// Laser pointer pose from the tracked hand.
    ///
    /// Not implemented: requires motion-controller tracking data from
    /// the engine layer. `None` means the laser selects nothing.
    pub fn laser_pose(&self) -> Option<Pose> {
        None
    }

    /// Advance the pawn with the held thumbstick axes. Only moves in
    /// smooth locomotion mode.
    pub fn apply_movement(&mut self, dt: f32) {
        if self.locomotion != VrLocomotion::Smooth {
            return;
        }
        let yaw = self.yaw.to_radians();
        let heading = Vec3::new(yaw.sin(), 0.0, yaw.cos());
        let right = Vec3::new(heading.z, 0.0, -heading.x);
        let delta = heading * self.axes.forward + right * self.axes.right;
        if delta != Vec3::ZERO {
            self.position += delta.normalize_or_zero() * BASE_MOVEMENT_SPEED * dt;
        }
    }
}

impl Default for VrPawn {
    fn default() -> Self {
        Self::new()
    }
}
