//! Focus tracking for object interaction.
//!
//! A viewpoint (desktop camera or VR laser pointer) periodically raycasts
//! along its forward direction; when the hit changes, the tracker swaps
//! its focused reference and invokes the focus hooks. The hooks default
//! to no-ops: what a focus change means visually (reticle, highlight,
//! prompt) is an extension point for the embedding application.

use crate::world::ObjectId;
use glam::Vec3;

/// Raycast interval for the desktop scheme, in seconds (10 Hz).
pub const DESKTOP_FOCUS_INTERVAL: f32 = 0.1;

/// Desktop interaction raycast reach, in meters.
pub const DESKTOP_FOCUS_DISTANCE: f32 = 5.0;

/// VR laser pointer reach, in meters.
pub const VR_LASER_DISTANCE: f32 = 10.0;

/// A viewpoint: an origin and a forward direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub origin: Vec3,
    pub forward: Vec3,
}

impl Pose {
    /// Build a pose, normalizing the forward direction.
    pub fn new(origin: Vec3, forward: Vec3) -> Self {
        Self {
            origin,
            forward: forward.normalize_or_zero(),
        }
    }
}

/// Environment-side collaborator performing the actual trace.
///
/// [`crate::world::TwinWorld`] provides a headless implementation; a
/// rendering layer can substitute its own scene query.
pub trait Raycaster {
    fn cast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<ObjectId>;
}

impl Raycaster for crate::world::TwinWorld {
    fn cast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<ObjectId> {
        self.raycast(origin, direction, max_distance)
    }
}

/// Extension hooks invoked when the focused object changes.
///
/// Both default to doing nothing; the tracker only guarantees the swap
/// of its tracked reference.
pub trait FocusHooks {
    fn focus_gained(&mut self, _id: &ObjectId) {}
    fn focus_lost(&mut self, _id: &ObjectId) {}
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHooks;

impl FocusHooks for NullHooks {}

/// Tracks the currently focused object via periodic raycasts.
#[derive(Debug, Clone)]
pub struct FocusTracker {
    interval: f32,
    accumulator: f32,
    max_distance: f32,
    focused: Option<ObjectId>,
}

impl FocusTracker {
    pub fn new(interval: f32, max_distance: f32) -> Self {
        Self {
            interval,
            accumulator: 0.0,
            max_distance,
            focused: None,
        }
    }

    /// Desktop scheme: 10 Hz raycasts out to 5 m.
    pub fn desktop() -> Self {
        Self::new(DESKTOP_FOCUS_INTERVAL, DESKTOP_FOCUS_DISTANCE)
    }

    /// VR laser scheme: raycast every tick out to 10 m.
    pub fn vr_laser() -> Self {
        Self::new(0.0, VR_LASER_DISTANCE)
    }

    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }

    /// The currently focused object, if any.
    pub fn focused(&self) -> Option<&ObjectId> {
        self.focused.as_ref()
    }

    /// Drop the current focus without notification (e.g. when the input
    /// scheme changes).
    pub fn clear(&mut self) {
        self.focused = None;
    }

    /// Advance the accumulator. Returns whether a raycast is due.
    pub fn due(&mut self, dt: f32) -> bool {
        self.accumulator += dt;
        if self.accumulator < self.interval {
            return false;
        }
        self.accumulator = 0.0;
        true
    }

    /// Record the result of a due raycast. When the hit differs from the
    /// tracked focus, the reference is swapped and hooks fire.
    pub fn update_focus(&mut self, hit: Option<ObjectId>, hooks: &mut dyn FocusHooks) {
        if hit == self.focused {
            return;
        }
        if let Some(old) = self.focused.take() {
            hooks.focus_lost(&old);
        }
        if let Some(new) = &hit {
            hooks.focus_gained(new);
        }
        self.focused = hit;
    }

    /// Convenience wrapper: accumulate, raycast when due, update focus.
    pub fn tick(
        &mut self,
        dt: f32,
        pose: Pose,
        raycaster: &dyn Raycaster,
        hooks: &mut dyn FocusHooks,
    ) {
        if !self.due(dt) {
            return;
        }
        let hit = raycaster.cast(pose.origin, pose.forward, self.max_distance);
        self.update_focus(hit, hooks);
    }
}

impl Default for FocusTracker {
    fn default() -> Self {
        Self::desktop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Raycaster returning a fixed hit, settable between ticks.
    #[derive(Debug, Default)]
    struct FixedRaycaster {
        hit: Option<ObjectId>,
    }

    impl Raycaster for FixedRaycaster {
        fn cast(&self, _origin: Vec3, _direction: Vec3, _max_distance: f32) -> Option<ObjectId> {
            self.hit.clone()
        }
    }

    #[derive(Debug, Default)]
    struct RecordingHooks {
        gained: Vec<ObjectId>,
        lost: Vec<ObjectId>,
    }

    impl FocusHooks for RecordingHooks {
        fn focus_gained(&mut self, id: &ObjectId) {
            self.gained.push(id.clone());
        }

        fn focus_lost(&mut self, id: &ObjectId) {
            self.lost.push(id.clone());
        }
    }

    fn pose() -> Pose {
        Pose::new(Vec3::ZERO, Vec3::Z)
    }

    #[test]
    fn test_pose_normalizes_forward() {
        let pose = Pose::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0));
        assert_eq!(pose.forward, Vec3::Z);
    }

    #[test]
    fn test_raycast_rate_limited() {
        let mut tracker = FocusTracker::desktop();
        let mut hooks = RecordingHooks::default();
        let raycaster = FixedRaycaster {
            hit: Some(ObjectId::from("rack_main_42u_01")),
        };

        // 0.05s elapsed: not due yet
        tracker.tick(0.05, pose(), &raycaster, &mut hooks);
        assert!(tracker.focused().is_none());

        // Crosses the 0.1s interval
        tracker.tick(0.06, pose(), &raycaster, &mut hooks);
        assert_eq!(tracker.focused(), Some(&ObjectId::from("rack_main_42u_01")));
        assert_eq!(hooks.gained.len(), 1);
    }

    #[test]
    fn test_focus_swap_fires_hooks_once() {
        let mut tracker = FocusTracker::desktop();
        let mut hooks = RecordingHooks::default();

        tracker.update_focus(Some(ObjectId::from("rack_main_42u_01")), &mut hooks);
        // Same hit again: no change, no hooks
        tracker.update_focus(Some(ObjectId::from("rack_main_42u_01")), &mut hooks);
        assert_eq!(hooks.gained.len(), 1);
        assert!(hooks.lost.is_empty());

        tracker.update_focus(Some(ObjectId::from("container_01")), &mut hooks);
        assert_eq!(hooks.lost, vec![ObjectId::from("rack_main_42u_01")]);
        assert_eq!(hooks.gained.last(), Some(&ObjectId::from("container_01")));

        tracker.update_focus(None, &mut hooks);
        assert_eq!(hooks.lost.last(), Some(&ObjectId::from("container_01")));
        assert!(tracker.focused().is_none());
    }

    #[test]
    fn test_vr_laser_fires_every_tick() {
        let mut tracker = FocusTracker::vr_laser();
        let mut hooks = RecordingHooks::default();
        let raycaster = FixedRaycaster {
            hit: Some(ObjectId::from("well_house_01")),
        };

        tracker.tick(0.016, pose(), &raycaster, &mut hooks);
        assert!(tracker.focused().is_some());
    }

    #[test]
    fn test_null_hooks_do_nothing() {
        let mut tracker = FocusTracker::desktop();
        let mut hooks = NullHooks;
        tracker.update_focus(Some(ObjectId::from("rack_main_42u_01")), &mut hooks);
        tracker.update_focus(None, &mut hooks);
        assert!(tracker.focused().is_none());
    }
}
