//! In-world annotations.
//!
//! Annotations are player-authored notes pinned to a world position,
//! optionally tied to a phase or a modeled object. The store owns every
//! record; ids are generated on creation and never change.

use crate::phases::Phase;
use crate::world::ObjectId;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationId(pub Uuid);

impl AnnotationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AnnotationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An in-world annotation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Unique annotation id, immutable after creation.
    pub id: AnnotationId,

    /// World position in meters.
    pub position: Vec3,

    /// Annotation text content.
    pub text: String,

    /// Category for organization (e.g. "maintenance", "planning").
    pub category: Option<String>,

    /// Creation stamp, nanoseconds since the Unix epoch.
    pub created: u64,

    /// Last-edit stamp. Strictly increases on every update.
    pub modified: u64,

    /// Optional phase association.
    pub phase: Option<Phase>,

    /// Optional linked object id.
    pub linked_object: Option<ObjectId>,
}

impl Annotation {
    /// Build a record for [`AnnotationStore::insert`]. Stamps are filled
    /// by the store.
    pub fn new(position: Vec3, text: impl Into<String>) -> Self {
        Self {
            id: AnnotationId::new(),
            position,
            text: text.into(),
            category: None,
            created: 0,
            modified: 0,
            phase: None,
            linked_object: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn linked_to(mut self, object: ObjectId) -> Self {
        self.linked_object = Some(object);
        self
    }
}

/// Errors from annotation operations.
#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("duplicate annotation id: {0}")]
    Duplicate(AnnotationId),
}

/// A change made to the store, delivered to registered observers.
#[derive(Debug, Clone)]
pub enum AnnotationEvent {
    Created(Annotation),
    Updated(Annotation),
    Deleted(AnnotationId),
}

type ChangeObserver = Box<dyn FnMut(&AnnotationEvent) + Send>;

/// Owning store for all annotations.
#[derive(Default)]
pub struct AnnotationStore {
    annotations: HashMap<AnnotationId, Annotation>,
    last_stamp: u64,
    observers: Vec<ChangeObserver>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer for store changes.
    pub fn on_change(&mut self, observer: impl FnMut(&AnnotationEvent) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Create a new annotation and return its generated id.
    pub fn create(
        &mut self,
        position: Vec3,
        text: impl Into<String>,
        category: Option<String>,
    ) -> AnnotationId {
        let stamp = self.next_stamp();
        let annotation = Annotation {
            id: AnnotationId::new(),
            position,
            text: text.into(),
            category,
            created: stamp,
            modified: stamp,
            phase: None,
            linked_object: None,
        };
        let id = annotation.id;
        self.annotations.insert(id, annotation.clone());
        self.notify(&AnnotationEvent::Created(annotation));
        id
    }

    /// Insert a pre-built record (e.g. from [`Annotation::new`] with
    /// phase or object links). Fresh stamps are assigned; a colliding id
    /// is rejected rather than silently overwritten.
    pub fn insert(&mut self, mut annotation: Annotation) -> Result<AnnotationId, AnnotationError> {
        if self.annotations.contains_key(&annotation.id) {
            return Err(AnnotationError::Duplicate(annotation.id));
        }
        let stamp = self.next_stamp();
        annotation.created = stamp;
        annotation.modified = stamp;

        let id = annotation.id;
        self.annotations.insert(id, annotation.clone());
        self.notify(&AnnotationEvent::Created(annotation));
        Ok(id)
    }

    /// Update an annotation's text and optionally its category.
    ///
    /// Returns false (leaving the store unchanged) when the id is
    /// unknown. `category` of `None` keeps the existing value.
    pub fn update(&mut self, id: AnnotationId, text: &str, category: Option<&str>) -> bool {
        if !self.annotations.contains_key(&id) {
            return false;
        }
        let stamp = self.next_stamp();

        let Some(annotation) = self.annotations.get_mut(&id) else {
            return false;
        };
        annotation.text = text.to_string();
        if let Some(category) = category {
            annotation.category = Some(category.to_string());
        }
        annotation.modified = stamp;

        let updated = annotation.clone();
        self.notify(&AnnotationEvent::Updated(updated));
        true
    }

    /// Remove an annotation. Returns whether something was removed.
    pub fn remove(&mut self, id: AnnotationId) -> bool {
        if self.annotations.remove(&id).is_some() {
            self.notify(&AnnotationEvent::Deleted(id));
            true
        } else {
            false
        }
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.get(&id)
    }

    pub fn all(&self) -> Vec<&Annotation> {
        self.annotations.values().collect()
    }

    pub fn by_category(&self, category: &str) -> Vec<&Annotation> {
        self.annotations
            .values()
            .filter(|a| a.category.as_deref() == Some(category))
            .collect()
    }

    pub fn by_phase(&self, phase: Phase) -> Vec<&Annotation> {
        self.annotations
            .values()
            .filter(|a| a.phase == Some(phase))
            .collect()
    }

    pub fn for_object(&self, object: &ObjectId) -> Vec<&Annotation> {
        self.annotations
            .values()
            .filter(|a| a.linked_object.as_ref() == Some(object))
            .collect()
    }

    /// All annotations within `radius` meters of a position. Compared
    /// via squared distance; the radius itself is inclusive.
    pub fn near(&self, position: Vec3, radius: f32) -> Vec<&Annotation> {
        let radius_squared = radius * radius;
        self.annotations
            .values()
            .filter(|a| a.position.distance_squared(position) <= radius_squared)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Owned snapshot of every record, ordered by creation stamp. Used
    /// by the persistence layer.
    pub fn export(&self) -> Vec<Annotation> {
        let mut annotations: Vec<Annotation> = self.annotations.values().cloned().collect();
        annotations.sort_by_key(|a| a.created);
        annotations
    }

    /// Replace the store contents with previously exported records,
    /// preserving their ids and stamps.
    pub fn restore(&mut self, annotations: Vec<Annotation>) -> Result<(), AnnotationError> {
        let mut restored = HashMap::with_capacity(annotations.len());
        let mut last_stamp = self.last_stamp;
        for annotation in annotations {
            if restored.contains_key(&annotation.id) {
                return Err(AnnotationError::Duplicate(annotation.id));
            }
            last_stamp = last_stamp.max(annotation.created).max(annotation.modified);
            restored.insert(annotation.id, annotation);
        }
        self.annotations = restored;
        self.last_stamp = last_stamp;
        Ok(())
    }

    /// Next edit stamp. Monotonic even when the wall clock stalls within
    /// its resolution, so `modified` strictly increases across updates.
    fn next_stamp(&mut self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        self.last_stamp = now.max(self.last_stamp + 1);
        self.last_stamp
    }

    fn notify(&mut self, event: &AnnotationEvent) {
        for observer in &mut self.observers {
            observer(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_create_then_get_matches_inputs() {
        let mut store = AnnotationStore::new();
        let position = Vec3::new(1.0, 2.0, 3.0);
        let id = store.create(position, "Check breaker labels", Some("maintenance".to_string()));

        let annotation = store.get(id).expect("created annotation should exist");
        assert_eq!(annotation.id, id);
        assert_eq!(annotation.position, position);
        assert_eq!(annotation.text, "Check breaker labels");
        assert_eq!(annotation.category.as_deref(), Some("maintenance"));
        assert_eq!(annotation.created, annotation.modified);
    }

    #[test]
    fn test_update_unknown_id_fails_and_leaves_store_unchanged() {
        let mut store = AnnotationStore::new();
        let id = store.create(Vec3::ZERO, "original", None);

        assert!(!store.update(AnnotationId::new(), "changed", None));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(id).unwrap().text, "original");
    }

    #[test]
    fn test_update_bumps_modified_strictly() {
        let mut store = AnnotationStore::new();
        let id = store.create(Vec3::ZERO, "v1", None);
        let before = store.get(id).unwrap().modified;

        assert!(store.update(id, "v2", None));
        let after = store.get(id).unwrap();
        assert_eq!(after.text, "v2");
        assert!(after.modified > before);
        assert_eq!(after.created, before);
    }

    #[test]
    fn test_update_keeps_category_when_none() {
        let mut store = AnnotationStore::new();
        let id = store.create(Vec3::ZERO, "note", Some("planning".to_string()));

        store.update(id, "note v2", None);
        assert_eq!(store.get(id).unwrap().category.as_deref(), Some("planning"));

        store.update(id, "note v3", Some("maintenance"));
        assert_eq!(
            store.get(id).unwrap().category.as_deref(),
            Some("maintenance")
        );
    }

    #[test]
    fn test_remove_true_exactly_once() {
        let mut store = AnnotationStore::new();
        let id = store.create(Vec3::ZERO, "temp", None);

        assert!(store.remove(id));
        assert!(!store.remove(id));
        assert!(store.get(id).is_none());
    }

    #[test]
    fn test_proximity_query() {
        let mut store = AnnotationStore::new();
        let probe = Vec3::new(10.0, 0.0, 0.0);
        let at_zero = store.create(probe, "at probe", None);
        let at_five = store.create(probe + Vec3::new(0.0, 5.0, 0.0), "5m away", None);
        store.create(probe + Vec3::new(15.0, 0.0, 0.0), "15m away", None);

        let nearby = store.near(probe, 10.0);
        let mut ids: Vec<AnnotationId> = nearby.iter().map(|a| a.id).collect();
        ids.sort_by_key(|id| id.0);
        let mut expected = vec![at_zero, at_five];
        expected.sort_by_key(|id| id.0);
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_proximity_radius_inclusive() {
        let mut store = AnnotationStore::new();
        store.create(Vec3::new(10.0, 0.0, 0.0), "on the boundary", None);

        assert_eq!(store.near(Vec3::ZERO, 10.0).len(), 1);
        assert!(store.near(Vec3::ZERO, 9.99).is_empty());
    }

    #[test]
    fn test_filters() {
        let mut store = AnnotationStore::new();
        store.create(Vec3::ZERO, "a", Some("maintenance".to_string()));
        store.create(Vec3::ZERO, "b", Some("planning".to_string()));
        store
            .insert(
                Annotation::new(Vec3::ZERO, "c")
                    .with_phase(Phase::Phase2)
                    .linked_to(ObjectId::from("rack_main_42u_01")),
            )
            .unwrap();

        assert_eq!(store.by_category("maintenance").len(), 1);
        assert_eq!(store.by_phase(Phase::Phase2).len(), 1);
        assert!(store.by_phase(Phase::Phase5).is_empty());
        assert_eq!(
            store.for_object(&ObjectId::from("rack_main_42u_01")).len(),
            1
        );
    }

    #[test]
    fn test_insert_duplicate_rejected() {
        let mut store = AnnotationStore::new();
        let annotation = Annotation::new(Vec3::ZERO, "once");
        store.insert(annotation.clone()).unwrap();

        assert!(matches!(
            store.insert(annotation),
            Err(AnnotationError::Duplicate(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_export_restore_round_trip() {
        let mut store = AnnotationStore::new();
        let id = store.create(Vec3::new(1.0, 0.0, 0.0), "first", Some("maintenance".to_string()));
        store.create(Vec3::new(2.0, 0.0, 0.0), "second", None);
        store.update(id, "first edited", None);

        let exported = store.export();

        let mut fresh = AnnotationStore::new();
        fresh.restore(exported.clone()).unwrap();
        assert_eq!(fresh.export(), exported);

        // Restored stores keep stamps monotonic: a new update must land
        // after every restored stamp.
        assert!(fresh.update(id, "post-restore edit", None));
        let highest = exported.iter().map(|a| a.modified).max().unwrap();
        assert!(fresh.get(id).unwrap().modified > highest);
    }

    #[test]
    fn test_change_observers() {
        let mut store = AnnotationStore::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        store.on_change(move |event| {
            let label = match event {
                AnnotationEvent::Created(_) => "created",
                AnnotationEvent::Updated(_) => "updated",
                AnnotationEvent::Deleted(_) => "deleted",
            };
            sink.lock().unwrap().push(label);
        });

        let id = store.create(Vec3::ZERO, "note", None);
        store.update(id, "note v2", None);
        store.remove(id);

        assert_eq!(*events.lock().unwrap(), vec!["created", "updated", "deleted"]);
    }
}
