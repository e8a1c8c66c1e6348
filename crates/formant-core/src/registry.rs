//! Field registry: which controls are mounted, and how the user has
//! interacted with them.
//!
//! Registrations are id-addressed because the same path may legally be
//! registered more than once — a named group wrapping several leaves.
//! Interaction flags latch: once a field is touched or dirty it stays
//! that way for the session, until a whole-form reset.

use std::collections::HashMap;

use formant_types::FieldPath;

/// Handle to one mounted control's registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(u64);

/// What a registration represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A single input bound to one leaf value.
    Leaf,
    /// A named group wrapping several leaves; may share its path with
    /// other registrations.
    Group,
}

#[derive(Debug, Clone)]
struct Registration {
    path: FieldPath,
    kind: FieldKind,
    touched: bool,
    dirty: bool,
}

/// Tracks mounted controls and per-field interaction state.
#[derive(Debug, Default)]
pub struct FieldRegistry {
    next_id: u64,
    fields: HashMap<RegistrationId, Registration>,
}

impl FieldRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mounted control. Registration alone triggers no
    /// validation.
    ///
    /// Two `Leaf` registrations on one path indicate a host wiring
    /// mistake; the duplicate is still registered (the control is live
    /// and must track interaction), but the condition is logged.
    pub fn register(&mut self, path: FieldPath, kind: FieldKind) -> RegistrationId {
        if kind == FieldKind::Leaf
            && self
                .fields
                .values()
                .any(|reg| reg.kind == FieldKind::Leaf && reg.path == path)
        {
            tracing::warn!(path = %path, "duplicate leaf registration for field path");
        }

        self.next_id += 1;
        let id = RegistrationId(self.next_id);
        self.fields.insert(
            id,
            Registration {
                path,
                kind,
                touched: false,
                dirty: false,
            },
        );
        id
    }

    /// Remove a registration when its control unmounts.
    ///
    /// Returns false if the id was unknown.
    pub fn unregister(&mut self, id: RegistrationId) -> bool {
        self.fields.remove(&id).is_some()
    }

    /// Latch the touched flag for one registration. Idempotent.
    pub fn mark_touched(&mut self, id: RegistrationId) {
        if let Some(reg) = self.fields.get_mut(&id) {
            reg.touched = true;
        }
    }

    /// Latch the dirty flag for one registration. Idempotent.
    pub fn mark_dirty(&mut self, id: RegistrationId) {
        if let Some(reg) = self.fields.get_mut(&id) {
            reg.dirty = true;
        }
    }

    /// Latch touched on every registration for `path`.
    ///
    /// No-op (at debug level) when the path has no live registration —
    /// interaction on an unmounted control carries no state to keep.
    pub fn mark_touched_at(&mut self, path: &FieldPath) {
        let mut hit = false;
        for reg in self.fields.values_mut().filter(|reg| reg.path == *path) {
            reg.touched = true;
            hit = true;
        }
        if !hit {
            tracing::debug!(path = %path, "touch on unregistered field path");
        }
    }

    /// Latch dirty on every registration for `path`.
    pub fn mark_dirty_at(&mut self, path: &FieldPath) {
        let mut hit = false;
        for reg in self.fields.values_mut().filter(|reg| reg.path == *path) {
            reg.dirty = true;
            hit = true;
        }
        if !hit {
            tracing::debug!(path = %path, "edit on unregistered field path");
        }
    }

    /// True if any registration for `path` has been touched.
    pub fn is_touched(&self, path: &FieldPath) -> bool {
        self.fields
            .values()
            .any(|reg| reg.path == *path && reg.touched)
    }

    /// True if any registration for `path` is dirty.
    pub fn is_dirty(&self, path: &FieldPath) -> bool {
        self.fields
            .values()
            .any(|reg| reg.path == *path && reg.dirty)
    }

    /// True if every registered field has been touched.
    ///
    /// Vacuously true for an empty registry.
    pub fn all_touched(&self) -> bool {
        self.fields.values().all(|reg| reg.touched)
    }

    /// True if any registered field is dirty.
    pub fn any_dirty(&self) -> bool {
        self.fields.values().any(|reg| reg.dirty)
    }

    /// Clear all interaction flags, keeping registrations alive.
    ///
    /// Controls do not need to remount after a form reset.
    pub fn reset(&mut self) {
        for reg in self.fields.values_mut() {
            reg.touched = false;
            reg.dirty = false;
        }
    }

    /// Paths of all live registrations, deduplicated and sorted.
    pub fn registered_paths(&self) -> Vec<FieldPath> {
        let mut paths: Vec<_> = self.fields.values().map(|reg| reg.path.clone()).collect();
        paths.sort();
        paths.dedup();
        paths
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
