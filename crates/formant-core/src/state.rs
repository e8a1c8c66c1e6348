//! The aggregated form state: the snapshot UI layers bind to.
//!
//! [`FormState`] is derived, never stored: it is recomputed wholesale
//! from (model, result map, pending set, interaction flags) on every
//! applied mutation, so subscribers can never observe a partial update.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use formant_types::{MessageSet, ResultKey, ResultMap};

/// Where the session is in its edit/validate cycle.
///
/// `submitted` is deliberately not a phase — it is an orthogonal flag
/// on [`FormState`], since a form stays submittable-again while editing
/// continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// No edits and no submit yet.
    Pristine,
    /// Edited, with a debounce window still open (no suite call in
    /// flight yet).
    Editing,
    /// At least one validation run in flight.
    Validating,
    /// Edited, nothing pending.
    Settled,
}

/// One consistent snapshot of the whole form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormState {
    /// The current model.
    pub value: Value,
    /// Field errors, keyed by rendered path. Root errors live in `root`.
    pub errors: BTreeMap<String, Vec<String>>,
    /// Field warnings, keyed by rendered path.
    pub warnings: BTreeMap<String, Vec<String>>,
    /// True iff no error exists anywhere, root included.
    pub valid: bool,
    /// True while any validation run is in flight.
    pub pending: bool,
    /// True once any registered field has been edited.
    pub dirty: bool,
    /// True once submit has been attempted.
    pub submitted: bool,
    /// Edit/validate cycle position.
    pub phase: SessionPhase,
    /// True while a smart-state conflict awaits resolution.
    pub conflict_pending: bool,
    /// Cross-field (root) messages.
    pub root: MessageSet,
}

/// Inputs to a state recomputation. Everything is borrowed; the
/// computation is pure.
#[derive(Debug, Clone, Copy)]
pub struct StateInputs<'a> {
    /// Current model snapshot.
    pub model: &'a Value,
    /// Merged validation results.
    pub results: &'a ResultMap,
    /// Any run in flight.
    pub pending: bool,
    /// Any debounce timer open.
    pub timers_open: bool,
    /// Any registered field dirty.
    pub dirty: bool,
    /// Model mutated at least once this session.
    pub mutated: bool,
    /// Submit attempted at least once.
    pub submitted: bool,
    /// A merge conflict awaits resolution.
    pub conflict_pending: bool,
}

impl FormState {
    /// Recompute the snapshot from its inputs.
    pub fn compute(inputs: StateInputs<'_>) -> Self {
        let phase = if !inputs.mutated {
            SessionPhase::Pristine
        } else if inputs.pending {
            SessionPhase::Validating
        } else if inputs.timers_open {
            SessionPhase::Editing
        } else {
            SessionPhase::Settled
        };

        let mut errors = BTreeMap::new();
        let mut warnings = BTreeMap::new();
        let mut root = MessageSet::default();
        for (key, messages) in inputs.results.iter() {
            match key {
                ResultKey::Root => root = messages.clone(),
                ResultKey::Field(path) => {
                    let rendered = path.to_string();
                    if messages.has_errors() {
                        errors.insert(rendered.clone(), messages.errors.clone());
                    }
                    if messages.has_warnings() {
                        warnings.insert(rendered, messages.warnings.clone());
                    }
                }
            }
        }

        Self {
            value: inputs.model.clone(),
            errors,
            warnings,
            valid: inputs.results.valid(),
            pending: inputs.pending,
            dirty: inputs.dirty,
            submitted: inputs.submitted,
            phase,
            conflict_pending: inputs.conflict_pending,
            root,
        }
    }
}
