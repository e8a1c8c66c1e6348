//! Smart-state merge: reconciling local edits with externally pushed
//! model snapshots.
//!
//! A conflict is not an error — it is a first-class reconciliation
//! state. The engine tracks the last externally-synced snapshot (the
//! baseline) so it can tell "locally edited since last sync" from
//! "never touched"; without the baseline every external update would
//! look like a conflict.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use formant_types::{FieldPath, diff_leaf_paths, get, set};

/// How external updates are reconciled with local edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Local model wins wholesale; external changes are dropped.
    PreferLocal,
    /// External model wins wholesale; local edits are dropped.
    PreferExternal,
    /// Field-level reconciliation with a preserve-list and conflict
    /// handling.
    #[default]
    Smart,
}

/// A conflict handler's verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictResolution {
    /// Keep the local values on the conflicting paths.
    KeepLocal,
    /// Adopt the external values on the conflicting paths.
    KeepExternal,
    /// Replace the whole model with a custom merge.
    ReplaceWith(Value),
    /// Defer: surface the conflict to the caller and change nothing.
    Defer,
}

/// Callback invoked when conflicting paths exist.
pub type ConflictHandler = Arc<dyn Fn(&Value, &Value) -> ConflictResolution + Send + Sync>;

/// An unresolved merge, surfaced to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    /// The locally edited model at conflict time.
    pub local: Value,
    /// The external snapshot that could not be auto-merged.
    pub external: Value,
    /// The paths edited locally that the external update also changed.
    pub diff_paths: Vec<FieldPath>,
}

/// Result of one merge attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// Reconciliation succeeded; adopt this model.
    Merged(Value),
    /// Manual resolution required; the model is unchanged.
    Pending(Conflict),
}

/// Reconciles local and external model snapshots.
pub struct MergeEngine {
    strategy: MergeStrategy,
    preserve: Vec<FieldPath>,
    on_conflict: Option<ConflictHandler>,
    /// Last externally-synced snapshot.
    baseline: Value,
}

impl fmt::Debug for MergeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeEngine")
            .field("strategy", &self.strategy)
            .field("preserve", &self.preserve)
            .field("has_conflict_handler", &self.on_conflict.is_some())
            .finish()
    }
}

impl MergeEngine {
    /// Create an engine. `baseline` is the model as of the last sync —
    /// initially the model the session started from.
    pub fn new(
        strategy: MergeStrategy,
        preserve: Vec<FieldPath>,
        on_conflict: Option<ConflictHandler>,
        baseline: Value,
    ) -> Self {
        Self {
            strategy,
            preserve,
            on_conflict,
            baseline,
        }
    }

    /// Reconcile `local` with an incoming `external` snapshot.
    ///
    /// On `Merged` the baseline advances to `external`; on `Pending`
    /// nothing changes until [`MergeEngine::resolve`] is called.
    pub fn merge(&mut self, local: &Value, external: &Value) -> MergeOutcome {
        match self.strategy {
            MergeStrategy::PreferLocal => {
                self.baseline = external.clone();
                MergeOutcome::Merged(local.clone())
            }
            MergeStrategy::PreferExternal => {
                self.baseline = external.clone();
                MergeOutcome::Merged(external.clone())
            }
            MergeStrategy::Smart => self.merge_smart(local, external),
        }
    }

    fn merge_smart(&mut self, local: &Value, external: &Value) -> MergeOutcome {
        let diffs = diff_leaf_paths(local, external);
        let mut merged = local.clone();
        let mut conflicting = Vec::new();

        for path in diffs {
            if self.is_preserved(&path) {
                // Preserve-list paths always keep the local value.
                continue;
            }
            let locally_edited = get(local, &path) != get(&self.baseline, &path);
            if locally_edited {
                conflicting.push(path);
            } else {
                let incoming = get(external, &path).cloned().unwrap_or(Value::Null);
                merged = set(merged, &path, incoming);
            }
        }

        if conflicting.is_empty() {
            self.baseline = external.clone();
            return MergeOutcome::Merged(merged);
        }

        tracing::debug!(
            paths = conflicting.len(),
            "external update overlaps local edits"
        );

        let resolution = match &self.on_conflict {
            Some(handler) => handler(local, external),
            // No handler configured: surface the conflict for manual
            // resolution.
            None => ConflictResolution::Defer,
        };

        self.settle(merged, local, external, conflicting, resolution)
    }

    /// Apply a resolution to a previously surfaced conflict.
    ///
    /// Returns the model to adopt, or `None` when the resolution was
    /// [`ConflictResolution::Defer`] (the conflict stays pending).
    pub fn resolve(&mut self, conflict: Conflict, resolution: ConflictResolution) -> Option<Value> {
        // Re-apply the auto-merge half first: non-conflicting external
        // changes always land.
        let mut merged = conflict.local.clone();
        for path in diff_leaf_paths(&conflict.local, &conflict.external) {
            if self.is_preserved(&path) || conflict.diff_paths.contains(&path) {
                continue;
            }
            let incoming = get(&conflict.external, &path).cloned().unwrap_or(Value::Null);
            merged = set(merged, &path, incoming);
        }

        match self.settle(
            merged,
            &conflict.local,
            &conflict.external,
            conflict.diff_paths,
            resolution,
        ) {
            MergeOutcome::Merged(model) => Some(model),
            MergeOutcome::Pending(_) => None,
        }
    }

    fn settle(
        &mut self,
        mut merged: Value,
        local: &Value,
        external: &Value,
        conflicting: Vec<FieldPath>,
        resolution: ConflictResolution,
    ) -> MergeOutcome {
        match resolution {
            ConflictResolution::KeepLocal => {
                self.baseline = external.clone();
                MergeOutcome::Merged(merged)
            }
            ConflictResolution::KeepExternal => {
                for path in &conflicting {
                    let incoming = get(external, path).cloned().unwrap_or(Value::Null);
                    merged = set(merged, path, incoming);
                }
                self.baseline = external.clone();
                MergeOutcome::Merged(merged)
            }
            ConflictResolution::ReplaceWith(model) => {
                self.baseline = external.clone();
                MergeOutcome::Merged(model)
            }
            ConflictResolution::Defer => MergeOutcome::Pending(Conflict {
                local: local.clone(),
                external: external.clone(),
                diff_paths: conflicting,
            }),
        }
    }

    /// Subtree match against the preserve-list, in both directions: an
    /// entry `bio` covers `bio.title`, and an entry `bio.title` covers
    /// a diff reported at `bio`.
    fn is_preserved(&self, path: &FieldPath) -> bool {
        self.preserve
            .iter()
            .any(|entry| path.starts_with(entry) || entry.starts_with(path))
    }

    /// Overwrite the baseline (session reset, model replacement).
    pub fn set_baseline(&mut self, baseline: Value) {
        self.baseline = baseline;
    }

    /// The last externally-synced snapshot.
    pub fn baseline(&self) -> &Value {
        &self.baseline
    }
}
