//! The form session — the facade that owns the model and coordinates
//! all core components.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        FormSession                           │
//! │  ┌──────────────┐  ┌───────────────┐  ┌──────────────────┐   │
//! │  │ FieldRegistry │  │ Orchestrator  │  │   MergeEngine    │  │
//! │  │ (touched/dirty)│ │ (results, seq)│  │ (baseline, prefs)│  │
//! │  └──────────────┘  └───────────────┘  └──────────────────┘   │
//! │  ┌──────────────┐  ┌───────────────┐  ┌──────────────────┐   │
//! │  │    Model     │  │ Debounce map  │  │ watch::Sender    │   │
//! │  │ (snapshots)  │  │ (cancellable) │  │ (FormState feed) │   │
//! │  └──────────────┘  └───────────────┘  └──────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Hosts drive the session through a handful of write entry points
//! (value changed, field blurred, submit, external update) and observe
//! it through [`FormSession::state`] or the watch-channel subscription.
//! Every applied mutation publishes a fresh, fully recomputed
//! [`FormState`] snapshot; subscribers never see partial updates.
//!
//! Validation runs execute on spawned tasks, so session methods must be
//! called from within a Tokio runtime.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::sync::{Mutex, RwLock, watch};
use tokio_util::sync::CancellationToken;

use formant_types::{ConfigError, FieldPath, MessageSet, PathParseError, ResultKey};

use crate::config::{CompiledConfig, FormConfig};
use crate::merge::{Conflict, ConflictResolution, MergeEngine, MergeOutcome};
use crate::orchestrator::{Orchestrator, OrchestratorStats, RunTicket};
use crate::registry::{FieldKind, FieldRegistry, RegistrationId};
use crate::state::{FormState, StateInputs};
use crate::suite::ValidationSuite;

/// A live form session. Cheap to clone handles are not provided;
/// share it via the `Arc` your application already holds it in.
pub struct FormSession {
    inner: Arc<Inner>,
}

struct Inner {
    config: CompiledConfig,
    suite: Arc<dyn ValidationSuite>,
    model: RwLock<Value>,
    registry: RwLock<FieldRegistry>,
    orchestrator: Mutex<Orchestrator>,
    merge: Mutex<MergeEngine>,
    conflict: Mutex<Option<Conflict>>,
    /// Open debounce windows, one cancellable token per field path.
    timers: Mutex<HashMap<FieldPath, CancellationToken>>,
    mutated: AtomicBool,
    submitted: AtomicBool,
    state_tx: watch::Sender<FormState>,
}

impl FormSession {
    /// Build a session around an injected suite and an initial model.
    ///
    /// Configuration is validated here and rejected loudly; runtime
    /// data problems never surface as errors after this point.
    pub fn new(
        suite: Arc<dyn ValidationSuite>,
        initial: Value,
        config: FormConfig,
    ) -> Result<Self, ConfigError> {
        let config = config.compile()?;
        let merge = MergeEngine::new(
            config.merge_strategy,
            config.preserve_fields.clone(),
            config.on_conflict.clone(),
            initial.clone(),
        );
        let orchestrator = Orchestrator::new(config.root_mode);

        let first = FormState::compute(StateInputs {
            model: &initial,
            results: orchestrator.map(),
            pending: false,
            timers_open: false,
            dirty: false,
            mutated: false,
            submitted: false,
            conflict_pending: false,
        });
        let (state_tx, _) = watch::channel(first);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                suite,
                model: RwLock::new(initial),
                registry: RwLock::new(FieldRegistry::new()),
                orchestrator: Mutex::new(orchestrator),
                merge: Mutex::new(merge),
                conflict: Mutex::new(None),
                timers: Mutex::new(HashMap::new()),
                mutated: AtomicBool::new(false),
                submitted: AtomicBool::new(false),
                state_tx,
            }),
        })
    }

    /// Register a mounted control. Triggers no validation.
    ///
    /// The path string comes from host wiring, so a parse failure is a
    /// programming mistake and is returned rather than swallowed.
    pub async fn register(
        &self,
        path: &str,
        kind: FieldKind,
    ) -> Result<RegistrationId, PathParseError> {
        let path = FieldPath::parse(path)?;
        Ok(self.inner.registry.write().await.register(path, kind))
    }

    /// Remove a registration when its control unmounts.
    pub async fn unregister(&self, id: RegistrationId) -> bool {
        self.inner.registry.write().await.unregister(id)
    }

    /// Write entry point: field `path` changed to `value`.
    ///
    /// Marks the field dirty, writes the model (value semantics), and
    /// schedules a field-scoped validation run — debounced when
    /// configured. A malformed path string is recovered locally: the
    /// call becomes a no-op.
    pub async fn set_value(&self, path: &str, value: Value) {
        let Ok(path) = FieldPath::parse(path) else {
            tracing::warn!(path, "ignoring value change for malformed field path");
            return;
        };

        self.inner.registry.write().await.mark_dirty_at(&path);
        {
            let mut model = self.inner.model.write().await;
            let current = std::mem::take(&mut *model);
            *model = formant_types::set(current, &path, value);
        }
        self.inner.mutated.store(true, Ordering::SeqCst);

        Inner::schedule_field_run(&self.inner, path).await;
        self.inner.publish().await;
    }

    /// Write entry point: field `path` was blurred.
    ///
    /// Latches the touched flag and re-validates the field, since
    /// blur-time is when touch-gated errors first become visible.
    pub async fn touch(&self, path: &str) {
        let Ok(path) = FieldPath::parse(path) else {
            tracing::warn!(path, "ignoring touch for malformed field path");
            return;
        };

        self.inner.registry.write().await.mark_touched_at(&path);
        Inner::schedule_field_run(&self.inner, path).await;
        self.inner.publish().await;
    }

    /// Run the initial full validation pass (typically once, after the
    /// form mounts) and return the settled state.
    pub async fn mount(&self) -> FormState {
        self.full_run().await
    }

    /// Write entry point: submit attempted.
    ///
    /// Latches the submitted flag, awaits a full-suite run, and returns
    /// the resulting state so callers can branch on `valid`.
    pub async fn submit(&self) -> FormState {
        self.inner.submitted.store(true, Ordering::SeqCst);
        self.full_run().await
    }

    async fn full_run(&self) -> FormState {
        let ticket = self.inner.orchestrator.lock().await.begin_full();
        let snapshot = self.inner.model.read().await.clone();
        self.inner.publish().await;
        Inner::run_and_apply(&self.inner, ticket, snapshot).await;
        self.inner.publish().await
    }

    /// Reset the session to pristine.
    ///
    /// Interaction flags, results, pending runs, the submitted flag,
    /// and any open conflict are cleared; registrations survive, so
    /// controls do not remount. `model` replaces the current value when
    /// given, and the merge baseline re-anchors either way.
    pub async fn reset(&self, model: Option<Value>) {
        for (_, token) in self.inner.timers.lock().await.drain() {
            token.cancel();
        }
        self.inner.registry.write().await.reset();
        self.inner.orchestrator.lock().await.reset();
        *self.inner.conflict.lock().await = None;
        self.inner.mutated.store(false, Ordering::SeqCst);
        self.inner.submitted.store(false, Ordering::SeqCst);

        let current = {
            let mut guard = self.inner.model.write().await;
            if let Some(model) = model {
                *guard = model;
            }
            guard.clone()
        };
        self.inner.merge.lock().await.set_baseline(current);

        self.inner.publish().await;
    }

    /// Replace the whole model programmatically.
    ///
    /// Counts as a mutation; schedules a full validation run and
    /// re-anchors the merge baseline (a programmatic replace is a sync,
    /// not a local edit).
    pub async fn replace_model(&self, model: Value) {
        *self.inner.model.write().await = model.clone();
        self.inner.merge.lock().await.set_baseline(model.clone());
        self.inner.mutated.store(true, Ordering::SeqCst);

        let ticket = self.inner.orchestrator.lock().await.begin_full();
        self.inner.publish().await;
        Inner::spawn_run(&self.inner, ticket, model);
    }

    /// An external model snapshot arrived.
    ///
    /// Runs the merge engine: an auto-merge adopts the merged model and
    /// schedules a full validation; an unresolved overlap parks as a
    /// pending conflict until [`FormSession::resolve_conflict`].
    pub async fn external_update(&self, external: Value) -> MergeOutcome {
        let local = self.inner.model.read().await.clone();
        let outcome = self.inner.merge.lock().await.merge(&local, &external);

        match &outcome {
            MergeOutcome::Merged(model) => {
                self.adopt_merged(model.clone()).await;
            }
            MergeOutcome::Pending(conflict) => {
                *self.inner.conflict.lock().await = Some(conflict.clone());
                self.inner.publish().await;
            }
        }
        outcome
    }

    /// Resolve a pending smart-state conflict.
    ///
    /// Returns true when a model was adopted. `Defer` keeps the
    /// conflict pending and returns false, as does resolving when no
    /// conflict exists.
    pub async fn resolve_conflict(&self, resolution: ConflictResolution) -> bool {
        let Some(conflict) = self.inner.conflict.lock().await.take() else {
            tracing::warn!("resolve_conflict called with no pending conflict");
            return false;
        };

        let resolved = self
            .inner
            .merge
            .lock()
            .await
            .resolve(conflict.clone(), resolution);
        match resolved {
            Some(model) => {
                self.adopt_merged(model).await;
                true
            }
            None => {
                *self.inner.conflict.lock().await = Some(conflict);
                self.inner.publish().await;
                false
            }
        }
    }

    async fn adopt_merged(&self, model: Value) {
        *self.inner.model.write().await = model.clone();
        self.inner.mutated.store(true, Ordering::SeqCst);
        *self.inner.conflict.lock().await = None;

        let ticket = self.inner.orchestrator.lock().await.begin_full();
        self.inner.publish().await;
        Inner::spawn_run(&self.inner, ticket, model);
    }

    /// The pending conflict, if any.
    pub async fn pending_conflict(&self) -> Option<Conflict> {
        self.inner.conflict.lock().await.clone()
    }

    /// A fresh, fully recomputed state snapshot.
    pub async fn state(&self) -> FormState {
        self.inner.snapshot().await
    }

    /// Subscribe to state snapshots. The receiver always holds the
    /// latest published state.
    pub fn subscribe(&self) -> watch::Receiver<FormState> {
        self.inner.state_tx.subscribe()
    }

    /// Whether `path`'s errors should currently be visible.
    pub async fn should_show_errors(&self, path: &str) -> bool {
        let Ok(path) = FieldPath::parse(path) else {
            return false;
        };
        let has_entry = {
            let orch = self.inner.orchestrator.lock().await;
            orch.map()
                .get(&ResultKey::Field(path.clone()))
                .is_some_and(MessageSet::has_errors)
        };
        let touched = self.inner.registry.read().await.is_touched(&path);
        self.inner.config.display_mode.should_show_errors(
            touched,
            self.inner.submitted.load(Ordering::SeqCst),
            has_entry,
        )
    }

    /// Whether `path`'s warnings should currently be visible.
    pub async fn should_show_warnings(&self, path: &str) -> bool {
        let Ok(path) = FieldPath::parse(path) else {
            return false;
        };
        let has_entry = {
            let orch = self.inner.orchestrator.lock().await;
            orch.map()
                .get(&ResultKey::Field(path.clone()))
                .is_some_and(MessageSet::has_warnings)
        };
        let dirty = self.inner.registry.read().await.is_dirty(&path);
        self.inner
            .config
            .warning_visibility
            .should_show_warnings(dirty, has_entry)
    }

    /// Field errors filtered through the display policy.
    pub async fn visible_errors(&self) -> BTreeMap<String, Vec<String>> {
        let entries: Vec<(FieldPath, Vec<String>)> = {
            let orch = self.inner.orchestrator.lock().await;
            orch.map()
                .iter()
                .filter_map(|(key, messages)| match key {
                    ResultKey::Field(path) if messages.has_errors() => {
                        Some((path.clone(), messages.errors.clone()))
                    }
                    _ => None,
                })
                .collect()
        };

        let registry = self.inner.registry.read().await;
        let submitted = self.inner.submitted.load(Ordering::SeqCst);
        entries
            .into_iter()
            .filter(|(path, _)| {
                self.inner
                    .config
                    .display_mode
                    .should_show_errors(registry.is_touched(path), submitted, true)
            })
            .map(|(path, errors)| (path.to_string(), errors))
            .collect()
    }

    /// Field warnings filtered through the warning policy.
    pub async fn visible_warnings(&self) -> BTreeMap<String, Vec<String>> {
        let entries: Vec<(FieldPath, Vec<String>)> = {
            let orch = self.inner.orchestrator.lock().await;
            orch.map()
                .iter()
                .filter_map(|(key, messages)| match key {
                    ResultKey::Field(path) if messages.has_warnings() => {
                        Some((path.clone(), messages.warnings.clone()))
                    }
                    _ => None,
                })
                .collect()
        };

        let registry = self.inner.registry.read().await;
        entries
            .into_iter()
            .filter(|(path, _)| {
                self.inner
                    .config
                    .warning_visibility
                    .should_show_warnings(registry.is_dirty(path), true)
            })
            .map(|(path, warnings)| (path.to_string(), warnings))
            .collect()
    }

    /// Root (cross-field) messages filtered through the display policy.
    ///
    /// Root rules have no single field to be "touched", so touch-gated
    /// modes show them once every registered field is touched — which
    /// submit implies.
    pub async fn visible_root(&self) -> MessageSet {
        let root = {
            let orch = self.inner.orchestrator.lock().await;
            orch.map().root()
        };
        let all_touched = self.inner.registry.read().await.all_touched();
        let submitted = self.inner.submitted.load(Ordering::SeqCst);

        let errors = if self.inner.config.display_mode.should_show_errors(
            all_touched,
            submitted,
            root.has_errors(),
        ) {
            root.errors.clone()
        } else {
            Vec::new()
        };
        let warnings = if self
            .inner
            .config
            .warning_visibility
            .should_show_warnings(true, root.has_warnings())
        {
            root.warnings.clone()
        } else {
            Vec::new()
        };
        MessageSet { errors, warnings }
    }

    /// Interaction query: has `path` been touched?
    pub async fn is_touched(&self, path: &str) -> bool {
        match FieldPath::parse(path) {
            Ok(path) => self.inner.registry.read().await.is_touched(&path),
            Err(_) => false,
        }
    }

    /// Interaction query: has `path` been edited?
    pub async fn is_dirty(&self, path: &str) -> bool {
        match FieldPath::parse(path) {
            Ok(path) => self.inner.registry.read().await.is_dirty(&path),
            Err(_) => false,
        }
    }

    /// Orchestrator counter snapshot.
    pub async fn stats(&self) -> OrchestratorStats {
        self.inner.orchestrator.lock().await.stats()
    }
}

impl Inner {
    /// Schedule a field-scoped run, honoring the configured debounce.
    async fn schedule_field_run(inner: &Arc<Inner>, path: FieldPath) {
        let delay = inner.config.debounce_for(&path);
        if delay.is_zero() {
            let ticket = inner.orchestrator.lock().await.begin_field(path);
            let snapshot = inner.model.read().await.clone();
            Inner::spawn_run(inner, ticket, snapshot);
            return;
        }

        let token = CancellationToken::new();
        {
            let mut timers = inner.timers.lock().await;
            if let Some(previous) = timers.insert(path.clone(), token.clone()) {
                previous.cancel();
                tracing::debug!(path = %path, "debounce restarted; previous timer cancelled");
            }
        }

        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            {
                // A newer edit may have raced the wakeup; its token
                // replaced ours and cancelled it.
                let mut timers = inner.timers.lock().await;
                if token.is_cancelled() {
                    return;
                }
                timers.remove(&path);
            }
            // Snapshot at fire time: only the final value within the
            // debounce window is validated.
            let ticket = inner.orchestrator.lock().await.begin_field(path);
            let snapshot = inner.model.read().await.clone();
            inner.publish().await;
            Inner::run_and_apply(&inner, ticket, snapshot).await;
            inner.publish().await;
        });
    }

    /// Run a ticket on a background task.
    fn spawn_run(inner: &Arc<Inner>, ticket: RunTicket, snapshot: Value) {
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            Inner::run_and_apply(&inner, ticket, snapshot).await;
            inner.publish().await;
        });
    }

    /// Invoke the suite against the snapshot the run was issued with
    /// and merge its outcome.
    async fn run_and_apply(inner: &Arc<Inner>, ticket: RunTicket, snapshot: Value) {
        let scope = ticket.scope().clone();
        let outcome = inner.suite.run(&snapshot, scope).await;
        inner.orchestrator.lock().await.apply(ticket, outcome);
    }

    /// Recompute the current snapshot without publishing.
    async fn snapshot(&self) -> FormState {
        let model = self.model.read().await.clone();
        let (results, pending) = {
            let orch = self.orchestrator.lock().await;
            (orch.map().clone(), orch.pending())
        };
        let dirty = self.registry.read().await.any_dirty();
        let timers_open = !self.timers.lock().await.is_empty();
        let conflict_pending = self.conflict.lock().await.is_some();

        FormState::compute(StateInputs {
            model: &model,
            results: &results,
            pending,
            timers_open,
            dirty,
            mutated: self.mutated.load(Ordering::SeqCst),
            submitted: self.submitted.load(Ordering::SeqCst),
            conflict_pending,
        })
    }

    /// Recompute and publish a snapshot; returns what was published.
    async fn publish(&self) -> FormState {
        let state = self.snapshot().await;
        self.state_tx.send_replace(state.clone());
        tracing::trace!(
            valid = state.valid,
            pending = state.pending,
            phase = ?state.phase,
            "published form state"
        );
        state
    }
}
