//! Validation orchestration: scoping, sequencing, and result merging.
//!
//! The orchestrator is a synchronous state machine; the async work
//! (debounce timers, suite calls) happens in the session layer, which
//! brackets each call with [`Orchestrator::begin_field`] /
//! [`Orchestrator::begin_full`] and [`Orchestrator::apply`].
//!
//! Race policy ("last issue wins"): every run gets a sequence number
//! from one monotone counter, and a completed run's messages are applied
//! per key only if no newer run covering that key has been issued since.
//! Full runs sit in a higher-priority tier — a full run supersedes every
//! earlier field run, while a field run issued after it reclaims only
//! its own key. There is no true cancellation: the suite contract has no
//! abort signal, so superseded results are simply discarded.
//!
//! Failure policy (fail-open): a suite that throws produces zero
//! messages for its scope, and the previous entries for that scope are
//! left as-is rather than cleared, so a broken rule neither crashes the
//! form nor flashes it valid. The condition is logged and counted.

use std::collections::HashMap;

use formant_types::{FieldPath, MessageSet, ResultKey, ResultMap, SuiteResult, ValidationScope};

/// When cross-field (root) rules are re-evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RootMode {
    /// Re-run root rules on every field run.
    #[default]
    Live,
    /// Run root rules only at full (submit-time) runs.
    Submit,
}

impl std::str::FromStr for RootMode {
    type Err = formant_types::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(RootMode::Live),
            "submit" => Ok(RootMode::Submit),
            other => Err(formant_types::ConfigError::UnknownRootMode(
                other.to_string(),
            )),
        }
    }
}

/// Counters for observability. Snapshot via [`Orchestrator::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrchestratorStats {
    /// Runs issued (field and full).
    pub runs_started: u64,
    /// Per-key results applied to the map.
    pub results_applied: u64,
    /// Per-key results discarded as superseded.
    pub results_discarded: u64,
    /// Suite calls that returned an error (fail-open).
    pub suite_failures: u64,
}

/// Handle for one issued run; pass back to [`Orchestrator::apply`].
#[derive(Debug, Clone)]
pub struct RunTicket {
    seq: u64,
    scope: ValidationScope,
    keys: Vec<ResultKey>,
}

impl RunTicket {
    /// The scope this run was issued with.
    pub fn scope(&self) -> &ValidationScope {
        &self.scope
    }
}

/// Merges sequence-numbered suite results into one canonical result map.
#[derive(Debug, Default)]
pub struct Orchestrator {
    root_mode: RootMode,
    map: ResultMap,
    /// Newest sequence issued per key (field-run tier).
    issued: HashMap<ResultKey, u64>,
    /// Newest full-run sequence (covers every key).
    issued_full: u64,
    /// Keys with an in-flight run: key -> newest pending sequence.
    pending: HashMap<ResultKey, u64>,
    /// Runs issued at or before the fence are void (set by reset).
    fence: u64,
    seq: u64,
    stats: OrchestratorStats,
}

impl Orchestrator {
    /// Create an orchestrator with the given root-validation mode.
    pub fn new(root_mode: RootMode) -> Self {
        Self {
            root_mode,
            ..Self::default()
        }
    }

    /// Issue a single-field run for `path`.
    ///
    /// Covers the field's key, plus root when root validation is live.
    pub fn begin_field(&mut self, path: FieldPath) -> RunTicket {
        self.seq += 1;
        let mut keys = vec![ResultKey::Field(path.clone())];
        if self.root_mode == RootMode::Live {
            keys.push(ResultKey::Root);
        }
        for key in &keys {
            self.issued.insert(key.clone(), self.seq);
            self.pending.insert(key.clone(), self.seq);
        }
        self.stats.runs_started += 1;
        RunTicket {
            seq: self.seq,
            scope: ValidationScope::Field(path),
            keys,
        }
    }

    /// Issue a full-suite run (submit, initial mount, merged external
    /// update).
    ///
    /// The whole form is represented in the pending set by the root key.
    pub fn begin_full(&mut self) -> RunTicket {
        self.seq += 1;
        self.issued_full = self.seq;
        self.pending.insert(ResultKey::Root, self.seq);
        self.stats.runs_started += 1;
        RunTicket {
            seq: self.seq,
            scope: ValidationScope::Full,
            keys: vec![ResultKey::Root],
        }
    }

    /// Apply a completed run's outcome.
    ///
    /// Superseded results are discarded per key; suite failures are
    /// fail-open (prior entries retained).
    pub fn apply(&mut self, ticket: RunTicket, outcome: anyhow::Result<SuiteResult>) {
        for key in &ticket.keys {
            if self.pending.get(key) == Some(&ticket.seq) {
                self.pending.remove(key);
            }
        }

        let result = match outcome {
            Ok(result) => result,
            Err(error) => {
                self.stats.suite_failures += 1;
                tracing::warn!(
                    scope = ?ticket.scope,
                    %error,
                    "validation suite failed; run treated as fail-open"
                );
                return;
            }
        };

        if ticket.seq <= self.fence {
            self.stats.results_discarded += 1;
            tracing::debug!(scope = ?ticket.scope, "discarding result from before reset");
            return;
        }

        match &ticket.scope {
            ValidationScope::Field(path) => {
                for key in &ticket.keys {
                    if ticket.seq >= self.effective_issued(key) {
                        let messages = match key {
                            ResultKey::Field(_) => result.field_messages(path),
                            ResultKey::Root => result.root().clone(),
                        };
                        self.map.put(key.clone(), messages);
                        self.stats.results_applied += 1;
                    } else {
                        self.stats.results_discarded += 1;
                        tracing::debug!(key = ?key, seq = ticket.seq, "discarding superseded field result");
                    }
                }
            }
            ValidationScope::Full => {
                // A full run speaks for every key: stale entries absent
                // from the result are cleared, unless a newer run owns
                // the key.
                let mut keys = self.map.keys();
                keys.extend(
                    result
                        .fields()
                        .keys()
                        .cloned()
                        .map(ResultKey::Field),
                );
                keys.push(ResultKey::Root);
                keys.sort();
                keys.dedup();

                for key in keys {
                    if ticket.seq >= self.effective_issued(&key) {
                        let messages = match &key {
                            ResultKey::Field(path) => result.field_messages(path),
                            ResultKey::Root => result.root().clone(),
                        };
                        self.map.put(key, messages);
                        self.stats.results_applied += 1;
                    } else {
                        self.stats.results_discarded += 1;
                        tracing::debug!(key = ?key, seq = ticket.seq, "discarding superseded full-run result");
                    }
                }
            }
        }
    }

    /// Newest issue covering `key`, across both tiers.
    fn effective_issued(&self, key: &ResultKey) -> u64 {
        self.issued
            .get(key)
            .copied()
            .unwrap_or(0)
            .max(self.issued_full)
    }

    /// The merged result map.
    pub fn map(&self) -> &ResultMap {
        &self.map
    }

    /// The current messages for a key (empty if none).
    pub fn messages(&self, key: &ResultKey) -> MessageSet {
        self.map.get(key).cloned().unwrap_or_default()
    }

    /// True while any run is in flight.
    pub fn pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Keys with in-flight runs, sorted.
    pub fn pending_keys(&self) -> Vec<ResultKey> {
        let mut keys: Vec<_> = self.pending.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// True iff the map carries no errors anywhere (root included).
    pub fn valid(&self) -> bool {
        self.map.valid()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> OrchestratorStats {
        self.stats
    }

    /// Drop all results and pending state.
    ///
    /// In-flight runs issued before the reset are fenced off: their
    /// results will be discarded when they land.
    pub fn reset(&mut self) {
        self.map.clear();
        self.issued.clear();
        self.issued_full = 0;
        self.pending.clear();
        self.fence = self.seq;
    }
}
