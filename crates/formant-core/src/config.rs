//! Session configuration.
//!
//! Misconfiguration is an integrator mistake, so it fails loud:
//! [`FormConfig::compile`] rejects malformed preserve-list and
//! debounce-override paths with a [`ConfigError`] instead of degrading
//! silently at runtime.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use formant_types::{ConfigError, FieldPath};

use crate::display::{DisplayMode, WarningVisibility};
use crate::merge::{ConflictHandler, MergeStrategy};
use crate::orchestrator::RootMode;

/// Configuration for a form session.
///
/// Paths are accepted in their public string form and validated when the
/// session is built.
#[derive(Clone, Default)]
pub struct FormConfig {
    /// When field errors become visible.
    pub display_mode: DisplayMode,
    /// When field warnings become visible.
    pub warning_visibility: WarningVisibility,
    /// When cross-field (root) rules are re-evaluated.
    pub root_mode: RootMode,
    /// Default debounce for field validation (none by default).
    pub debounce: Duration,
    /// Per-field debounce overrides, keyed by path string.
    pub debounce_overrides: HashMap<String, Duration>,
    /// How external model updates are reconciled.
    pub merge_strategy: MergeStrategy,
    /// Paths that always keep their local value during smart merges.
    pub preserve_fields: Vec<String>,
    /// Invoked when a smart merge hits conflicting paths.
    pub on_conflict: Option<ConflictHandler>,
}

impl fmt::Debug for FormConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormConfig")
            .field("display_mode", &self.display_mode)
            .field("warning_visibility", &self.warning_visibility)
            .field("root_mode", &self.root_mode)
            .field("debounce", &self.debounce)
            .field("debounce_overrides", &self.debounce_overrides)
            .field("merge_strategy", &self.merge_strategy)
            .field("preserve_fields", &self.preserve_fields)
            .field("has_conflict_handler", &self.on_conflict.is_some())
            .finish()
    }
}

/// Validated configuration with parsed paths.
pub(crate) struct CompiledConfig {
    pub display_mode: DisplayMode,
    pub warning_visibility: WarningVisibility,
    pub root_mode: RootMode,
    pub debounce: Duration,
    pub debounce_overrides: HashMap<FieldPath, Duration>,
    pub merge_strategy: MergeStrategy,
    pub preserve_fields: Vec<FieldPath>,
    pub on_conflict: Option<ConflictHandler>,
}

impl CompiledConfig {
    /// Effective debounce for one field.
    pub fn debounce_for(&self, path: &FieldPath) -> Duration {
        self.debounce_overrides
            .get(path)
            .copied()
            .unwrap_or(self.debounce)
    }
}

impl FormConfig {
    /// Validate and parse. Called by `FormSession::new`.
    pub(crate) fn compile(self) -> Result<CompiledConfig, ConfigError> {
        let mut preserve_fields = Vec::with_capacity(self.preserve_fields.len());
        for raw in &self.preserve_fields {
            let path =
                FieldPath::parse(raw).map_err(|source| ConfigError::InvalidPreservePath {
                    path: raw.clone(),
                    source,
                })?;
            preserve_fields.push(path);
        }

        let mut debounce_overrides = HashMap::with_capacity(self.debounce_overrides.len());
        for (raw, delay) in &self.debounce_overrides {
            let path =
                FieldPath::parse(raw).map_err(|source| ConfigError::InvalidDebouncePath {
                    path: raw.clone(),
                    source,
                })?;
            debounce_overrides.insert(path, *delay);
        }

        Ok(CompiledConfig {
            display_mode: self.display_mode,
            warning_visibility: self.warning_visibility,
            root_mode: self.root_mode,
            debounce: self.debounce,
            debounce_overrides,
            merge_strategy: self.merge_strategy,
            preserve_fields,
            on_conflict: self.on_conflict,
        })
    }
}
