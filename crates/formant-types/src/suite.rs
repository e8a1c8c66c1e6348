//! Data half of the validation-suite contract.
//!
//! A suite is an opaque callable the host supplies (the async trait
//! lives in `formant-core`). These types define what it is called with
//! and what it returns. The orchestrator trusts the scoping contract:
//! a run scoped to one field must only report for that field (and the
//! root), and repeated calls with the same `(model, scope)` must
//! populate the same keys.

use std::collections::BTreeMap;

use crate::path::FieldPath;
use crate::result::MessageSet;

/// The subset of fields a validation run may update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationScope {
    /// Validate every declared rule (submit, initial mount).
    Full,
    /// Validate only the rules for one changed field.
    Field(FieldPath),
}

impl ValidationScope {
    /// The scoped field path, if single-field.
    pub fn field(&self) -> Option<&FieldPath> {
        match self {
            ValidationScope::Full => None,
            ValidationScope::Field(path) => Some(path),
        }
    }

    /// True for whole-form scope.
    pub fn is_full(&self) -> bool {
        matches!(self, ValidationScope::Full)
    }
}

/// What one suite run reported: per-field message sets plus the root
/// (cross-field) set.
///
/// Absence of a field key means the run found nothing wrong with the
/// fields it was scoped to — it does not speak for out-of-scope fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuiteResult {
    fields: BTreeMap<FieldPath, MessageSet>,
    root: MessageSet,
}

impl SuiteResult {
    /// A result with no messages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field error, builder style.
    pub fn error(mut self, path: FieldPath, message: impl Into<String>) -> Self {
        self.fields.entry(path).or_default().errors.push(message.into());
        self
    }

    /// Add a field warning, builder style.
    pub fn warning(mut self, path: FieldPath, message: impl Into<String>) -> Self {
        self.fields
            .entry(path)
            .or_default()
            .warnings
            .push(message.into());
        self
    }

    /// Add a cross-field (root) error, builder style.
    pub fn root_error(mut self, message: impl Into<String>) -> Self {
        self.root.errors.push(message.into());
        self
    }

    /// Add a cross-field (root) warning, builder style.
    pub fn root_warning(mut self, message: impl Into<String>) -> Self {
        self.root.warnings.push(message.into());
        self
    }

    /// Per-field message sets.
    pub fn fields(&self) -> &BTreeMap<FieldPath, MessageSet> {
        &self.fields
    }

    /// The messages reported for one field (empty if none).
    pub fn field_messages(&self, path: &FieldPath) -> MessageSet {
        self.fields.get(path).cloned().unwrap_or_default()
    }

    /// The root message set.
    pub fn root(&self) -> &MessageSet {
        &self.root
    }

    /// Overall validity flag: no errors on any field and none at root.
    pub fn valid(&self) -> bool {
        !self.root.has_errors() && self.fields.values().all(|set| !set.has_errors())
    }
}
