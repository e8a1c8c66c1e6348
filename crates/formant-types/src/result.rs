//! Message sets and the canonical validation result map.
//!
//! The [`ResultMap`] is the single merged view of everything the
//! validation suite has reported so far. Its key invariant: an entry
//! exists only while it carries at least one message, so "no entry"
//! always means "no errors and no warnings for that path".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::path::FieldPath;

/// Errors and warnings for a single field (or the form root).
///
/// Errors block validity; warnings never do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSet {
    /// Blocking messages.
    pub errors: Vec<String>,
    /// Informational messages.
    pub warnings: Vec<String>,
}

impl MessageSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an error, builder style.
    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.errors.push(message.into());
        self
    }

    /// Append a warning, builder style.
    pub fn warning(mut self, message: impl Into<String>) -> Self {
        self.warnings.push(message.into());
        self
    }

    /// True when there are no messages at all.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// True when at least one error is present.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// True when at least one warning is present.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Key into the result map: a concrete field, or the reserved root slot
/// for cross-field rules.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResultKey {
    /// Whole-form (cross-field) messages.
    Root,
    /// Messages for one field path.
    Field(FieldPath),
}

impl ResultKey {
    /// The field path, if this is a field key.
    pub fn as_field(&self) -> Option<&FieldPath> {
        match self {
            ResultKey::Root => None,
            ResultKey::Field(path) => Some(path),
        }
    }
}

impl From<FieldPath> for ResultKey {
    fn from(path: FieldPath) -> Self {
        ResultKey::Field(path)
    }
}

/// The merged per-path validation state.
///
/// Produced incrementally: each suite run replaces exactly the entries
/// for the keys that were in scope for that run and leaves everything
/// else untouched, which is what makes single-field runs cheap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultMap {
    entries: BTreeMap<ResultKey, MessageSet>,
}

impl ResultMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entry for `key`.
    ///
    /// An empty message set removes the entry, preserving the invariant
    /// that present keys carry at least one message.
    pub fn put(&mut self, key: ResultKey, messages: MessageSet) {
        if messages.is_empty() {
            self.entries.remove(&key);
        } else {
            self.entries.insert(key, messages);
        }
    }

    /// Remove the entry for `key`.
    pub fn remove(&mut self, key: &ResultKey) {
        self.entries.remove(key);
    }

    /// The messages for `key`, if any.
    pub fn get(&self, key: &ResultKey) -> Option<&MessageSet> {
        self.entries.get(key)
    }

    /// True if `key` currently has any messages.
    pub fn has_entry(&self, key: &ResultKey) -> bool {
        self.entries.contains_key(key)
    }

    /// The root message set (empty if absent).
    pub fn root(&self) -> MessageSet {
        self.entries.get(&ResultKey::Root).cloned().unwrap_or_default()
    }

    /// True iff no key, root included, carries an error.
    ///
    /// Warning-only entries do not affect validity.
    pub fn valid(&self) -> bool {
        self.entries.values().all(|set| !set.has_errors())
    }

    /// Iterate all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ResultKey, &MessageSet)> {
        self.entries.iter()
    }

    /// All keys currently present, cloned.
    ///
    /// Used by full-scope merges that must also clear stale entries.
    pub fn keys(&self) -> Vec<ResultKey> {
        self.entries.keys().cloned().collect()
    }

    /// Number of keyed entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries exist.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
