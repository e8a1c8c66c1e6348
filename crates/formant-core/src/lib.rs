//! formant-core: the form-state engine.
//!
//! This crate provides:
//!
//! - **Field registry**: which controls are mounted, and their
//!   touched/dirty interaction flags
//! - **Validation orchestrator**: sequence-numbered, scope-aware merging
//!   of suite results with last-issue-wins race resolution
//! - **Form-state aggregator**: the derived snapshot UI layers bind to
//! - **Error display policy**: when a known error becomes visible
//! - **Smart-state merge**: reconciling local edits with externally
//!   pushed model snapshots
//! - **Session facade**: [`FormSession`], which owns the model and wires
//!   everything together behind a watch-channel subscription
//!
//! The validation suite itself is an injected capability behind the
//! [`ValidationSuite`] trait; formant never looks inside it.

pub mod config;
pub mod display;
pub mod merge;
pub mod orchestrator;
pub mod registry;
pub mod session;
pub mod state;
pub mod suite;

pub use config::FormConfig;
pub use display::{DisplayMode, WarningVisibility};
pub use merge::{Conflict, ConflictResolution, MergeOutcome, MergeStrategy};
pub use orchestrator::{Orchestrator, OrchestratorStats, RootMode};
pub use registry::{FieldKind, FieldRegistry, RegistrationId};
pub use session::FormSession;
pub use state::{FormState, SessionPhase};
pub use suite::{FnSuite, ValidationSuite, suite_fn};

pub use formant_types::{
    ConfigError, FieldPath, MessageSet, PathParseError, PathSegment, ResultKey, ResultMap,
    SuiteResult, ValidationScope, diff_leaf_paths, get, set,
};
