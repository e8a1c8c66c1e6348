//! formant-types: Pure data types for the formant form-state engine.
//!
//! This crate provides:
//!
//! - **Field paths**: typed addresses into nested models (`a.b[0].c`),
//!   with lossless get/set/diff over `serde_json::Value`
//! - **Message sets**: per-field error and warning lists
//! - **Result maps**: the canonical merged validation state
//! - **Suite types**: the data half of the validation-suite contract
//!
//! Everything here is synchronous and framework-agnostic. The engine that
//! drives these types lives in `formant-core`.

pub mod error;
pub mod path;
pub mod result;
pub mod suite;

pub use error::{ConfigError, PathParseError};
pub use path::{FieldPath, PathSegment, diff_leaf_paths, get, set};
pub use result::{MessageSet, ResultKey, ResultMap};
pub use suite::{SuiteResult, ValidationScope};
