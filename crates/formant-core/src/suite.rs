//! The validation-suite call contract.
//!
//! A suite is any pure async callable from `(model, scope)` to a
//! [`SuiteResult`]. The engine does not know how rules are declared or
//! scoped internally; it only relies on the scoping contract described
//! in `formant-types::suite`. Suites that fail (return `Err`) are
//! handled fail-open by the orchestrator — a broken rule must not make
//! the form unusable.

use std::future::Future;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use formant_types::{SuiteResult, ValidationScope};

/// An injected validation suite.
///
/// Implementations must be deterministic in which fields they populate
/// for a given scope, and must not assume they can be aborted — the
/// orchestrator discards superseded results instead of cancelling calls.
#[async_trait]
pub trait ValidationSuite: Send + Sync {
    /// Run the suite against a model snapshot.
    ///
    /// `ValidationScope::Full` validates every declared rule;
    /// `ValidationScope::Field(path)` must skip rules for unrelated
    /// fields. Cross-field rules report through the result's root set.
    async fn run(&self, model: &Value, scope: ValidationScope) -> Result<SuiteResult>;
}

/// Adapter turning a plain async closure into a [`ValidationSuite`].
///
/// The closure receives an owned model snapshot so its future can be
/// `'static`.
pub struct FnSuite<F> {
    f: F,
}

/// Wrap a closure as a suite.
///
/// ```ignore
/// let suite = suite_fn(|model: Value, scope| async move {
///     let mut result = SuiteResult::new();
///     // ... inspect model, honor scope ...
///     Ok(result)
/// });
/// ```
pub fn suite_fn<F, Fut>(f: F) -> FnSuite<F>
where
    F: Fn(Value, ValidationScope) -> Fut + Send + Sync,
    Fut: Future<Output = Result<SuiteResult>> + Send,
{
    FnSuite { f }
}

#[async_trait]
impl<F, Fut> ValidationSuite for FnSuite<F>
where
    F: Fn(Value, ValidationScope) -> Fut + Send + Sync,
    Fut: Future<Output = Result<SuiteResult>> + Send,
{
    async fn run(&self, model: &Value, scope: ValidationScope) -> Result<SuiteResult> {
        (self.f)(model.clone(), scope).await
    }
}
