//! Integration tests for smart-state reconciliation through the
//! session: auto-merge, preserve-lists, and pending conflicts.

use std::sync::Arc;

use serde_json::{Value, json};

use formant_core::{
    ConflictResolution, FormConfig, FormSession, FormState, MergeOutcome, MergeStrategy,
    SuiteResult, ValidationScope, ValidationSuite, suite_fn,
};

/// Wait until no validation run is in flight, then return the state.
async fn settled_state(session: &FormSession) -> FormState {
    let mut rx = session.subscribe();
    loop {
        let state = session.state().await;
        if !state.pending {
            return state;
        }
        rx.changed().await.expect("session is alive");
    }
}

/// A suite that accepts everything; merge tests care about the model.
fn permissive_suite() -> Arc<dyn ValidationSuite> {
    Arc::new(suite_fn(|_model: Value, _scope: ValidationScope| async move {
        Ok(SuiteResult::new())
    }))
}

fn profile_session(config: FormConfig) -> FormSession {
    FormSession::new(
        permissive_suite(),
        json!({"bio": "original bio", "email": "old@x.io"}),
        config,
    )
    .expect("config is valid")
}

// ============================================================================
// Scenario: preserve-list keeps local edits, adopts the rest
// ============================================================================

#[tokio::test]
async fn preserved_local_edit_survives_an_external_push() {
    let config = FormConfig {
        preserve_fields: vec!["bio".into()],
        ..FormConfig::default()
    };
    let session = profile_session(config);

    // Local edit to bio only; email untouched.
    session.set_value("bio", json!("my edited bio")).await;
    let _ = settled_state(&session).await;

    // External push changes both fields.
    let outcome = session
        .external_update(json!({"bio": "server bio", "email": "new@x.io"}))
        .await;

    assert_eq!(
        outcome,
        MergeOutcome::Merged(json!({"bio": "my edited bio", "email": "new@x.io"})),
        "local bio kept, external email adopted, no conflict"
    );
    let state = settled_state(&session).await;
    assert!(!state.conflict_pending);
    assert_eq!(state.value["bio"], json!("my edited bio"));
    assert_eq!(state.value["email"], json!("new@x.io"));
}

#[tokio::test]
async fn untouched_external_changes_apply_automatically() {
    let session = profile_session(FormConfig::default());

    let outcome = session
        .external_update(json!({"bio": "original bio", "email": "new@x.io"}))
        .await;

    assert!(matches!(outcome, MergeOutcome::Merged(_)));
    let state = settled_state(&session).await;
    assert_eq!(state.value["email"], json!("new@x.io"));
}

// ============================================================================
// Conflicts
// ============================================================================

#[tokio::test]
async fn overlapping_edit_parks_as_a_pending_conflict() {
    let session = profile_session(FormConfig::default());

    session.set_value("email", json!("mine@x.io")).await;
    let _ = settled_state(&session).await;

    let outcome = session
        .external_update(json!({"bio": "original bio", "email": "theirs@x.io"}))
        .await;

    let MergeOutcome::Pending(conflict) = outcome else {
        panic!("expected a pending conflict");
    };
    assert_eq!(conflict.diff_paths.len(), 1);
    assert_eq!(conflict.diff_paths[0].to_string(), "email");

    let state = session.state().await;
    assert!(state.conflict_pending);
    // The model is untouched while the conflict is unresolved.
    assert_eq!(state.value["email"], json!("mine@x.io"));
    assert!(session.pending_conflict().await.is_some());
}

#[tokio::test]
async fn resolving_keep_external_adopts_their_values() {
    let session = profile_session(FormConfig::default());

    session.set_value("email", json!("mine@x.io")).await;
    let _ = settled_state(&session).await;
    let _ = session
        .external_update(json!({"bio": "server bio", "email": "theirs@x.io"}))
        .await;
    assert!(session.state().await.conflict_pending);

    assert!(
        session
            .resolve_conflict(ConflictResolution::KeepExternal)
            .await
    );
    let state = settled_state(&session).await;
    assert!(!state.conflict_pending);
    assert_eq!(state.value["email"], json!("theirs@x.io"));
    // The non-conflicting bio change still lands.
    assert_eq!(state.value["bio"], json!("server bio"));
}

#[tokio::test]
async fn resolving_keep_local_still_applies_the_rest() {
    let session = profile_session(FormConfig::default());

    session.set_value("email", json!("mine@x.io")).await;
    let _ = settled_state(&session).await;
    let _ = session
        .external_update(json!({"bio": "server bio", "email": "theirs@x.io"}))
        .await;

    assert!(session.resolve_conflict(ConflictResolution::KeepLocal).await);
    let state = settled_state(&session).await;
    assert_eq!(state.value["email"], json!("mine@x.io"));
    assert_eq!(state.value["bio"], json!("server bio"));
}

#[tokio::test]
async fn deferring_keeps_the_conflict_pending() {
    let session = profile_session(FormConfig::default());

    session.set_value("email", json!("mine@x.io")).await;
    let _ = settled_state(&session).await;
    let _ = session
        .external_update(json!({"bio": "original bio", "email": "theirs@x.io"}))
        .await;

    assert!(!session.resolve_conflict(ConflictResolution::Defer).await);
    assert!(session.state().await.conflict_pending);

    // A real resolution afterwards still works.
    assert!(
        session
            .resolve_conflict(ConflictResolution::ReplaceWith(
                json!({"bio": "original bio", "email": "merged@x.io"})
            ))
            .await
    );
    let state = settled_state(&session).await;
    assert_eq!(state.value["email"], json!("merged@x.io"));
}

#[tokio::test]
async fn resolve_without_a_conflict_is_a_noop() {
    let session = profile_session(FormConfig::default());
    assert!(!session.resolve_conflict(ConflictResolution::KeepLocal).await);
}

#[tokio::test]
async fn conflict_handler_auto_resolves_inline() {
    let config = FormConfig {
        on_conflict: Some(Arc::new(|_local: &Value, external: &Value| {
            ConflictResolution::ReplaceWith(external.clone())
        })),
        ..FormConfig::default()
    };
    let session = profile_session(config);

    session.set_value("email", json!("mine@x.io")).await;
    let _ = settled_state(&session).await;

    let outcome = session
        .external_update(json!({"bio": "original bio", "email": "theirs@x.io"}))
        .await;
    assert!(matches!(outcome, MergeOutcome::Merged(_)));
    let state = settled_state(&session).await;
    assert!(!state.conflict_pending);
    assert_eq!(state.value["email"], json!("theirs@x.io"));
}

// ============================================================================
// Wholesale strategies
// ============================================================================

#[tokio::test]
async fn prefer_local_drops_external_changes() {
    let config = FormConfig {
        merge_strategy: MergeStrategy::PreferLocal,
        ..FormConfig::default()
    };
    let session = profile_session(config);

    session.set_value("email", json!("mine@x.io")).await;
    let _ = settled_state(&session).await;
    let _ = session
        .external_update(json!({"bio": "server bio", "email": "theirs@x.io"}))
        .await;

    let state = settled_state(&session).await;
    assert_eq!(state.value["email"], json!("mine@x.io"));
    assert_eq!(state.value["bio"], json!("original bio"));
}

#[tokio::test]
async fn prefer_external_drops_local_edits() {
    let config = FormConfig {
        merge_strategy: MergeStrategy::PreferExternal,
        ..FormConfig::default()
    };
    let session = profile_session(config);

    session.set_value("email", json!("mine@x.io")).await;
    let _ = settled_state(&session).await;
    let _ = session
        .external_update(json!({"bio": "server bio", "email": "theirs@x.io"}))
        .await;

    let state = settled_state(&session).await;
    assert_eq!(state.value["email"], json!("theirs@x.io"));
    assert_eq!(state.value["bio"], json!("server bio"));
}

// ============================================================================
// Baseline tracking
// ============================================================================

#[tokio::test]
async fn second_push_against_the_new_baseline_raises_no_conflict() {
    let session = profile_session(FormConfig::default());

    // First push auto-merges and advances the baseline.
    let _ = session
        .external_update(json!({"bio": "original bio", "email": "v2@x.io"}))
        .await;
    let _ = settled_state(&session).await;

    // A second push changing the same field is still "untouched
    // locally" relative to the new baseline.
    let outcome = session
        .external_update(json!({"bio": "original bio", "email": "v3@x.io"}))
        .await;
    assert!(matches!(outcome, MergeOutcome::Merged(_)));
    let state = settled_state(&session).await;
    assert_eq!(state.value["email"], json!("v3@x.io"));
}
