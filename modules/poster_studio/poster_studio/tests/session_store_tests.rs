#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for the session store

mod common;

use common::{
    EMAIL, PASSWORD, assert_profile_invariant, embedded_studio, gated_studio, offline_studio,
    register,
};
use poster_studio::domain::demo;
use poster_studio::{
    AuthService, CreditCharge, ProfilePatch, SessionPhase, SignInOutcome, SignUpOutcome,
    StoreError, SubscriptionPlan, SubscriptionStatus, WriteMode, WriteOutcome,
};

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_initialize_without_backend_ends_unauthenticated() {
    let studio = offline_studio(WriteMode::Optimistic);
    let session = &studio.session;
    assert_eq!(session.snapshot().phase(), SessionPhase::Uninitialized);
    assert!(!session.snapshot().loading);

    session.initialize().await;

    let state = session.snapshot();
    assert!(!state.loading);
    assert!(state.initialized);
    assert_eq!(state.phase(), SessionPhase::Unauthenticated);
    assert_profile_invariant(&state);
}

#[tokio::test]
async fn test_initialize_runs_once() {
    let studio = offline_studio(WriteMode::Optimistic);
    let mut changes = studio.session.subscribe();

    studio.session.initialize().await;
    assert!(changes.has_changed().unwrap());
    changes.mark_unchanged();

    studio.session.initialize().await;
    assert!(!changes.has_changed().unwrap());
    assert!(!studio.session.snapshot().loading);
}

#[tokio::test]
async fn test_initialize_publishes_loading_until_session_resolves() {
    let (backend, studio) = gated_studio(WriteMode::Optimistic);
    backend.inner().sign_up(EMAIL, PASSWORD, "Wanjiku").await.unwrap();
    backend.hold();
    let mut changes = studio.session.subscribe();

    let session = studio.session.clone();
    let init = tokio::spawn(async move { session.initialize().await });

    let during = changes.wait_for(|s| s.loading).await.unwrap().clone();
    assert_eq!(during.phase(), SessionPhase::Loading);
    assert!(!during.initialized);
    assert!(during.user.is_none());

    backend.release();
    init.await.unwrap();

    let after = changes.borrow_and_update().clone();
    assert!(!after.loading);
    assert!(after.initialized);
    assert_eq!(after.phase(), SessionPhase::Authenticated);
    assert_profile_invariant(&after);
}

#[tokio::test]
async fn test_initialize_restores_held_session() {
    let (backend, studio) = embedded_studio(WriteMode::Optimistic);
    backend.sign_up(EMAIL, PASSWORD, "Wanjiku").await.unwrap();

    studio.session.initialize().await;

    let state = studio.session.snapshot();
    assert_eq!(state.phase(), SessionPhase::Authenticated);
    assert_eq!(state.user.as_ref().unwrap().email.as_deref(), Some(EMAIL));
    assert_eq!(state.profile.as_ref().unwrap().full_name.as_deref(), Some("Wanjiku"));
}

#[tokio::test]
async fn test_listener_follows_external_session_changes() {
    let (backend, studio) = embedded_studio(WriteMode::Optimistic);
    let user_id = register(&backend).await;
    studio.session.initialize().await;
    assert!(studio.session.user().is_none());

    backend.sign_in_with_password(EMAIL, PASSWORD).await.unwrap();
    let state = studio.session.snapshot();
    assert_eq!(state.user.as_ref().map(|u| u.id.as_str()), Some(user_id.as_str()));
    assert_profile_invariant(&state);

    backend.sign_out().await.unwrap();
    let state = studio.session.snapshot();
    assert!(state.user.is_none());
    assert_profile_invariant(&state);
}

#[tokio::test]
async fn test_shutdown_stops_following_changes() {
    let (backend, studio) = embedded_studio(WriteMode::Optimistic);
    register(&backend).await;
    studio.session.initialize().await;

    studio.session.shutdown();
    studio.session.shutdown();

    backend.sign_in_with_password(EMAIL, PASSWORD).await.unwrap();
    assert!(studio.session.user().is_none());
}

// =============================================================================
// Sign-in / sign-up / sign-out
// =============================================================================

#[tokio::test]
async fn test_sign_in_fallback_keeps_email() {
    let studio = offline_studio(WriteMode::Optimistic);
    let loading_before = studio.session.snapshot().loading;

    let outcome = studio.session.sign_in("a@b.com", "pw").await.unwrap();

    let state = studio.session.snapshot();
    assert_eq!(outcome, SignInOutcome::Demo);
    assert_eq!(state.user.as_ref().unwrap().email.as_deref(), Some("a@b.com"));
    assert_eq!(state.user.as_ref().unwrap().id, demo::DEMO_USER_ID);
    assert_eq!(state.loading, loading_before);

    let profile = state.profile.as_ref().unwrap();
    assert_eq!(profile.credits_remaining, 3);
    assert_eq!(profile.subscription_plan, SubscriptionPlan::Free);
    assert_eq!(profile.subscription_status, SubscriptionStatus::Inactive);
    assert_profile_invariant(&state);
}

#[tokio::test]
async fn test_sign_in_with_account() {
    let (backend, studio) = embedded_studio(WriteMode::Optimistic);
    let user_id = register(&backend).await;

    let outcome = studio.session.sign_in(EMAIL, PASSWORD).await.unwrap();

    assert_eq!(outcome, SignInOutcome::Authenticated);
    let state = studio.session.snapshot();
    assert_eq!(state.user.as_ref().unwrap().id, user_id);
    assert_eq!(state.profile.as_ref().unwrap().full_name.as_deref(), Some("Wanjiku"));
}

#[tokio::test]
async fn test_sign_in_reads_profile_once() {
    let (backend, studio) = gated_studio(WriteMode::Optimistic);
    register(backend.inner()).await;

    // Listener subscribed: it loads the profile, sign-in reuses it.
    studio.session.initialize().await;
    studio.session.sign_in(EMAIL, PASSWORD).await.unwrap();
    assert_eq!(backend.profile_reads(), 1);
    assert_profile_invariant(&studio.session.snapshot());

    // No listener: sign-in loads it itself.
    studio.session.shutdown();
    studio.session.sign_out().await;
    studio.session.sign_in(EMAIL, PASSWORD).await.unwrap();
    assert_eq!(backend.profile_reads(), 2);
    assert_profile_invariant(&studio.session.snapshot());
}

#[tokio::test]
async fn test_wrong_password_falls_back_to_local_identity() {
    let (backend, studio) = embedded_studio(WriteMode::Optimistic);
    register(&backend).await;

    let outcome = studio.session.sign_in(EMAIL, "wrong").await.unwrap();

    assert_eq!(outcome, SignInOutcome::Demo);
    assert_eq!(studio.session.user().unwrap().id, demo::DEMO_USER_ID);
    assert_profile_invariant(&studio.session.snapshot());
}

#[tokio::test]
async fn test_blank_email_is_rejected() {
    let studio = offline_studio(WriteMode::Optimistic);
    let err = studio.session.sign_in("  ", "pw").await.unwrap_err();
    assert!(matches!(err, StoreError::Validation { ref field, .. } if field == "email"));
    assert!(studio.session.user().is_none());
}

#[tokio::test]
async fn test_sign_up_creates_account_and_profile() {
    let (_backend, studio) = embedded_studio(WriteMode::Optimistic);

    let outcome = studio
        .session
        .sign_up("new@shop.co.ke", "pw", "Akinyi")
        .await
        .unwrap();

    assert_eq!(outcome, SignUpOutcome::Authenticated);
    let profile = studio.session.profile().unwrap();
    assert_eq!(profile.full_name.as_deref(), Some("Akinyi"));
    assert_eq!(profile.credits_remaining, 3);
}

#[tokio::test]
async fn test_sign_up_pending_confirmation_leaves_state() {
    let backend = std::sync::Arc::new(poster_studio::InMemoryBackend::new().with_email_confirmation());
    let studio = poster_studio::Studio::new(
        &poster_studio::Backend::embedded(backend),
        WriteMode::Optimistic,
    );

    let outcome = studio.session.sign_up(EMAIL, PASSWORD, "Wanjiku").await.unwrap();

    assert_eq!(outcome, SignUpOutcome::ConfirmationPending);
    assert!(studio.session.user().is_none());
    assert_profile_invariant(&studio.session.snapshot());
}

#[tokio::test]
async fn test_sign_up_fallback() {
    let studio = offline_studio(WriteMode::Optimistic);
    let outcome = studio.session.sign_up("x@y.z", "pw", "X").await.unwrap();
    assert_eq!(outcome, SignUpOutcome::Demo);
    assert_eq!(studio.session.user().unwrap().email.as_deref(), Some("x@y.z"));
}

#[tokio::test]
async fn test_sign_out_clears_even_when_backend_fails() {
    let (backend, studio) = embedded_studio(WriteMode::Optimistic);
    register(&backend).await;
    studio.session.sign_in(EMAIL, PASSWORD).await.unwrap();

    backend.set_online(false);
    studio.session.sign_out().await;

    let state = studio.session.snapshot();
    assert!(state.user.is_none());
    assert!(state.profile.is_none());
}

#[tokio::test]
async fn test_profile_invariant_across_sequences() {
    let (backend, studio) = embedded_studio(WriteMode::Optimistic);
    register(&backend).await;
    let session = &studio.session;

    session.initialize().await;
    assert_profile_invariant(&session.snapshot());
    session.fetch_profile().await;
    assert_profile_invariant(&session.snapshot());
    session.sign_in(EMAIL, PASSWORD).await.unwrap();
    assert_profile_invariant(&session.snapshot());
    backend.set_online(false);
    session.fetch_profile().await;
    assert_profile_invariant(&session.snapshot());
    session.sign_out().await;
    assert_profile_invariant(&session.snapshot());
    session.sign_in("a@b.com", "pw").await.unwrap();
    assert_profile_invariant(&session.snapshot());
    backend.set_online(true);
    session.fetch_profile().await;
    assert_profile_invariant(&session.snapshot());
    session.sign_out().await;
    assert_profile_invariant(&session.snapshot());
}

// =============================================================================
// Profile and credits
// =============================================================================

#[tokio::test]
async fn test_fetch_profile_without_user_is_noop() {
    let studio = offline_studio(WriteMode::Optimistic);
    studio.session.fetch_profile().await;
    assert!(studio.session.profile().is_none());
}

#[tokio::test]
async fn test_update_profile_requires_user() {
    let studio = offline_studio(WriteMode::Optimistic);
    let err = studio
        .session
        .update_profile(&ProfilePatch::credits(10))
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::AuthenticationRequired);
}

#[tokio::test]
async fn test_update_profile_remote_then_refetch() {
    let (backend, studio) = embedded_studio(WriteMode::Optimistic);
    register(&backend).await;
    studio.session.sign_in(EMAIL, PASSWORD).await.unwrap();

    let patch = ProfilePatch {
        subscription_plan: Some(SubscriptionPlan::Monthly),
        subscription_status: Some(SubscriptionStatus::Active),
        ..ProfilePatch::default()
    };
    let outcome = studio.session.update_profile(&patch).await.unwrap();

    assert_eq!(outcome, WriteOutcome::Synced);
    let profile = studio.session.profile().unwrap();
    assert_eq!(profile.subscription_plan, SubscriptionPlan::Monthly);
    assert_eq!(studio.session.plan_label(), "Monthly Plan");
    let rows = backend.rows(poster_studio_sdk::Table::Profiles);
    assert_eq!(rows[0]["subscription_status"], "active");
}

#[tokio::test]
async fn test_update_profile_falls_back_to_local_merge() {
    let studio = offline_studio(WriteMode::Optimistic);
    studio.session.sign_in("a@b.com", "pw").await.unwrap();

    let outcome = studio
        .session
        .update_profile(&ProfilePatch {
            full_name: Some(Some("Shop Owner".to_owned())),
            ..ProfilePatch::default()
        })
        .await
        .unwrap();

    assert_eq!(outcome, WriteOutcome::LocalOnly);
    let profile = studio.session.profile().unwrap();
    assert_eq!(profile.full_name.as_deref(), Some("Shop Owner"));
    assert_eq!(profile.credits_remaining, 3);
}

#[tokio::test]
async fn test_export_credits_run_out() {
    let studio = offline_studio(WriteMode::Optimistic);
    studio.session.sign_in("a@b.com", "pw").await.unwrap();

    for expected in [2, 1, 0] {
        assert!(studio.session.can_export());
        let charge = studio.session.consume_export_credit().await.unwrap();
        assert_eq!(
            charge,
            CreditCharge::Credit {
                remaining: expected,
                outcome: WriteOutcome::LocalOnly,
            }
        );
    }

    assert!(!studio.session.can_export());
    assert_eq!(
        studio.session.consume_export_credit().await.unwrap_err(),
        StoreError::InsufficientCredits
    );
}

#[tokio::test]
async fn test_active_subscription_exports_without_credits() {
    let studio = offline_studio(WriteMode::Optimistic);
    studio.session.sign_in("a@b.com", "pw").await.unwrap();
    studio
        .session
        .update_profile(&ProfilePatch {
            subscription_status: Some(SubscriptionStatus::Active),
            credits_remaining: Some(0),
            ..ProfilePatch::default()
        })
        .await
        .unwrap();

    assert!(studio.session.can_export());
    assert_eq!(
        studio.session.consume_export_credit().await.unwrap(),
        CreditCharge::Subscription
    );
    assert_eq!(studio.session.profile().unwrap().credits_remaining, 0);
}

#[tokio::test]
async fn test_export_requires_user() {
    let studio = offline_studio(WriteMode::Optimistic);
    assert!(!studio.session.can_export());
    assert_eq!(
        studio.session.consume_export_credit().await.unwrap_err(),
        StoreError::AuthenticationRequired
    );
}
