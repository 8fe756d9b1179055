//! Fetch Lifecycle Tests
//!
//! Registration, response classification, gaps, visibility, crashes and
//! unregistration.

use checkview_engine::ProviderStatus;
use checkview_runtime::{Error, Execution, Visibility};
use checkview_testing::TestWorld;
use checkview_testing::fixtures::{
    SAMPLE_PROJECT, retried_runs, sample_change, sample_runs, sample_sha,
};
use checkview_testing::providers::{ScriptedProvider, StubProvider};
use checkview_testing::wait::{
    provider_settled, settle, settled_everywhere, wait_for, wait_for_state,
};
use checkview_types::{FetchResponse, LoginCallback, PatchsetContext};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// =============================================================================
// RESPONSE CLASSIFICATION
// =============================================================================

#[tokio::test]
async fn test_register_fetches_and_derives_attempts() {
    let world = TestWorld::new().with_change(42, 2);
    let provider = StubProvider::with_runs(retried_runs("build", 42, 2, 2));
    world.register("ci", provider.clone());

    let state = wait_for_state(world.model(), settled_everywhere("ci")).await;
    let ci = state.provider(PatchsetContext::Latest, "ci").unwrap();
    assert_eq!(ci.status, ProviderStatus::Ok);
    assert_eq!(ci.runs.len(), 2);

    let first = &ci.runs[0];
    let second = &ci.runs[1];
    assert!(!first.is_latest_attempt);
    assert!(second.is_latest_attempt);
    assert!(!second.is_single_attempt);
    let attempts: Vec<_> = second.attempt_details.iter().map(|d| d.attempt).collect();
    assert_eq!(attempts, vec![Some(1), Some(2)]);

    // One fetch per context, both for the latest patchset
    let calls = provider.calls();
    assert_eq!(calls.len(), 2);
    for data in &calls {
        assert_eq!(data.change_number, 42);
        assert_eq!(data.patchset_number, 2);
        assert_eq!(data.patchset_sha, sample_sha(2));
        assert_eq!(data.repo, SAMPLE_PROJECT);
        assert_eq!(data.commit_message.as_deref(), Some("Fix the build\n\nPatchset 2"));
    }
}

#[tokio::test]
async fn test_error_response_clears_runs_and_reports() {
    let world = TestWorld::new().with_change(42, 1);
    world.register("ci", StubProvider::responding(FetchResponse::error("quota exceeded")));

    let state = wait_for_state(world.model(), settled_everywhere("ci")).await;
    let ci = state.provider(PatchsetContext::Latest, "ci").unwrap();
    assert!(!ci.loading);
    assert_eq!(ci.error_message(), Some("quota exceeded"));
    assert!(ci.runs.is_empty());
    assert!(ci.login_callback().is_none());

    assert_eq!(world.reporter().execution_count(Execution::FetchError), 2);
    let mut errors = world.model().error_messages(PatchsetContext::Latest);
    assert_eq!(
        errors.current(),
        vec![("ci".to_string(), "quota exceeded".to_string())]
    );
}

#[tokio::test]
async fn test_not_logged_in_exposes_login_callback() {
    let world = TestWorld::new().with_change(42, 1);
    let logins = Arc::new(AtomicUsize::new(0));
    let counter = logins.clone();
    let login = LoginCallback::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    world.register(
        "ci",
        StubProvider::responding(FetchResponse::NotLoggedIn {
            login_callback: login.clone(),
        }),
    );

    let mut view = world.model().login_callback(PatchsetContext::Latest);
    let callback = wait_for(&mut view, Option::is_some).await.unwrap();
    assert_eq!(callback, login);
    callback.invoke();
    assert_eq!(logins.load(Ordering::SeqCst), 1);

    assert!(world.model().error_message(PatchsetContext::Latest).current().is_none());
    assert!(world.reporter().execution_count(Execution::NotLoggedIn) >= 1);
}

#[tokio::test]
async fn test_loading_flags_track_fetches() {
    let world = TestWorld::new().with_change(42, 1);
    let provider = ScriptedProvider::new();
    world.register("ci", provider.clone());

    let mut loading = world.model().some_loading(PatchsetContext::Latest);
    let mut first_time = world.model().some_loading_first_time(PatchsetContext::Latest);
    assert!(first_time.current());

    let first = provider.next_fetch().await;
    let second = provider.next_fetch().await;
    assert!(loading.current());

    assert!(first.respond(FetchResponse::with_runs(sample_runs(42, 1))));
    assert!(second.respond(FetchResponse::with_runs(sample_runs(42, 1))));

    assert!(!wait_for(&mut loading, |l| !*l).await);
    assert!(!first_time.current());
    assert_eq!(world.model().all_runs(PatchsetContext::Latest).current().len(), 2);
}

#[tokio::test]
async fn test_superseded_fetch_is_never_applied() {
    let world = TestWorld::new().with_change(42, 1);
    let provider = ScriptedProvider::new();
    world.register("ci", provider.clone());

    let stale = [provider.next_fetch().await, provider.next_fetch().await];

    // New patchset before the first fetches resolve
    world.host().load_change(sample_change(42, 2));
    let fresh = [provider.next_fetch().await, provider.next_fetch().await];
    assert!(stale.iter().all(|f| f.is_abandoned()));
    assert!(fresh.iter().all(|f| f.data.patchset_number == 2));

    for fetch in fresh {
        assert!(fetch.respond(FetchResponse::with_runs(retried_runs("fresh", 42, 2, 1))));
    }
    wait_for_state(world.model(), settled_everywhere("ci")).await;

    for fetch in stale {
        assert!(!fetch.respond(FetchResponse::with_runs(retried_runs("stale", 42, 1, 1))));
    }
    settle().await;

    let names: Vec<_> = world
        .model()
        .all_runs(PatchsetContext::Latest)
        .current()
        .iter()
        .map(|r| r.check_name().to_string())
        .collect();
    assert_eq!(names, vec!["fresh"]);
    assert!(provider.try_next_fetch().await.is_none());
}

// =============================================================================
// TRIGGER GATING
// =============================================================================

#[tokio::test]
async fn test_missing_change_yields_empty_result_without_fetch() {
    let world = TestWorld::new();
    let provider = StubProvider::sample();
    world.register("ci", provider.clone());

    let state = wait_for_state(world.model(), settled_everywhere("ci")).await;
    let ci = state.provider(PatchsetContext::Latest, "ci").unwrap();
    assert_eq!(ci.status, ProviderStatus::Ok);
    assert!(ci.runs.is_empty());
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_unknown_patchset_sha_is_a_gap() {
    let world = TestWorld::new();
    // Latest patchset points past the revisions the change object knows
    world.host().set_change(Some(sample_change(42, 1)));
    world.host().set_change_number(Some(42));
    world.host().set_latest_patchset(Some(2));

    let provider = StubProvider::sample();
    world.register("ci", provider.clone());

    wait_for_state(world.model(), settled_everywhere("ci")).await;
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_hidden_host_suppresses_fetches() {
    let world = TestWorld::new().with_change(42, 1);
    world.host().set_visibility(Visibility::Hidden);
    let provider = StubProvider::sample();
    world.register("ci", provider.clone());

    settle().await;
    assert_eq!(provider.call_count(), 0);
    let snapshot = world.model().snapshot();
    assert!(snapshot.provider(PatchsetContext::Latest, "ci").unwrap().first_time_load);

    world.host().set_visibility(Visibility::Visible);
    wait_for_state(world.model(), settled_everywhere("ci")).await;
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn test_change_switch_refetches() {
    let world = TestWorld::new().with_change(42, 1);
    let provider = StubProvider::sample();
    world.register("ci", provider.clone());
    wait_for_state(world.model(), settled_everywhere("ci")).await;

    world.host().load_change(sample_change(77, 3));
    let state = wait_for_state(world.model(), |s| {
        s.provider(PatchsetContext::Latest, "ci")
            .is_some_and(|p| p.runs.first().is_some_and(|r| r.info.change == 77))
    })
    .await;
    let ci = state.provider(PatchsetContext::Latest, "ci").unwrap();
    assert_eq!(ci.runs[0].info.patchset, 3);
    assert!(provider.calls().iter().any(|d| d.change_number == 77 && d.patchset_number == 3));
}

// =============================================================================
// FATAL FAILURES
// =============================================================================

#[tokio::test]
async fn test_failing_provider_is_never_fetched_again() {
    let world = TestWorld::new().with_change(42, 1);
    let provider = StubProvider::failing("connection reset");
    world.register("ci", provider.clone());

    let state = wait_for_state(world.model(), settled_everywhere("ci")).await;
    let ci = state.provider(PatchsetContext::Latest, "ci").unwrap();
    assert_eq!(ci.error_message(), Some("Fetching checks failed: connection reset"));
    assert_eq!(provider.call_count(), 2);
    assert_eq!(world.reporter().errors().len(), 2);
    assert_eq!(world.reporter().execution_count(Execution::FetchCrashed), 2);

    world.model().reload_all();
    world.host().load_change(sample_change(42, 2));
    settle().await;
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn test_panicking_provider_is_contained() {
    let world = TestWorld::new().with_change(42, 1);
    let healthy = StubProvider::sample();
    world.register("boom", StubProvider::panicking("provider exploded"));
    world.register("ci", healthy.clone());

    let state = wait_for_state(world.model(), |s| {
        settled_everywhere("boom")(s) && settled_everywhere("ci")(s)
    })
    .await;
    let boom = state.provider(PatchsetContext::Latest, "boom").unwrap();
    assert_eq!(boom.error_message(), Some("Fetching checks failed: provider exploded"));
    let ci = state.provider(PatchsetContext::Latest, "ci").unwrap();
    assert_eq!(ci.status, ProviderStatus::Ok);
    assert_eq!(ci.runs.len(), 2);
}

// =============================================================================
// REGISTRATION
// =============================================================================

#[tokio::test]
async fn test_unregister_removes_state_and_stops_fetching() {
    let world = TestWorld::new().with_change(42, 1);
    let provider = StubProvider::sample();
    world.register("ci", provider.clone());
    wait_for_state(world.model(), settled_everywhere("ci")).await;
    assert!(world.model().plugin_registered().current());

    world.model().unregister("ci").unwrap();
    let snapshot = world.model().snapshot();
    for context in PatchsetContext::all() {
        assert!(snapshot.provider(context, "ci").is_none());
    }
    assert!(!world.model().is_registered("ci"));
    assert!(!world.model().plugin_registered().current());

    let before = provider.call_count();
    world.host().load_change(sample_change(43, 1));
    settle().await;
    assert_eq!(provider.call_count(), before);
    assert!(world.model().snapshot().provider(PatchsetContext::Latest, "ci").is_none());

    assert!(matches!(
        world.model().unregister("ci"),
        Err(Error::UnknownPlugin(name)) if name == "ci"
    ));
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let world = TestWorld::new().with_change(42, 1);
    world.register("ci", StubProvider::sample());
    let again = world.model().register("ci", StubProvider::sample(), None);
    assert!(matches!(again, Err(Error::AlreadyRegistered(name)) if name == "ci"));
}

#[tokio::test]
async fn test_shutdown_is_idempotent_and_final() {
    let world = TestWorld::new().with_change(42, 1);
    let provider = StubProvider::sample();
    world.register("ci", provider.clone());
    wait_for_state(world.model(), provider_settled(PatchsetContext::Latest, "ci")).await;

    world.model().shutdown();
    world.model().shutdown();
    assert!(!world.model().is_registered("ci"));

    let before = provider.call_count();
    world.host().load_change(sample_change(42, 2));
    settle().await;
    assert_eq!(provider.call_count(), before);

    let late = world.model().register("lint", StubProvider::sample(), None);
    assert!(matches!(late, Err(Error::Shutdown)));
}
