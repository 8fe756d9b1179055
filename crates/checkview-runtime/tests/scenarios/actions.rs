//! Action Tests
//!
//! Triggering provider actions: preconditions, alerts, reloads and the
//! result timeout.

use checkview_runtime::UiEvent;
use checkview_testing::TestWorld;
use checkview_testing::providers::StubProvider;
use checkview_testing::wait::{settled_everywhere, wait_for_state, wait_until};
use checkview_types::{Action, ActionCallback, ActionInvocation, ActionResult, Run};
use futures::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;

/// Action recording every invocation and answering with `result`.
fn recording_action(
    name: &str,
    result: Option<ActionResult>,
) -> (Action, Arc<Mutex<Vec<ActionInvocation>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let callback = ActionCallback::new(move |invocation| {
        log.lock().unwrap().push(invocation);
        let result = result.clone()?;
        Some(async move { result }.boxed())
    });
    (Action::new(name).with_callback(callback), seen)
}

fn triggering(name: &str) -> UiEvent {
    UiEvent::ShowAlert {
        message: format!("Triggering action '{name}' ..."),
        show_dismiss: true,
    }
}

#[tokio::test]
async fn test_trigger_without_change_does_nothing() {
    let world = TestWorld::new();
    let mut events = world.model().ui_events();
    let (action, seen) = recording_action("Rerun", Some(ActionResult::default()));

    assert!(world.model().trigger_action(&action, None).is_none());

    assert!(seen.lock().unwrap().is_empty());
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    assert!(world.reporter().actions().is_empty());
}

#[tokio::test]
async fn test_action_without_callback_is_ignored() {
    let world = TestWorld::new().with_change(42, 1);
    let mut events = world.model().ui_events();

    assert!(world.model().trigger_action(&Action::new("Docs"), None).is_none());
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_run_action_message_is_alerted() {
    let world = TestWorld::new().with_change(42, 2);
    let mut events = world.model().ui_events();
    let (action, seen) = recording_action(
        "Rerun",
        Some(ActionResult {
            message: Some("Rerun scheduled".to_string()),
            ..ActionResult::default()
        }),
    );
    let run = Run::new("build", 42, 1).with_attempt(3).with_external_id("b-1");

    let handle = world
        .model()
        .trigger_action(&action, Some(&run.info))
        .expect("action started");
    handle.await.unwrap();

    assert_eq!(events.recv().await.unwrap(), triggering("Rerun"));
    assert_eq!(events.recv().await.unwrap(), UiEvent::alert("Rerun scheduled"));

    let invocations = seen.lock().unwrap().clone();
    assert_eq!(
        invocations,
        vec![ActionInvocation {
            change: 42,
            patchset: 1,
            attempt: Some(3),
            external_id: Some("b-1".to_string()),
            check_name: Some("build".to_string()),
            action_name: "Rerun".to_string(),
        }]
    );
    assert_eq!(
        world.reporter().actions(),
        vec![("Rerun".to_string(), Some("build".to_string()))]
    );
}

#[tokio::test]
async fn test_top_level_action_uses_latest_patchset() {
    let world = TestWorld::new().with_change(42, 2);
    let mut events = world.model().ui_events();
    let (action, seen) = recording_action("Run all", Some(ActionResult::default()));

    let handle = world.model().trigger_action(&action, None).unwrap();
    handle.await.unwrap();

    let invocation = seen.lock().unwrap()[0].clone();
    assert_eq!((invocation.change, invocation.patchset), (42, 2));
    assert_eq!(invocation.check_name, None);

    assert_eq!(events.recv().await.unwrap(), triggering("Run all"));
    assert_eq!(events.recv().await.unwrap(), UiEvent::HideAlert);
}

#[tokio::test]
async fn test_error_message_is_alerted_when_no_message() {
    let world = TestWorld::new().with_change(42, 1);
    let mut events = world.model().ui_events();
    let (action, _) = recording_action(
        "Rerun",
        Some(ActionResult {
            error_message: Some("permission denied".to_string()),
            ..ActionResult::default()
        }),
    );

    world.model().trigger_action(&action, None).unwrap().await.unwrap();

    assert_eq!(events.recv().await.unwrap(), triggering("Rerun"));
    assert_eq!(events.recv().await.unwrap(), UiEvent::alert("permission denied"));
}

#[tokio::test]
async fn test_callback_without_result_shows_nothing() {
    let world = TestWorld::new().with_change(42, 1);
    let mut events = world.model().ui_events();
    let (action, seen) = recording_action("Fire and forget", None);

    assert!(world.model().trigger_action(&action, None).is_none());
    assert_eq!(seen.lock().unwrap().len(), 1);
    assert_eq!(world.reporter().actions().len(), 1);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_should_reload_refetches_owning_provider() {
    let world = TestWorld::new().with_change(42, 1);
    let ci = StubProvider::with_runs(vec![Run::new("build", 42, 1)]);
    let lint = StubProvider::with_runs(vec![Run::new("style", 42, 1)]);
    world.register("ci", ci.clone());
    world.register("lint", lint.clone());
    wait_for_state(world.model(), |s| {
        settled_everywhere("ci")(s) && settled_everywhere("lint")(s)
    })
    .await;

    let (action, _) = recording_action(
        "Rerun",
        Some(ActionResult {
            should_reload: true,
            ..ActionResult::default()
        }),
    );
    let run = Run::new("build", 42, 1);
    world
        .model()
        .trigger_action(&action, Some(&run.info))
        .unwrap()
        .await
        .unwrap();

    wait_until(|| ci.call_count() == 4).await;
    assert_eq!(lint.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_late_action_result_is_dropped() {
    let world = TestWorld::new().with_change(42, 1);
    let mut events = world.model().ui_events();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let action = Action::new("Slow").with_callback(ActionCallback::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Some(
            async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                ActionResult {
                    message: Some("too late".to_string()),
                    ..ActionResult::default()
                }
            }
            .boxed(),
        )
    }));

    world.model().trigger_action(&action, None).unwrap().await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(events.recv().await.unwrap(), triggering("Slow"));
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}
