//! Bounded waits. Every helper panics after [`WAIT_TIMEOUT`].

use checkview_engine::ChecksState;
use checkview_runtime::{ChecksModel, ViewStream};
use checkview_types::PatchsetContext;
use std::sync::Arc;
use std::time::Duration;

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// First value from `view` satisfying `predicate`, current value included.
pub async fn wait_for<T>(view: &mut ViewStream<T>, mut predicate: impl FnMut(&T) -> bool) -> T
where
    T: Clone + PartialEq,
{
    tokio::time::timeout(WAIT_TIMEOUT, async {
        loop {
            let value = view.next().await.expect("view ended");
            if predicate(&value) {
                return value;
            }
        }
    })
    .await
    .expect("timed out waiting for view")
}

/// First snapshot satisfying `predicate`, current snapshot included.
pub async fn wait_for_state(
    model: &ChecksModel,
    mut predicate: impl FnMut(&ChecksState) -> bool,
) -> Arc<ChecksState> {
    let mut rx = model.subscribe();
    let state = tokio::time::timeout(WAIT_TIMEOUT, rx.wait_for(|state| predicate(state)))
        .await
        .expect("timed out waiting for state")
        .expect("model dropped");
    Arc::clone(&state)
}

/// Poll `condition` until it holds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for condition")
}

/// Predicate: `plugin` has a landed response in `context` and nothing in flight.
pub fn provider_settled(
    context: PatchsetContext,
    plugin: &str,
) -> impl FnMut(&ChecksState) -> bool {
    let plugin = plugin.to_string();
    move |state| {
        state
            .provider(context, &plugin)
            .is_some_and(|p| !p.first_time_load && !p.loading)
    }
}

/// Predicate: `plugin` is settled in both contexts.
pub fn settled_everywhere(plugin: &str) -> impl FnMut(&ChecksState) -> bool {
    let mut latest = provider_settled(PatchsetContext::Latest, plugin);
    let mut selected = provider_settled(PatchsetContext::Selected, plugin);
    move |state| latest(state) && selected(state)
}

/// Give background pipelines a moment to run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
