use checkview_engine::ChecksState;
use checkview_types::{Action, CheckResult, Link, LoginCallback, PatchsetContext, Run, RunInfo};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Publisher of [`ChecksState`] snapshots.
///
/// Every mutation runs read-modify-publish under the channel's write lock,
/// so concurrent writers never observe or publish a half-built snapshot.
/// Subscribers always see the latest snapshot first.
#[derive(Clone)]
pub struct ChecksStore {
    tx: Arc<watch::Sender<Arc<ChecksState>>>,
    live: Option<CancellationToken>,
}

impl Default for ChecksStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChecksStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(ChecksState::default()));
        Self {
            tx: Arc::new(tx),
            live: None,
        }
    }

    /// Handle on the same store whose writes are dropped once `token` is
    /// cancelled. The check runs under the write lock, so nothing lands
    /// after a removal that followed the cancel.
    pub fn bound_to(&self, token: CancellationToken) -> Self {
        Self {
            tx: self.tx.clone(),
            live: Some(token),
        }
    }

    pub fn snapshot(&self) -> Arc<ChecksState> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ChecksState>> {
        self.tx.subscribe()
    }

    /// Apply `reduce` to the current snapshot; publish only if it returns a
    /// new one. Returns whether anything was published.
    fn apply(
        &self,
        op: &'static str,
        reduce: impl FnOnce(&ChecksState) -> Option<ChecksState>,
    ) -> bool {
        let published = self.tx.send_if_modified(|current| {
            if self.live.as_ref().is_some_and(CancellationToken::is_cancelled) {
                return false;
            }
            match reduce(current.as_ref()) {
                Some(next) => {
                    *current = Arc::new(next);
                    true
                }
                None => false,
            }
        });
        trace!(op, published, "checks state mutation");
        published
    }

    pub fn set_provider(&self, plugin: &str, context: PatchsetContext) {
        self.apply("set_provider", |s| Some(s.with_provider(context, plugin)));
    }

    pub fn remove_provider(&self, plugin: &str) -> bool {
        self.apply("remove_provider", |s| s.without_provider(plugin))
    }

    pub fn set_loading(&self, plugin: &str, context: PatchsetContext) {
        self.apply("set_loading", |s| Some(s.with_loading(context, plugin)));
    }

    pub fn set_error(&self, plugin: &str, context: PatchsetContext, message: &str) {
        self.apply("set_error", |s| Some(s.with_error(context, plugin, message)));
    }

    pub fn set_not_logged_in(
        &self,
        plugin: &str,
        context: PatchsetContext,
        callback: LoginCallback,
    ) {
        self.apply("set_not_logged_in", |s| {
            Some(s.with_not_logged_in(context, plugin, callback))
        });
    }

    pub fn set_results(
        &self,
        plugin: &str,
        context: PatchsetContext,
        runs: Vec<Run>,
        actions: Vec<Action>,
        links: Vec<Link>,
    ) {
        self.apply("set_results", |s| {
            Some(s.with_results(context, plugin, runs, actions, links))
        });
    }

    /// Push a single updated result into both contexts. Publishes nothing
    /// when no context holds a result with the same external id.
    pub fn update_result(&self, plugin: &str, run: &RunInfo, result: &CheckResult) -> bool {
        self.apply("update_result", |s| s.with_updated_result(plugin, run, result))
    }

    pub fn set_patchset(&self, patchset: Option<u32>) {
        self.apply("set_patchset", |s| {
            (s.patchset_number_selected != patchset).then(|| s.with_patchset(patchset))
        });
    }

    /// Re-check the pinned patchset against a new `latest`. A pin equal to
    /// the latest patchset, or any pin once no latest is known, is cleared.
    /// Other pins are kept.
    pub fn normalize_patchset(&self, latest: Option<u32>) -> bool {
        self.apply("normalize_patchset", |s| match (s.patchset_number_selected, latest) {
            (Some(selected), Some(latest)) if selected == latest => Some(s.with_patchset(None)),
            (Some(_), None) => Some(s.with_patchset(None)),
            _ => None,
        })
    }
}
