//! Per (provider, patchset context) fetch loop.
//!
//! ```text
//! change number ─┐
//! patchset ──────┤
//! reload (throttled) ─┼─► trigger ─► resolve ChangeData ─► fetch ─► classify ─► store
//! poll timer ────┤                  (gap → empty OK)     (latest wins)
//! visibility ────┘
//! ```
//!
//! Each loop runs as its own task and ends when its `CancellationToken`
//! fires (unregister / shutdown) or the provider fails fatally.

use checkview_types::{ChangeData, FetchResponse, PatchsetContext};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::provider::CheckProvider;
use crate::reporter::{Execution, Reporter};
use crate::signals::HostSignals;
use crate::store::ChecksStore;

pub(crate) struct Pipeline {
    pub plugin: String,
    pub context: PatchsetContext,
    pub provider: Arc<dyn CheckProvider>,
    pub store: ChecksStore,
    pub signals: HostSignals,
    pub reload: watch::Receiver<()>,
    pub reporter: Arc<dyn Reporter>,
    pub polling: Option<Duration>,
    pub reload_throttle: Duration,
    pub cancel: CancellationToken,
}

enum Trigger {
    /// Host is hidden; nothing is fetched and nothing is written
    Suppressed,
    /// Change or patchset metadata not available yet
    Gap,
    Fetch(ChangeData),
}

enum FetchOutcome {
    Response(FetchResponse),
    Failed(String),
}

enum Event {
    Cancelled,
    Settled(FetchOutcome),
    Fire,
    Ignore,
}

type InFlight = Option<BoxFuture<'static, FetchOutcome>>;

async fn settle(in_flight: &mut InFlight) -> FetchOutcome {
    match in_flight.as_mut() {
        Some(fetch) => fetch.await,
        None => std::future::pending().await,
    }
}

async fn tick(poll: &mut Option<Interval>) {
    match poll.as_mut() {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

impl Pipeline {
    pub(crate) async fn run(mut self) {
        debug!(plugin = %self.plugin, context = %self.context, "check pipeline started");

        let mut change_number = self.signals.change_number.clone();
        let mut latest_patchset = self.signals.latest_patchset.clone();
        let mut visibility = self.signals.visibility.clone();
        let mut state = self.store.subscribe();
        // Everything up to now is covered by the initial fetch below
        change_number.borrow_and_update();
        latest_patchset.borrow_and_update();
        visibility.borrow_and_update();
        self.reload.borrow_and_update();

        let mut poll = self.polling.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });
        let mut last_reload: Option<Instant> = None;
        let mut patchset = self.resolve_patchset();
        let mut in_flight: InFlight = None;

        // Initial fetch, like a timer firing at t=0
        self.fire(&mut in_flight);

        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Event::Cancelled,
                outcome = settle(&mut in_flight) => Event::Settled(outcome),
                Ok(()) = change_number.changed() => Event::Fire,
                Ok(()) = latest_patchset.changed() => self.patchset_event(&mut patchset),
                Ok(()) = state.changed(), if self.context == PatchsetContext::Selected => {
                    self.patchset_event(&mut patchset)
                }
                Ok(()) = self.reload.changed() => {
                    let now = Instant::now();
                    match last_reload {
                        Some(last) if now.duration_since(last) < self.reload_throttle => {
                            debug!(plugin = %self.plugin, "reload throttled");
                            Event::Ignore
                        }
                        _ => {
                            last_reload = Some(now);
                            Event::Fire
                        }
                    }
                }
                Ok(()) = visibility.changed() => Event::Fire,
                _ = tick(&mut poll) => Event::Fire,
            };

            match event {
                Event::Cancelled => break,
                Event::Ignore => {}
                Event::Fire => self.fire(&mut in_flight),
                Event::Settled(FetchOutcome::Response(response)) => {
                    in_flight = None;
                    self.apply(response);
                }
                Event::Settled(FetchOutcome::Failed(reason)) => {
                    self.crash(&reason);
                    break;
                }
            }
        }

        debug!(plugin = %self.plugin, context = %self.context, "check pipeline stopped");
    }

    /// Patchset this context currently fetches: the latest one, or for the
    /// selected context the pinned one falling back to latest.
    fn resolve_patchset(&self) -> Option<u32> {
        let latest = self.signals.current_latest_patchset();
        match self.context {
            PatchsetContext::Latest => latest,
            PatchsetContext::Selected => self.store.snapshot().patchset_number_selected.or(latest),
        }
    }

    fn patchset_event(&self, last: &mut Option<u32>) -> Event {
        let current = self.resolve_patchset();
        if current == *last {
            return Event::Ignore;
        }
        *last = current;
        Event::Fire
    }

    fn resolve(&self) -> Trigger {
        if !self.signals.is_visible() {
            return Trigger::Suppressed;
        }
        let (Some(change_number), Some(patchset_number), Some(change)) = (
            self.signals.current_change_number(),
            self.resolve_patchset(),
            self.signals.current_change(),
        ) else {
            return Trigger::Gap;
        };
        let Some(patchset_sha) = change.sha_for_patchset(patchset_number) else {
            return Trigger::Gap;
        };

        Trigger::Fetch(ChangeData {
            change_number,
            patchset_number,
            patchset_sha: patchset_sha.to_string(),
            repo: change.project.clone(),
            commit_message: change.current_commit_message().map(str::to_string),
            change_info: change,
        })
    }

    /// Switch to a new fetch; whatever was in flight is dropped unapplied.
    fn fire(&self, in_flight: &mut InFlight) {
        match self.resolve() {
            Trigger::Suppressed => {
                debug!(plugin = %self.plugin, context = %self.context, "hidden, skipping fetch");
            }
            Trigger::Gap => {
                *in_flight = None;
                self.apply(FetchResponse::empty());
            }
            Trigger::Fetch(data) => {
                debug!(
                    plugin = %self.plugin,
                    context = %self.context,
                    change = data.change_number,
                    patchset = data.patchset_number,
                    "fetching checks"
                );
                self.store.set_loading(&self.plugin, self.context);
                let provider = self.provider.clone();
                let started = Instant::now();
                let fetch = async move { provider.fetch(data).await };
                *in_flight = Some(
                    AssertUnwindSafe(fetch)
                        .catch_unwind()
                        .map(move |result| {
                            let elapsed_ms = started.elapsed().as_millis() as u64;
                            debug!(elapsed_ms, "fetch settled");
                            match result {
                                Ok(Ok(response)) => FetchOutcome::Response(response),
                                Ok(Err(err)) => FetchOutcome::Failed(format!("{err:#}")),
                                Err(panic) => FetchOutcome::Failed(panic_message(panic.as_ref())),
                            }
                        })
                        .boxed(),
                );
            }
        }
    }

    fn apply(&self, response: FetchResponse) {
        debug!(
            plugin = %self.plugin,
            context = %self.context,
            response = response.response_code(),
            "provider answered"
        );
        match response {
            FetchResponse::Ok {
                runs,
                actions,
                links,
            } => {
                debug!(
                    plugin = %self.plugin,
                    context = %self.context,
                    runs = runs.len(),
                    "checks loaded"
                );
                self.store
                    .set_results(&self.plugin, self.context, runs, actions, links);
            }
            FetchResponse::Error { error_message } => {
                self.store
                    .set_error(&self.plugin, self.context, &error_message);
                self.reporter
                    .report_execution(Execution::FetchError, &self.plugin, &error_message);
            }
            FetchResponse::NotLoggedIn { login_callback } => {
                self.store
                    .set_not_logged_in(&self.plugin, self.context, login_callback);
                self.reporter
                    .report_execution(Execution::NotLoggedIn, &self.plugin, "");
            }
        }
    }

    fn crash(&self, reason: &str) {
        let message = format!("Fetching checks failed: {reason}");
        error!(
            plugin = %self.plugin,
            context = %self.context,
            reason,
            "check pipeline crashed, giving up"
        );
        self.reporter.report_error(&self.plugin, &message);
        self.reporter
            .report_execution(Execution::FetchCrashed, &self.plugin, reason);
        self.store.set_error(&self.plugin, self.context, &message);
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        warn!("provider panicked with a non-string payload");
        "provider panicked".to_string()
    }
}
