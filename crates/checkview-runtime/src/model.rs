use checkview_engine::{ChecksState, PluginStates, views};
use checkview_types::{
    Action, CheckResult, CheckRun, Link, LoginCallback, PatchsetContext, RunInfo, RunResult,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ModelConfig, ProviderConfig};
use crate::events::UiEvent;
use crate::pipeline::Pipeline;
use crate::provider::CheckProvider;
use crate::reporter::{Reporter, TracingReporter};
use crate::signals::HostSignals;
use crate::store::ChecksStore;
use crate::view::ViewStream;
use crate::{Error, Result};

const UI_EVENT_CAPACITY: usize = 32;

struct Registration {
    reload: watch::Sender<()>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

pub(crate) struct Inner {
    pub(crate) store: ChecksStore,
    pub(crate) signals: HostSignals,
    pub(crate) config: ModelConfig,
    pub(crate) reporter: Arc<dyn Reporter>,
    pub(crate) ui_events: broadcast::Sender<UiEvent>,
    registry: Mutex<HashMap<String, Registration>>,
    background: Mutex<Vec<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

/// Central checks model.
///
/// Owns the state store and one fetch pipeline per registered provider and
/// patchset context. Must be created inside a tokio runtime. Dropping the
/// model shuts it down.
pub struct ChecksModel {
    pub(crate) inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Inner {
    fn set_patchset(&self, patchset: Option<u32>) {
        let latest = self.signals.current_latest_patchset();
        let normalized = match patchset {
            Some(number) if Some(number) == latest => None,
            other => other,
        };
        self.store.set_patchset(normalized);
    }

    fn reload(&self, plugin: &str) -> bool {
        match lock(&self.registry).get(plugin) {
            Some(registration) => {
                registration.reload.send_replace(());
                true
            }
            None => false,
        }
    }

    pub(crate) fn reload_all(&self) {
        let registry = lock(&self.registry);
        debug!(providers = registry.len(), "reloading all providers");
        for registration in registry.values() {
            registration.reload.send_replace(());
        }
    }

    pub(crate) fn reload_for_check(&self, check_name: Option<&str>) {
        let Some(check_name) = check_name else {
            self.reload_all();
            return;
        };
        let snapshot = self.store.snapshot();
        let owners = views::check_to_plugin_map(&snapshot.plugin_state_latest);
        match owners.get(check_name) {
            Some(plugin) => {
                self.reload(plugin);
            }
            None => debug!(check = check_name, "no provider owns check, nothing to reload"),
        }
    }
}

impl ChecksModel {
    pub fn new(signals: HostSignals, config: ModelConfig, reporter: Arc<dyn Reporter>) -> Self {
        let (ui_events, _) = broadcast::channel(UI_EVENT_CAPACITY);
        let inner = Arc::new(Inner {
            store: ChecksStore::new(),
            signals,
            config,
            reporter,
            ui_events,
            registry: Mutex::new(HashMap::new()),
            background: Mutex::new(Vec::new()),
            shutdown: CancellationToken::new(),
        });

        // Subscribe before returning so nothing sent after construction is missed
        let mut router = inner.signals.router_patchset.clone();
        let mut latest = inner.signals.latest_patchset.clone();
        latest.borrow_and_update();
        inner.set_patchset(*router.borrow_and_update());
        let reloads = inner.signals.reload_events();

        let weak = Arc::downgrade(&inner);
        let shutdown = inner.shutdown.clone();
        let tasks = [
            tokio::spawn(follow_patchset_selection(weak.clone(), router, latest, shutdown.clone())),
            tokio::spawn(follow_reload_broadcast(weak, reloads, shutdown)),
        ];
        lock(&inner.background).extend(tasks);

        Self { inner }
    }

    /// Model with default config and the tracing reporter.
    pub fn with_defaults(signals: HostSignals) -> Self {
        Self::new(signals, ModelConfig::default(), Arc::new(TracingReporter))
    }

    pub fn config(&self) -> &ModelConfig {
        &self.inner.config
    }

    /// Register a provider and start fetching for both patchset contexts.
    ///
    /// Polling interval comes from `config`, then the model's providers
    /// table, then the model default.
    pub fn register(
        &self,
        plugin: &str,
        provider: Arc<dyn CheckProvider>,
        config: Option<ProviderConfig>,
    ) -> Result<()> {
        let inner = &self.inner;
        if inner.shutdown.is_cancelled() {
            return Err(Error::Shutdown);
        }

        let mut registry = lock(&inner.registry);
        if registry.contains_key(plugin) {
            return Err(Error::AlreadyRegistered(plugin.to_string()));
        }

        let provider_config = inner.config.provider_config(plugin, config);
        for context in PatchsetContext::all() {
            inner.store.set_provider(plugin, context);
        }

        let (reload, reload_rx) = watch::channel(());
        let cancel = inner.shutdown.child_token();
        let tasks = PatchsetContext::all()
            .into_iter()
            .map(|context| {
                let pipeline = Pipeline {
                    plugin: plugin.to_string(),
                    context,
                    provider: provider.clone(),
                    store: inner.store.bound_to(cancel.clone()),
                    signals: inner.signals.clone(),
                    reload: reload_rx.clone(),
                    reporter: inner.reporter.clone(),
                    polling: provider_config.polling_interval(),
                    reload_throttle: inner.config.reload_throttle(),
                    cancel: cancel.clone(),
                };
                tokio::spawn(pipeline.run())
            })
            .collect();

        registry.insert(
            plugin.to_string(),
            Registration {
                reload,
                cancel,
                tasks,
            },
        );
        info!(
            plugin,
            polling_seconds = provider_config.fetch_polling_interval_seconds,
            "check provider registered"
        );
        Ok(())
    }

    /// Stop the provider's pipelines and drop its state from both contexts.
    pub fn unregister(&self, plugin: &str) -> Result<()> {
        let registration = lock(&self.inner.registry)
            .remove(plugin)
            .ok_or_else(|| Error::UnknownPlugin(plugin.to_string()))?;
        registration.cancel.cancel();
        self.inner.store.remove_provider(plugin);
        info!(plugin, "check provider unregistered");
        Ok(())
    }

    pub fn is_registered(&self, plugin: &str) -> bool {
        lock(&self.inner.registry).contains_key(plugin)
    }

    /// Refetch one provider, subject to the reload throttle.
    pub fn reload(&self, plugin: &str) -> Result<()> {
        if self.inner.reload(plugin) {
            Ok(())
        } else {
            Err(Error::UnknownPlugin(plugin.to_string()))
        }
    }

    pub fn reload_all(&self) {
        self.inner.reload_all();
    }

    /// Reload the provider owning `check_name`, or everything for `None`.
    /// Unknown check names are ignored.
    pub fn reload_for_check(&self, check_name: Option<&str>) {
        self.inner.reload_for_check(check_name);
    }

    /// Push a single updated result. Returns whether any context held a
    /// matching result.
    pub fn update_result(&self, plugin: &str, run: &RunInfo, result: &CheckResult) -> bool {
        let updated = self.inner.store.update_result(plugin, run, result);
        if !updated {
            debug!(plugin, check = %run.check_name, "pushed result matched nothing");
        }
        updated
    }

    /// Pin a patchset for the selected context. Pinning the latest patchset
    /// is stored as "nothing pinned".
    pub fn set_patchset(&self, patchset: Option<u32>) {
        self.inner.set_patchset(patchset);
    }

    pub fn snapshot(&self) -> Arc<ChecksState> {
        self.inner.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ChecksState>> {
        self.inner.store.subscribe()
    }

    pub fn ui_events(&self) -> broadcast::Receiver<UiEvent> {
        self.inner.ui_events.subscribe()
    }

    /// Cancel every pipeline and background task. Idempotent.
    pub fn shutdown(&self) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        self.inner.shutdown.cancel();
        let registrations: Vec<_> = lock(&self.inner.registry).drain().collect();
        for (_, registration) in &registrations {
            registration.cancel.cancel();
        }
        let pipelines: usize = registrations.iter().map(|(_, r)| r.tasks.len()).sum();
        lock(&self.inner.background).clear();
        info!(providers = registrations.len(), pipelines, "checks model shut down");
    }

    /// Projection over one patchset context, recomputed only when that
    /// context's provider map changes.
    pub fn view<T>(
        &self,
        context: PatchsetContext,
        project: impl Fn(&PluginStates) -> T + Send + 'static,
    ) -> ViewStream<T>
    where
        T: Clone + PartialEq + Send + 'static,
    {
        let mut memo = views::Memo::new();
        ViewStream::new(self.subscribe(), move |state: &ChecksState| {
            memo.get_or_compute(views::plugins_for(state, context), &project)
        })
    }

    pub fn plugin_registered(&self) -> ViewStream<bool> {
        self.view(PatchsetContext::Latest, views::plugin_registered)
    }

    pub fn selected_patchset_number(&self) -> ViewStream<Option<u32>> {
        ViewStream::new(self.subscribe(), views::selected_patchset_number)
    }

    pub fn some_loading(&self, context: PatchsetContext) -> ViewStream<bool> {
        self.view(context, views::some_loading)
    }

    pub fn some_loading_first_time(&self, context: PatchsetContext) -> ViewStream<bool> {
        self.view(context, views::some_loading_first_time)
    }

    pub fn error_message(&self, context: PatchsetContext) -> ViewStream<Option<String>> {
        self.view(context, views::first_error_message)
    }

    pub fn error_messages(&self, context: PatchsetContext) -> ViewStream<Vec<(String, String)>> {
        self.view(context, views::error_messages)
    }

    pub fn login_callback(&self, context: PatchsetContext) -> ViewStream<Option<LoginCallback>> {
        self.view(context, views::first_login_callback)
    }

    pub fn top_level_actions(&self, context: PatchsetContext) -> ViewStream<Vec<Action>> {
        self.view(context, views::top_level_actions)
    }

    pub fn top_level_links(&self, context: PatchsetContext) -> ViewStream<Vec<Link>> {
        self.view(context, views::top_level_links)
    }

    pub fn all_runs(&self, context: PatchsetContext) -> ViewStream<Vec<Arc<CheckRun>>> {
        self.view(context, views::all_runs)
    }

    pub fn all_runs_latest_attempt(
        &self,
        context: PatchsetContext,
    ) -> ViewStream<Vec<Arc<CheckRun>>> {
        self.view(context, views::all_runs_latest_attempt)
    }

    pub fn all_results(&self, context: PatchsetContext) -> ViewStream<Vec<Arc<RunResult>>> {
        self.view(context, views::all_results)
    }

    pub fn check_to_plugin_map(&self) -> ViewStream<HashMap<String, String>> {
        self.view(PatchsetContext::Latest, views::check_to_plugin_map)
    }
}

impl Drop for ChecksModel {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Keep the pin in line with both the router and the latest patchset.
async fn follow_patchset_selection(
    inner: Weak<Inner>,
    mut router: watch::Receiver<Option<u32>>,
    mut latest: watch::Receiver<Option<u32>>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = router.changed() => {
                if changed.is_err() {
                    break;
                }
                let patchset = *router.borrow_and_update();
                let Some(inner) = inner.upgrade() else { break };
                inner.set_patchset(patchset);
            }
            changed = latest.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *latest.borrow_and_update();
                let Some(inner) = inner.upgrade() else { break };
                if inner.store.normalize_patchset(current) {
                    debug!(latest = ?current, "pinned patchset cleared by new latest");
                }
            }
        }
    }
}

async fn follow_reload_broadcast(
    inner: Weak<Inner>,
    mut reloads: broadcast::Receiver<()>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            event = reloads.recv() => match event {
                Ok(()) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "reload broadcast lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
        let Some(inner) = inner.upgrade() else { break };
        inner.reload_all();
    }
}
