use checkview_types::{
    Action, CheckResult, CheckRun, Link, LoginCallback, PatchsetContext, Run, RunInfo, RunResult,
};
use std::sync::Arc;

use crate::attempts::aggregate;

/// Mutually exclusive outcome of a provider's last fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ProviderStatus {
    #[default]
    Ok,
    Error(String),
    NotLoggedIn(LoginCallback),
}

impl ProviderStatus {
    pub fn error_message(&self) -> Option<&str> {
        match self {
            ProviderStatus::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn login_callback(&self) -> Option<&LoginCallback> {
        match self {
            ProviderStatus::NotLoggedIn(callback) => Some(callback),
            _ => None,
        }
    }
}

/// State of one provider in one patchset context
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderState {
    pub plugin_name: String,
    /// A fetch is in flight; previous data stays visible meanwhile
    pub loading: bool,
    /// No response has landed yet
    pub first_time_load: bool,
    pub status: ProviderStatus,
    pub runs: Arc<Vec<Arc<CheckRun>>>,
    pub actions: Arc<Vec<Action>>,
    pub links: Arc<Vec<Link>>,
}

impl ProviderState {
    pub fn new(plugin_name: impl Into<String>) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            loading: false,
            first_time_load: true,
            status: ProviderStatus::Ok,
            runs: Arc::default(),
            actions: Arc::default(),
            links: Arc::default(),
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.status.error_message()
    }

    pub fn login_callback(&self) -> Option<&LoginCallback> {
        self.status.login_callback()
    }
}

/// Provider states of one context, in registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginStates(Vec<Arc<ProviderState>>);

impl PluginStates {
    pub fn get(&self, plugin: &str) -> Option<&Arc<ProviderState>> {
        self.0.iter().find(|state| state.plugin_name == plugin)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ProviderState>> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Replace the entry for `state.plugin_name` in place, or append it.
    fn with(&self, state: ProviderState) -> PluginStates {
        let mut next = self.0.clone();
        match next.iter().position(|s| s.plugin_name == state.plugin_name) {
            Some(index) => next[index] = Arc::new(state),
            None => next.push(Arc::new(state)),
        }
        PluginStates(next)
    }

    fn without(&self, plugin: &str) -> Option<PluginStates> {
        self.get(plugin)?;
        Some(PluginStates(
            self.0
                .iter()
                .filter(|s| s.plugin_name != plugin)
                .cloned()
                .collect(),
        ))
    }
}

impl<'a> IntoIterator for &'a PluginStates {
    type Item = &'a Arc<ProviderState>;
    type IntoIter = std::slice::Iter<'a, Arc<ProviderState>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Root snapshot. Every mutation yields a new value; untouched subtrees
/// keep their `Arc` identity so observers can skip recomputation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChecksState {
    /// Pinned patchset, `None` means "follow latest"
    pub patchset_number_selected: Option<u32>,
    pub plugin_state_latest: Arc<PluginStates>,
    pub plugin_state_selected: Arc<PluginStates>,
}

impl ChecksState {
    /// Raw per-context map, without the selected→latest fallback.
    pub fn plugins(&self, context: PatchsetContext) -> &Arc<PluginStates> {
        match context {
            PatchsetContext::Latest => &self.plugin_state_latest,
            PatchsetContext::Selected => &self.plugin_state_selected,
        }
    }

    pub fn provider(&self, context: PatchsetContext, plugin: &str) -> Option<&Arc<ProviderState>> {
        self.plugins(context).get(plugin)
    }

    fn with_plugins(&self, context: PatchsetContext, plugins: PluginStates) -> ChecksState {
        let mut next = self.clone();
        match context {
            PatchsetContext::Latest => next.plugin_state_latest = Arc::new(plugins),
            PatchsetContext::Selected => next.plugin_state_selected = Arc::new(plugins),
        }
        next
    }

    fn update_provider(
        &self,
        context: PatchsetContext,
        plugin: &str,
        update: impl FnOnce(&mut ProviderState),
    ) -> ChecksState {
        let plugins = self.plugins(context);
        let mut state = plugins
            .get(plugin)
            .map(|s| ProviderState::clone(s))
            .unwrap_or_else(|| ProviderState::new(plugin));
        update(&mut state);
        self.with_plugins(context, plugins.with(state))
    }

    /// Fresh entry for a newly registered provider, overwriting any prior one.
    pub fn with_provider(&self, context: PatchsetContext, plugin: &str) -> ChecksState {
        self.with_plugins(context, self.plugins(context).with(ProviderState::new(plugin)))
    }

    pub fn without_provider(&self, plugin: &str) -> Option<ChecksState> {
        let latest = self.plugin_state_latest.without(plugin);
        let selected = self.plugin_state_selected.without(plugin);
        if latest.is_none() && selected.is_none() {
            return None;
        }
        let mut next = self.clone();
        if let Some(latest) = latest {
            next.plugin_state_latest = Arc::new(latest);
        }
        if let Some(selected) = selected {
            next.plugin_state_selected = Arc::new(selected);
        }
        Some(next)
    }

    pub fn with_loading(&self, context: PatchsetContext, plugin: &str) -> ChecksState {
        self.update_provider(context, plugin, |state| state.loading = true)
    }

    /// Links survive errors so top-level links stay reachable.
    pub fn with_error(&self, context: PatchsetContext, plugin: &str, message: &str) -> ChecksState {
        self.update_provider(context, plugin, |state| {
            state.loading = false;
            state.first_time_load = false;
            state.status = ProviderStatus::Error(message.to_string());
            state.runs = Arc::default();
            state.actions = Arc::default();
        })
    }

    pub fn with_not_logged_in(
        &self,
        context: PatchsetContext,
        plugin: &str,
        callback: LoginCallback,
    ) -> ChecksState {
        self.update_provider(context, plugin, |state| {
            state.loading = false;
            state.first_time_load = false;
            state.status = ProviderStatus::NotLoggedIn(callback);
            state.runs = Arc::default();
            state.actions = Arc::default();
        })
    }

    pub fn with_results(
        &self,
        context: PatchsetContext,
        plugin: &str,
        runs: Vec<Run>,
        actions: Vec<Action>,
        links: Vec<Link>,
    ) -> ChecksState {
        let runs = derive_runs(runs);
        self.update_provider(context, plugin, |state| {
            state.loading = false;
            state.first_time_load = false;
            state.status = ProviderStatus::Ok;
            state.runs = Arc::new(runs);
            state.actions = Arc::new(actions);
            state.links = Arc::new(links);
        })
    }

    /// Swap a single result in both contexts. Returns `None` when neither
    /// context holds a matching result.
    pub fn with_updated_result(
        &self,
        plugin: &str,
        run: &RunInfo,
        result: &CheckResult,
    ) -> Option<ChecksState> {
        let latest = replace_result(&self.plugin_state_latest, plugin, run, result);
        let selected = replace_result(&self.plugin_state_selected, plugin, run, result);
        if latest.is_none() && selected.is_none() {
            return None;
        }
        let mut next = self.clone();
        if let Some(latest) = latest {
            next.plugin_state_latest = Arc::new(latest);
        }
        if let Some(selected) = selected {
            next.plugin_state_selected = Arc::new(selected);
        }
        Some(next)
    }

    pub fn with_patchset(&self, patchset: Option<u32>) -> ChecksState {
        ChecksState {
            patchset_number_selected: patchset,
            ..self.clone()
        }
    }
}

/// Attach attempt flags and session-local ids to raw provider runs.
fn derive_runs(runs: Vec<Run>) -> Vec<Arc<CheckRun>> {
    let attempts = aggregate(&runs);
    runs.into_iter()
        .map(|run| {
            let info = attempts.get(&run.info.check_name).cloned().unwrap_or_default();
            let internal_run_id = run.info.internal_run_id();
            let results = run
                .results
                .into_iter()
                .enumerate()
                .map(|(index, result)| {
                    Arc::new(RunResult {
                        result,
                        internal_result_id: format!("{internal_run_id}-{index}"),
                    })
                })
                .collect();
            Arc::new(CheckRun {
                is_latest_attempt: info.is_latest(run.info.attempt),
                is_single_attempt: info.is_single_attempt,
                attempt_details: info.attempts,
                internal_run_id,
                info: run.info,
                results,
            })
        })
        .collect()
}

fn replace_result(
    plugins: &PluginStates,
    plugin: &str,
    target: &RunInfo,
    updated: &CheckResult,
) -> Option<PluginStates> {
    let external_id = updated.external_id.as_deref()?;
    let state = plugins.get(plugin)?;

    let mut replaced = false;
    let runs: Vec<Arc<CheckRun>> = state
        .runs
        .iter()
        .map(|run| {
            if !run.info.same_run(target) {
                return run.clone();
            }
            let position = run
                .results
                .iter()
                .position(|r| r.result.external_id.as_deref() == Some(external_id));
            let Some(position) = position else {
                return run.clone();
            };
            replaced = true;
            let mut results = run.results.clone();
            results[position] = Arc::new(RunResult {
                result: updated.clone(),
                internal_result_id: run.results[position].internal_result_id.clone(),
            });
            Arc::new(CheckRun {
                results,
                ..CheckRun::clone(run)
            })
        })
        .collect();

    if !replaced {
        return None;
    }

    let mut next = ProviderState::clone(state);
    next.runs = Arc::new(runs);
    Some(plugins.with(next))
}
