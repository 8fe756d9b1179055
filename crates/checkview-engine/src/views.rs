//! Pure projections over a [`ChecksState`] snapshot.
//!
//! Per-context projections take the provider map of that context; use
//! [`plugins_for`] to resolve it (including the selected→latest fallback).
//! [`Memo`] caches a projection until the input map's `Arc` changes.

use checkview_types::{Action, CheckRun, Link, LoginCallback, PatchsetContext, RunResult};
use std::collections::HashMap;
use std::sync::Arc;

use crate::state::{ChecksState, PluginStates};

/// Selected map when a patchset is pinned, otherwise the latest map.
pub fn effective_selected(state: &ChecksState) -> &Arc<PluginStates> {
    if state.patchset_number_selected.is_some() {
        &state.plugin_state_selected
    } else {
        &state.plugin_state_latest
    }
}

pub fn plugins_for(state: &ChecksState, context: PatchsetContext) -> &Arc<PluginStates> {
    match context {
        PatchsetContext::Latest => &state.plugin_state_latest,
        PatchsetContext::Selected => effective_selected(state),
    }
}

pub fn selected_patchset_number(state: &ChecksState) -> Option<u32> {
    state.patchset_number_selected
}

pub fn plugin_registered(plugins: &PluginStates) -> bool {
    !plugins.is_empty()
}

pub fn some_loading(plugins: &PluginStates) -> bool {
    plugins.iter().any(|s| s.loading)
}

pub fn some_loading_first_time(plugins: &PluginStates) -> bool {
    plugins.iter().any(|s| s.first_time_load)
}

/// First error in registration order.
pub fn first_error_message(plugins: &PluginStates) -> Option<String> {
    plugins
        .iter()
        .find_map(|s| s.error_message().map(str::to_string))
}

/// Plugin name → error message, in registration order.
pub fn error_messages(plugins: &PluginStates) -> Vec<(String, String)> {
    plugins
        .iter()
        .filter_map(|s| {
            s.error_message()
                .map(|message| (s.plugin_name.clone(), message.to_string()))
        })
        .collect()
}

pub fn first_login_callback(plugins: &PluginStates) -> Option<LoginCallback> {
    plugins.iter().find_map(|s| s.login_callback().cloned())
}

pub fn top_level_actions(plugins: &PluginStates) -> Vec<Action> {
    plugins
        .iter()
        .flat_map(|s| s.actions.iter().cloned())
        .collect()
}

pub fn top_level_links(plugins: &PluginStates) -> Vec<Link> {
    plugins
        .iter()
        .flat_map(|s| s.links.iter().cloned())
        .collect()
}

pub fn all_runs(plugins: &PluginStates) -> Vec<Arc<CheckRun>> {
    plugins
        .iter()
        .flat_map(|s| s.runs.iter().cloned())
        .collect()
}

pub fn all_runs_latest_attempt(plugins: &PluginStates) -> Vec<Arc<CheckRun>> {
    plugins
        .iter()
        .flat_map(|s| s.runs.iter())
        .filter(|run| run.is_latest_attempt)
        .cloned()
        .collect()
}

pub fn all_results(plugins: &PluginStates) -> Vec<Arc<RunResult>> {
    plugins
        .iter()
        .flat_map(|s| s.runs.iter())
        .flat_map(|run| run.results.iter().cloned())
        .collect()
}

/// Check name → owning plugin. Expects the latest-context map.
///
/// When two plugins report the same check name the later-registered one wins.
pub fn check_to_plugin_map(plugins: &PluginStates) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for state in plugins {
        for run in state.runs.iter() {
            map.insert(run.check_name().to_string(), state.plugin_name.clone());
        }
    }
    map
}

/// Single-slot cache keyed by the identity of the input map.
pub struct Memo<T> {
    input: Option<Arc<PluginStates>>,
    output: Option<T>,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
        }
    }
}

impl<T: Clone> Memo<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(
        &mut self,
        input: &Arc<PluginStates>,
        compute: impl FnOnce(&PluginStates) -> T,
    ) -> T {
        let fresh = match &self.input {
            Some(previous) => !Arc::ptr_eq(previous, input),
            None => true,
        };
        if !fresh && let Some(output) = &self.output {
            return output.clone();
        }
        let output = compute(input);
        self.input = Some(input.clone());
        self.output = Some(output.clone());
        output
    }
}
