use checkview_types::{Action, ActionInvocation, RunInfo};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::events::UiEvent;
use crate::model::ChecksModel;

impl ChecksModel {
    /// Invoke an action's callback for `run`, or for the change as a whole.
    ///
    /// Returns `None` when nothing was started: no callback, no change
    /// loaded, or a callback with nothing to await. Otherwise the returned
    /// task resolves once the result (or the timeout) has been handled.
    pub fn trigger_action(&self, action: &Action, run: Option<&RunInfo>) -> Option<JoinHandle<()>> {
        let callback = action.callback.as_ref()?;
        let signals = &self.inner.signals;
        let change = signals.current_change_number()?;
        let patchset = run
            .map(|r| r.patchset)
            .or_else(|| signals.current_latest_patchset())?;

        let check_name = run.map(|r| r.check_name.clone());
        self.inner
            .reporter
            .report_action_triggered(&action.name, check_name.as_deref());

        let invocation = ActionInvocation {
            change,
            patchset,
            attempt: run.and_then(|r| r.attempt),
            external_id: run.and_then(|r| r.external_id.clone()),
            check_name: check_name.clone(),
            action_name: action.name.clone(),
        };
        let pending = callback.call(invocation)?;

        let _ = self.inner.ui_events.send(UiEvent::ShowAlert {
            message: format!("Triggering action '{}' ...", action.name),
            show_dismiss: true,
        });

        let inner = Arc::downgrade(&self.inner);
        let timeout = self.inner.config.action_timeout();
        let action_name = action.name.clone();
        Some(tokio::spawn(async move {
            let Ok(result) = tokio::time::timeout(timeout, pending).await else {
                debug!(action = %action_name, "no action result in time");
                return;
            };
            let Some(inner) = inner.upgrade() else { return };

            let event = match result.message.or(result.error_message) {
                Some(message) => UiEvent::alert(message),
                None => UiEvent::HideAlert,
            };
            let _ = inner.ui_events.send(event);

            if result.should_reload {
                inner.reload_for_check(check_name.as_deref());
            }
        }))
    }
}
