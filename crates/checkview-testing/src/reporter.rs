use checkview_runtime::{Execution, Reporter};
use std::sync::Mutex;

/// `Reporter` that keeps every call for later assertions.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    executions: Mutex<Vec<(Execution, String, String)>>,
    errors: Mutex<Vec<(String, String)>>,
    actions: Mutex<Vec<(String, Option<String>)>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(execution, plugin, message)` in call order.
    pub fn executions(&self) -> Vec<(Execution, String, String)> {
        self.executions.lock().unwrap().clone()
    }

    pub fn execution_count(&self, execution: Execution) -> usize {
        self.executions
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _, _)| *e == execution)
            .count()
    }

    /// `(plugin, message)` in call order.
    pub fn errors(&self) -> Vec<(String, String)> {
        self.errors.lock().unwrap().clone()
    }

    /// `(action name, check name)` in call order.
    pub fn actions(&self) -> Vec<(String, Option<String>)> {
        self.actions.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn report_execution(&self, execution: Execution, plugin: &str, message: &str) {
        self.executions
            .lock()
            .unwrap()
            .push((execution, plugin.to_string(), message.to_string()));
    }

    fn report_error(&self, plugin: &str, message: &str) {
        self.errors
            .lock()
            .unwrap()
            .push((plugin.to_string(), message.to_string()));
    }

    fn report_action_triggered(&self, action_name: &str, check_name: Option<&str>) {
        self.actions
            .lock()
            .unwrap()
            .push((action_name.to_string(), check_name.map(str::to_string)));
    }
}
