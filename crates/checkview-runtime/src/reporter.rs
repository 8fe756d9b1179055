use tracing::{error, info, warn};

/// Kinds of provider outcomes counted by telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Execution {
    /// Provider answered with a classified error
    FetchError,
    /// Provider requires the user to log in
    NotLoggedIn,
    /// Fetch failed outside of the classified response; provider is dead
    FetchCrashed,
}

impl Execution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Execution::FetchError => "checks-api-error",
            Execution::NotLoggedIn => "checks-api-not-logged-in",
            Execution::FetchCrashed => "checks-fetch-crashed",
        }
    }
}

/// Telemetry sink.
pub trait Reporter: Send + Sync {
    fn report_execution(&self, execution: Execution, plugin: &str, message: &str);

    fn report_error(&self, plugin: &str, message: &str);

    fn report_action_triggered(&self, action_name: &str, check_name: Option<&str>);
}

/// Default reporter writing structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report_execution(&self, execution: Execution, plugin: &str, message: &str) {
        warn!(execution = execution.as_str(), plugin, message, "checks execution");
    }

    fn report_error(&self, plugin: &str, message: &str) {
        error!(plugin, message, "checks provider failed");
    }

    fn report_action_triggered(&self, action_name: &str, check_name: Option<&str>) {
        info!(action = action_name, check = check_name, "checks action triggered");
    }
}
