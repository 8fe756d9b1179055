use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Arguments handed to an action callback when the user triggers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionInvocation {
    pub change: u64,
    pub patchset: u32,
    pub attempt: Option<u32>,
    pub external_id: Option<String>,
    pub check_name: Option<String>,
    pub action_name: String,
}

/// Outcome reported by a provider after running an action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub should_reload: bool,
}

type ActionFn =
    dyn Fn(ActionInvocation) -> Option<BoxFuture<'static, ActionResult>> + Send + Sync;

/// Provider-supplied handler behind an action button.
///
/// Returning `None` means the provider has nothing to report back, so no
/// progress toast is shown and nothing is awaited.
#[derive(Clone)]
pub struct ActionCallback(Arc<ActionFn>);

impl ActionCallback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(ActionInvocation) -> Option<BoxFuture<'static, ActionResult>> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, invocation: ActionInvocation) -> Option<BoxFuture<'static, ActionResult>> {
        (self.0)(invocation)
    }
}

impl fmt::Debug for ActionCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ActionCallback(..)")
    }
}

impl PartialEq for ActionCallback {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Callback a provider hands out when the user must log in first.
#[derive(Clone)]
pub struct LoginCallback(Arc<dyn Fn() + Send + Sync>);

impl LoginCallback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn invoke(&self) {
        (self.0)()
    }
}

impl fmt::Debug for LoginCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LoginCallback(..)")
    }
}

impl PartialEq for LoginCallback {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A button offered by a provider, either top-level or attached to a run/result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub summary: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(skip)]
    pub callback: Option<ActionCallback>,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_callback(mut self, callback: ActionCallback) -> Self {
        self.callback = Some(callback);
        self
    }
}
