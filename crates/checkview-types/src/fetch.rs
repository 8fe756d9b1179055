use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::action::{Action, LoginCallback};
use crate::change::ChangeInfo;
use crate::run::{Link, Run};
use crate::{Error, Result};

/// Which patchset a piece of check state belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchsetContext {
    /// Tracks the newest revision of the change
    Latest,
    /// The user's pinned revision, falling back to latest when unpinned
    Selected,
}

impl PatchsetContext {
    pub fn all() -> [PatchsetContext; 2] {
        [PatchsetContext::Latest, PatchsetContext::Selected]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PatchsetContext::Latest => "latest",
            PatchsetContext::Selected => "selected",
        }
    }
}

impl fmt::Display for PatchsetContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatchsetContext {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "latest" => Ok(PatchsetContext::Latest),
            "selected" => Ok(PatchsetContext::Selected),
            other => Err(Error::unknown("patchset context", other)),
        }
    }
}

/// Payload passed to a provider's fetch capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeData {
    pub change_number: u64,
    pub patchset_number: u32,
    pub patchset_sha: String,
    pub repo: String,
    pub commit_message: Option<String>,
    pub change_info: Arc<ChangeInfo>,
}

/// What a provider answers to a fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResponse {
    Ok {
        runs: Vec<Run>,
        actions: Vec<Action>,
        links: Vec<Link>,
    },
    Error {
        error_message: String,
    },
    NotLoggedIn {
        login_callback: LoginCallback,
    },
}

impl FetchResponse {
    /// An `Ok` response without any data.
    pub fn empty() -> Self {
        FetchResponse::Ok {
            runs: Vec::new(),
            actions: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn with_runs(runs: Vec<Run>) -> Self {
        FetchResponse::Ok {
            runs,
            actions: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        FetchResponse::Error {
            error_message: message.into(),
        }
    }

    pub fn response_code(&self) -> &'static str {
        match self {
            FetchResponse::Ok { .. } => "OK",
            FetchResponse::Error { .. } => "ERROR",
            FetchResponse::NotLoggedIn { .. } => "NOT_LOGGED_IN",
        }
    }
}
