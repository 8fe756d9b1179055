use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::action::Action;
use crate::{Error, Result};

/// Lifecycle of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Runnable,
    Scheduled,
    Running,
    Completed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Runnable => "RUNNABLE",
            RunStatus::Scheduled => "SCHEDULED",
            RunStatus::Running => "RUNNING",
            RunStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RUNNABLE" => Ok(RunStatus::Runnable),
            "SCHEDULED" => Ok(RunStatus::Scheduled),
            "RUNNING" => Ok(RunStatus::Running),
            "COMPLETED" => Ok(RunStatus::Completed),
            other => Err(Error::unknown("run status", other)),
        }
    }
}

/// Severity of a result. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Success,
    Info,
    Warning,
    Error,
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SUCCESS" => Ok(Category::Success),
            "INFO" => Ok(Category::Info),
            "WARNING" => Ok(Category::Warning),
            "ERROR" => Ok(Category::Error),
            other => Err(Error::unknown("category", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    #[serde(default)]
    pub primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Link {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            tooltip: None,
            primary: false,
            icon: None,
        }
    }
}

/// One finding reported by a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    /// Stable id used to address this result in incremental updates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub category: Category,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl CheckResult {
    pub fn new(category: Category, summary: impl Into<String>) -> Self {
        Self {
            external_id: None,
            category,
            summary: summary.into(),
            message: None,
            tags: Vec::new(),
            links: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Descriptive fields of a run, shared by the raw and the derived shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInfo {
    pub change: u64,
    pub patchset: u32,
    /// Absent when the provider has no notion of attempts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub check_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_link: Option<String>,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_name: Option<String>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_timestamp: Option<DateTime<Utc>>,
}

impl RunInfo {
    /// Deterministic key `checkName-change-patchset-attempt`.
    pub fn internal_run_id(&self) -> String {
        let attempt = self
            .attempt
            .map(|a| a.to_string())
            .unwrap_or_else(|| "none".to_string());
        format!(
            "{}-{}-{}-{}",
            self.check_name, self.change, self.patchset, attempt
        )
    }

    /// True if both describe the same (change, patchset, attempt, check) tuple.
    pub fn same_run(&self, other: &RunInfo) -> bool {
        self.change == other.change
            && self.patchset == other.patchset
            && self.attempt == other.attempt
            && self.check_name == other.check_name
    }
}

/// A run as reported by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    #[serde(flatten)]
    pub info: RunInfo,
    #[serde(default)]
    pub results: Vec<CheckResult>,
}

impl Run {
    pub fn new(check_name: impl Into<String>, change: u64, patchset: u32) -> Self {
        Self {
            info: RunInfo {
                change,
                patchset,
                attempt: None,
                external_id: None,
                check_name: check_name.into(),
                check_description: None,
                check_link: None,
                status: RunStatus::Completed,
                status_description: None,
                status_link: None,
                label_name: None,
                actions: Vec::new(),
                scheduled_timestamp: None,
                started_timestamp: None,
                finished_timestamp: None,
            },
            results: Vec::new(),
        }
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.info.attempt = Some(attempt);
        self
    }

    pub fn with_status(mut self, status: RunStatus) -> Self {
        self.info.status = status;
        self
    }

    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.info.external_id = Some(id.into());
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.info.actions.push(action);
        self
    }

    pub fn with_result(mut self, result: CheckResult) -> Self {
        self.results.push(result);
        self
    }
}

/// Icon summarising one attempt of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusIcon {
    Error,
    Warning,
    Info,
    Success,
    Runnable,
    Scheduled,
    Running,
}

impl StatusIcon {
    /// Pending runs show their status; completed ones their worst result.
    pub fn for_run(run: &Run) -> Self {
        match run.info.status {
            RunStatus::Runnable => StatusIcon::Runnable,
            RunStatus::Scheduled => StatusIcon::Scheduled,
            RunStatus::Running => StatusIcon::Running,
            RunStatus::Completed => run
                .results
                .iter()
                .map(|r| r.category)
                .max()
                .map(StatusIcon::from)
                .unwrap_or(StatusIcon::Success),
        }
    }
}

impl From<Category> for StatusIcon {
    fn from(category: Category) -> Self {
        match category {
            Category::Error => StatusIcon::Error,
            Category::Warning => StatusIcon::Warning,
            Category::Info => StatusIcon::Info,
            Category::Success => StatusIcon::Success,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptDetail {
    pub attempt: Option<u32>,
    pub icon: StatusIcon,
}

/// A result enriched with its session-local id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    #[serde(flatten)]
    pub result: CheckResult,
    pub internal_result_id: String,
}

/// A run enriched with attempt bookkeeping, as held in provider state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRun {
    #[serde(flatten)]
    pub info: RunInfo,
    pub internal_run_id: String,
    pub is_latest_attempt: bool,
    pub is_single_attempt: bool,
    pub attempt_details: Vec<AttemptDetail>,
    pub results: Vec<Arc<RunResult>>,
}

impl CheckRun {
    pub fn check_name(&self) -> &str {
        &self.info.check_name
    }
}
