use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Commit metadata attached to a revision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

/// One revision (patchset) of a change, keyed by its commit sha in [`ChangeInfo::revisions`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionInfo {
    #[serde(rename = "_number")]
    pub number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<CommitInfo>,
}

/// The subset of a code-review change that check providers consume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeInfo {
    #[serde(rename = "_number")]
    pub number: u64,
    pub project: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_revision: Option<String>,
    #[serde(default)]
    pub revisions: HashMap<String, RevisionInfo>,
}

impl ChangeInfo {
    pub fn new(number: u64, project: impl Into<String>) -> Self {
        Self {
            number,
            project: project.into(),
            ..Default::default()
        }
    }

    /// Add a revision; the most recently added one becomes current.
    pub fn with_revision(mut self, sha: impl Into<String>, number: u32, message: &str) -> Self {
        let sha = sha.into();
        self.revisions.insert(
            sha.clone(),
            RevisionInfo {
                number,
                commit: Some(CommitInfo {
                    subject: message.lines().next().unwrap_or_default().to_string(),
                    message: message.to_string(),
                }),
            },
        );
        self.current_revision = Some(sha);
        self
    }

    /// Commit sha of the revision carrying the given patchset number.
    pub fn sha_for_patchset(&self, patchset: u32) -> Option<&str> {
        self.revisions
            .iter()
            .find(|(_, rev)| rev.number == patchset)
            .map(|(sha, _)| sha.as_str())
    }

    pub fn latest_patchset(&self) -> Option<u32> {
        self.revisions.values().map(|rev| rev.number).max()
    }

    pub fn current_commit_message(&self) -> Option<&str> {
        let sha = self.current_revision.as_deref()?;
        self.revisions
            .get(sha)?
            .commit
            .as_ref()
            .map(|c| c.message.as_str())
    }
}
