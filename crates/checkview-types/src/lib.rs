pub mod action;
pub mod change;
pub mod error;
pub mod fetch;
pub mod run;

pub use action::{Action, ActionCallback, ActionInvocation, ActionResult, LoginCallback};
pub use change::{ChangeInfo, CommitInfo, RevisionInfo};
pub use error::{Error, Result};
pub use fetch::{ChangeData, FetchResponse, PatchsetContext};
pub use run::{
    AttemptDetail, Category, CheckResult, CheckRun, Link, Run, RunInfo, RunResult, RunStatus,
    StatusIcon, Tag,
};
