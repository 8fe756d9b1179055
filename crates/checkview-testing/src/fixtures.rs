//! Sample changes and runs.

use checkview_types::{Category, ChangeInfo, CheckResult, Run, RunStatus};

pub const SAMPLE_PROJECT: &str = "platform/tools";

/// Revision sha used by [`sample_change`] for patchset `number`.
pub fn sample_sha(number: u32) -> String {
    format!("sha{number:03}")
}

/// Change `number` with patchsets `1..=patchsets`, the last one current.
pub fn sample_change(number: u64, patchsets: u32) -> ChangeInfo {
    (1..=patchsets).fold(ChangeInfo::new(number, SAMPLE_PROJECT), |change, ps| {
        change.with_revision(sample_sha(ps), ps, &format!("Fix the build\n\nPatchset {ps}"))
    })
}

/// A finished `build` run with one error result, plus a running `lint` run.
pub fn sample_runs(change: u64, patchset: u32) -> Vec<Run> {
    vec![
        Run::new("build", change, patchset)
            .with_attempt(1)
            .with_external_id(format!("build-{patchset}"))
            .with_result(
                CheckResult::new(Category::Error, "Compilation failed")
                    .with_external_id(format!("build-{patchset}-r1"))
                    .with_message("error[E0308]: mismatched types"),
            ),
        Run::new("lint", change, patchset).with_status(RunStatus::Running),
    ]
}

/// `count` attempts of one check, attempts numbered from 1.
pub fn retried_runs(check: &str, change: u64, patchset: u32, count: u32) -> Vec<Run> {
    (1..=count)
        .map(|attempt| Run::new(check, change, patchset).with_attempt(attempt))
        .collect()
}
