use checkview_types::{AttemptDetail, Run, StatusIcon};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Attempt bookkeeping for all runs sharing one check name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptInfo {
    /// Ascending by attempt; runs without an attempt number sort first
    pub attempts: Vec<AttemptDetail>,
    pub latest_attempt: Option<u32>,
    pub is_single_attempt: bool,
}

impl AttemptInfo {
    /// A sole run is always the latest. Among several, only a run carrying
    /// the maximum attempt number is; anonymous attempts never are.
    pub fn is_latest(&self, attempt: Option<u32>) -> bool {
        if self.is_single_attempt {
            return true;
        }
        attempt.is_some() && attempt == self.latest_attempt
    }
}

/// Group runs by check name and compute per-name attempt info.
pub fn aggregate(runs: &[Run]) -> HashMap<String, AttemptInfo> {
    let mut map: HashMap<String, AttemptInfo> = HashMap::new();

    for run in runs {
        let detail = AttemptDetail {
            attempt: run.info.attempt,
            icon: StatusIcon::for_run(run),
        };
        match map.entry(run.info.check_name.clone()) {
            Entry::Occupied(mut entry) => {
                let info = entry.get_mut();
                info.is_single_attempt = false;
                // None < Some, so this keeps the highest known attempt
                info.latest_attempt = info.latest_attempt.max(run.info.attempt);
                info.attempts.push(detail);
            }
            Entry::Vacant(entry) => {
                entry.insert(AttemptInfo {
                    attempts: vec![detail],
                    latest_attempt: run.info.attempt,
                    is_single_attempt: true,
                });
            }
        }
    }

    for info in map.values_mut() {
        info.attempts.sort_by_key(|detail| detail.attempt);
    }

    map
}
