//! Push Update Tests
//!
//! Single results pushed by a provider outside of a fetch.

use checkview_testing::TestWorld;
use checkview_testing::providers::StubProvider;
use checkview_testing::wait::{settled_everywhere, wait_for_state};
use checkview_types::{Category, CheckResult, PatchsetContext};
use std::sync::Arc;

#[tokio::test]
async fn test_pushed_result_replaces_matching_result() {
    let world = TestWorld::new().with_change(42, 1);
    world.register("ci", StubProvider::sample());
    let before = wait_for_state(world.model(), settled_everywhere("ci")).await;

    let ci = before.provider(PatchsetContext::Latest, "ci").unwrap();
    let build = ci.runs[0].clone();
    let lint = ci.runs[1].clone();
    let original_id = build.results[0].internal_result_id.clone();

    let fixed =
        CheckResult::new(Category::Success, "Compilation fixed").with_external_id("build-1-r1");
    assert!(world.model().update_result("ci", &build.info, &fixed));

    let after = world.model().snapshot();
    for context in PatchsetContext::all() {
        let ci = after.provider(context, "ci").unwrap();
        let result = &ci.runs[0].results[0];
        assert_eq!(result.result.summary, "Compilation fixed");
        assert_eq!(result.result.category, Category::Success);
        assert_eq!(result.internal_result_id, original_id);
    }

    // Untouched runs keep their identity
    let ci = after.provider(PatchsetContext::Latest, "ci").unwrap();
    assert!(Arc::ptr_eq(&ci.runs[1], &lint));
}

#[tokio::test]
async fn test_pushed_result_without_match_is_ignored() {
    let world = TestWorld::new().with_change(42, 1);
    world.register("ci", StubProvider::sample());
    let before = wait_for_state(world.model(), settled_everywhere("ci")).await;
    let build = before.provider(PatchsetContext::Latest, "ci").unwrap().runs[0].clone();

    let stray = CheckResult::new(Category::Info, "who am I").with_external_id("nope");
    assert!(!world.model().update_result("ci", &build.info, &stray));
    assert!(!world.model().update_result("lint", &build.info, &stray));
    assert!(Arc::ptr_eq(&before, &world.model().snapshot()));
}
