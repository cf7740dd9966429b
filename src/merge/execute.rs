//! Merge execution - effectful operations
//!
//! Gathers the MR and its diffs, hands them to the pure planner, and issues
//! the merge call only when every precondition holds.

use crate::error::{Error, Result};
use crate::merge::plan::{
    MergeOutcome, MergeParams, check_conflicts, classify_merge_result, create_merge_plan,
    gitmodules_path, select_single_mr,
};
use crate::platform::PlatformService;
use crate::progress::ProgressCallback;
use tracing::{debug, info};

/// Validate and merge the sync MR described by `params` (EFFECTFUL)
///
/// Diffs are only fetched for conflict-free MRs, and the merge is only
/// requested once the plan validates. The submodule path is read from
/// `.gitmodules` on the MR's source branch.
pub async fn execute_merge(
    platform: &dyn PlatformService,
    params: &MergeParams,
    progress: &dyn ProgressCallback,
) -> Result<MergeOutcome> {
    let source_branch = params.identity.source_branch_name();
    let open = platform
        .list_open_mrs(&source_branch, &params.target_branch)
        .await?;
    let mr = select_single_mr(open, &source_branch, &params.target_branch)?;
    progress
        .on_message(&format!("Found merge request !{}", mr.iid))
        .await;

    check_conflicts(&mr)?;
    let submodule = &params.identity.submodule;
    let path = platform
        .get_file(".gitmodules", &source_branch)
        .await?
        .and_then(|content| gitmodules_path(&content, submodule))
        .ok_or_else(|| Error::SubmodulePathNotFound(submodule.clone()))?;
    debug!(%submodule, %path, "resolved submodule path on source branch");

    let diffs = platform.get_mr_diffs(mr.iid).await?;
    let plan = create_merge_plan(&mr, &diffs, &path, params)?;

    progress
        .on_message(&format!("Merging !{} ({})", plan.iid, params.sha))
        .await;
    let merged = platform.merge_mr(plan.iid, &plan.options).await?;
    let outcome = classify_merge_result(&merged)?;

    info!(mr_iid = plan.iid, outcome = ?outcome, "merge call classified");
    Ok(outcome)
}
