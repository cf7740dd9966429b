//! Merge engine for sync MRs
//!
//! Three-phase pattern:
//! 1. Gather - find the single open MR, its submodule path and diffs (effectful)
//! 2. Plan - validate preconditions and build `MergePlan` (pure, testable)
//! 3. Execute - request the merge and classify the result (effectful)

mod execute;
mod plan;

pub use execute::execute_merge;
pub use plan::{
    MergeOutcome, MergeParams, MergePlan, check_conflicts, classify_merge_result,
    create_merge_plan, diff_pins_sha, gitmodules_path, merge_commit_message, select_single_mr,
};
