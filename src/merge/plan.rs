//! Merge planning - pure functions for validating and planning a merge
//!
//! No I/O happens here: the executor gathers the MR and its diffs and hands
//! them in, which keeps every precondition unit-testable.

use crate::error::{Error, Result};
use crate::types::{
    MergeOptions, MergeRequest, MergeRequestDiff, MrState, PipelineStatus, SyncIdentity,
};

/// Line prefix git uses for a submodule pointer in a diff
const SUBPROJECT_PREFIX: &str = "+Subproject commit ";

/// Inputs for one merge run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeParams {
    /// Submodule and external branch
    pub identity: SyncIdentity,
    /// Branch the MR targets
    pub target_branch: String,
    /// SHA the MR must pin the submodule to
    pub sha: String,
    /// Merge once the pipeline passes instead of immediately
    pub merge_when_pipeline_succeeds: bool,
}

/// A validated merge, ready to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePlan {
    /// MR to merge
    pub iid: u64,
    /// Options for the merge call
    pub options: MergeOptions,
}

/// How a merge call ended, when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// GitLab merged the MR
    Merged {
        /// MR iid
        iid: u64,
        /// MR web URL
        web_url: String,
    },
    /// GitLab accepted the request but the MR is not merged yet (for
    /// example, set to merge when a still-running pipeline succeeds).
    /// Re-run to observe the final state.
    Pending {
        /// MR iid
        iid: u64,
        /// Pipeline status at the time of the call
        status: PipelineStatus,
    },
}

/// The single open MR for a source/target pair
pub fn select_single_mr(
    mut open: Vec<MergeRequest>,
    source_branch: &str,
    target_branch: &str,
) -> Result<MergeRequest> {
    match open.len() {
        0 => Err(Error::MrNotFound {
            source_branch: source_branch.to_string(),
            target_branch: target_branch.to_string(),
        }),
        1 => Ok(open.remove(0)),
        count => Err(Error::MultipleOpenMrs {
            source_branch: source_branch.to_string(),
            target_branch: target_branch.to_string(),
            count,
        }),
    }
}

/// Fail with [`Error::MrHasConflicts`] if GitLab reports conflicts
pub fn check_conflicts(mr: &MergeRequest) -> Result<()> {
    if mr.has_conflicts {
        return Err(Error::MrHasConflicts { iid: mr.iid });
    }
    Ok(())
}

/// Path of the submodule named `name` in `.gitmodules` content
///
/// Like `git config --get`, the last `path` in the section wins.
pub fn gitmodules_path(content: &str, name: &str) -> Option<String> {
    let header = format!("[submodule \"{name}\"]");
    let mut in_section = false;
    let mut found = None;

    for line in content.lines().map(str::trim) {
        if line.starts_with('[') {
            in_section = line == header;
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((key, value)) = line.split_once('=')
            && key.trim().eq_ignore_ascii_case("path")
        {
            let value = value.trim().trim_matches('"');
            if !value.is_empty() {
                found = Some(value.to_string());
            }
        }
    }
    found
}

/// Whether the diff of the submodule at `path` moves its pointer to `sha`
///
/// Diffs of other paths are ignored. `sha` may be abbreviated; an empty
/// `sha` never matches.
pub fn diff_pins_sha(diffs: &[MergeRequestDiff], path: &str, sha: &str) -> bool {
    let sha = sha.trim();
    !sha.is_empty()
        && diffs.iter().filter(|d| d.new_path == path).any(|d| {
            d.diff.lines().any(|line| {
                line.strip_prefix(SUBPROJECT_PREFIX)
                    .is_some_and(|pinned| crate::sync::sha_matches(pinned.trim(), sha))
            })
        })
}

/// Message for the merge commit
pub fn merge_commit_message(params: &MergeParams) -> String {
    format!(
        "Merge branch '{}' into '{}'\n\nUpdate submodule '{}' to `{}` from '{}'.",
        params.identity.source_branch_name(),
        params.target_branch,
        params.identity.submodule,
        params.sha,
        params.identity.external_branch
    )
}

/// Validate the MR against `params` and produce a plan (PURE)
///
/// Checks run in order: conflicts, then the diff of `submodule_path`.
pub fn create_merge_plan(
    mr: &MergeRequest,
    diffs: &[MergeRequestDiff],
    submodule_path: &str,
    params: &MergeParams,
) -> Result<MergePlan> {
    check_conflicts(mr)?;

    if !diff_pins_sha(diffs, submodule_path, &params.sha) {
        return Err(Error::MrDiffMissingExpectedSha {
            iid: mr.iid,
            sha: params.sha.clone(),
        });
    }

    Ok(MergePlan {
        iid: mr.iid,
        options: MergeOptions {
            merge_when_pipeline_succeeds: params.merge_when_pipeline_succeeds,
            sha: mr.sha.clone(),
            merge_commit_message: merge_commit_message(params),
        },
    })
}

/// Classify the MR returned by the merge call
pub fn classify_merge_result(mr: &MergeRequest) -> Result<MergeOutcome> {
    if mr.state == MrState::Merged {
        return Ok(MergeOutcome::Merged {
            iid: mr.iid,
            web_url: mr.web_url.clone(),
        });
    }

    match &mr.pipeline_status {
        // A passed pipeline with an unmerged MR has no explanation we can act on
        status @ (PipelineStatus::Failed | PipelineStatus::Canceled | PipelineStatus::Success) => {
            Err(Error::MergeNotCompleted {
                iid: mr.iid,
                status: status.clone(),
            })
        }
        status => Ok(MergeOutcome::Pending {
            iid: mr.iid,
            status: status.clone(),
        }),
    }
}
