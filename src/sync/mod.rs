//! Sync engine
//!
//! Two stages, run in order by [`sync_branch`]:
//! 1. Reconcile - rewrite the sync branch to one pointer-update commit
//! 2. Upsert - create or edit the MR for that branch

mod merge_request;
mod provenance;
mod reconcile;
mod submodule;

pub use merge_request::{
    MergeRequestManager, UpsertOutcome, merge_request_description, merge_request_title,
};
pub use provenance::validate_provenance;
pub use reconcile::{BranchReconciler, ReconcileOutcome, ReconcileState, SyncRequest};
pub use submodule::{SubmodulePinner, sha_matches};

use crate::config::Config;
use crate::error::Result;
use crate::platform::PlatformService;
use crate::progress::ProgressCallback;
use crate::repo::GitClient;

/// Result of a full sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResult {
    /// What was pushed
    pub reconcile: ReconcileOutcome,
    /// What happened to the MR
    pub merge_request: UpsertOutcome,
}

/// Reconcile the sync branch for `request`, then upsert its MR
pub async fn sync_branch(
    git: &dyn GitClient,
    platform: &dyn PlatformService,
    config: &Config,
    request: &SyncRequest,
    progress: &dyn ProgressCallback,
) -> Result<SyncResult> {
    let reconcile = BranchReconciler::new(git, platform, config)
        .reconcile(request, progress)
        .await?;

    let title = merge_request_title(&request.identity);
    let description = merge_request_description(
        &request.identity,
        &reconcile.pointer.sha,
        config.pr_url.as_deref(),
    );
    progress.on_message("Updating merge request").await;
    let merge_request = MergeRequestManager::new(platform)
        .upsert(
            &reconcile.source_branch,
            &request.target_branch,
            &title,
            &description,
        )
        .await?;

    Ok(SyncResult {
        reconcile,
        merge_request,
    })
}
