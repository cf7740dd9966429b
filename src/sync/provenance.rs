//! Drift detection for sync branches
//!
//! The sync branch is force-rewritten on every run, so every commit between
//! the target tip and the sync tip must carry the salt. Anything else was
//! pushed by a person and would be lost by the reset that follows.

use crate::error::{Error, Result};
use crate::repo::{GitClient, ORIGIN, remote_ref, tracking_refspec};
use std::path::Path;
use tracing::{debug, warn};

/// Fail with [`Error::DriftDetected`] if the checked-out sync branch holds
/// a commit without `salt` on top of the freshly fetched target branch
///
/// Performs no mutation besides updating the target's remote-tracking ref.
pub async fn validate_provenance(
    git: &dyn GitClient,
    repo: &Path,
    target_branch: &str,
    sync_branch: &str,
    salt: &str,
) -> Result<()> {
    git.fetch(repo, ORIGIN, &tracking_refspec(target_branch))
        .await
        .map_err(|source| Error::ProvenanceUnverifiable {
            branch: sync_branch.to_string(),
            source,
        })?;

    let range = format!("{}..refs/heads/{sync_branch}", remote_ref(target_branch));
    let entries = git
        .log(repo, &range)
        .await
        .map_err(|source| Error::ProvenanceUnverifiable {
            branch: sync_branch.to_string(),
            source,
        })?;

    debug!(
        branch = sync_branch,
        commits = entries.len(),
        "checking commit provenance"
    );

    if let Some(foreign) = entries.iter().find(|e| !e.message.contains(salt)) {
        warn!(branch = sync_branch, commit = %foreign.sha, "foreign commit on sync branch");
        return Err(Error::DriftDetected {
            branch: sync_branch.to_string(),
            commit: foreign.sha.clone(),
        });
    }

    Ok(())
}
