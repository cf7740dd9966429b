//! Merge request upsert for sync branches

use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::types::{MergeRequest, SyncIdentity};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static PR_NUMBER_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+$").expect("valid regex"));

/// Result of an upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No MR existed; a new one was opened
    Created(MergeRequest),
    /// The single open MR was edited in place
    Updated(MergeRequest),
}

impl UpsertOutcome {
    /// The MR as GitLab returned it
    pub const fn merge_request(&self) -> &MergeRequest {
        match self {
            Self::Created(mr) | Self::Updated(mr) => mr,
        }
    }
}

/// Creates or edits the MR tied to a sync branch
pub struct MergeRequestManager<'a> {
    platform: &'a dyn PlatformService,
}

impl<'a> MergeRequestManager<'a> {
    /// Create a manager
    pub fn new(platform: &'a dyn PlatformService) -> Self {
        Self { platform }
    }

    /// Ensure exactly one open MR from `source_branch` into `target_branch`
    /// carries `title` and `description`
    pub async fn upsert(
        &self,
        source_branch: &str,
        target_branch: &str,
        title: &str,
        description: &str,
    ) -> Result<UpsertOutcome> {
        let mut open = self
            .platform
            .list_open_mrs(source_branch, target_branch)
            .await?;

        match open.len() {
            0 => {
                let mr = self
                    .platform
                    .create_mr(source_branch, target_branch, title, description)
                    .await?;
                debug!(mr_iid = mr.iid, "opened sync MR");
                Ok(UpsertOutcome::Created(mr))
            }
            1 => {
                let existing = open.remove(0);
                let mr = self
                    .platform
                    .update_mr(existing.iid, title, description)
                    .await?;
                debug!(mr_iid = mr.iid, "refreshed sync MR");
                Ok(UpsertOutcome::Updated(mr))
            }
            count => Err(Error::MultipleOpenMrs {
                source_branch: source_branch.to_string(),
                target_branch: target_branch.to_string(),
                count,
            }),
        }
    }
}

/// Title of the MR for a sync identity
pub fn merge_request_title(identity: &SyncIdentity) -> String {
    format!(
        "chore({}): update submodule to '{}'",
        identity.submodule, identity.external_branch
    )
}

/// Description of the MR for a sync identity
///
/// The external branch becomes a link to `pr_url` when that is an absolute
/// http(s) URL ending in a pull request number.
pub fn merge_request_description(
    identity: &SyncIdentity,
    sha: &str,
    pr_url: Option<&str>,
) -> String {
    let branch = match pr_url.map(str::trim).filter(|u| is_pull_request_url(u)) {
        Some(url) => format!("[{}]({url})", identity.external_branch),
        None => format!("`{}`", identity.external_branch),
    };
    format!(
        "Updates submodule `{}` to `{sha}` from branch {branch}.\n\n\
         This merge request is maintained automatically. Its source branch is \
         rewritten on every sync; commits pushed to it by hand stop the sync.",
        identity.submodule
    )
}

fn is_pull_request_url(candidate: &str) -> bool {
    Url::parse(candidate).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
        && PR_NUMBER_SUFFIX.is_match(candidate)
}
