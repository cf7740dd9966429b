//! Project host services
//!
//! Provides the merge-request operations the sync and merge engines need.

mod gitlab;

pub use gitlab::GitLabService;

use crate::error::Result;
use crate::types::{BotIdentity, MergeOptions, MergeRequest, MergeRequestDiff, ProjectInfo};
use async_trait::async_trait;

/// Platform service trait for MR operations
///
/// Every method is scoped to the single project the service was created for.
/// The engines only talk to this trait, so tests can substitute a mock.
#[async_trait]
pub trait PlatformService: Send + Sync {
    /// Resolve the authenticated user (the bot that pushes and commits)
    async fn current_user(&self) -> Result<BotIdentity>;

    /// Get the project's path and clone URL
    async fn get_project(&self) -> Result<ProjectInfo>;

    /// List opened MRs for an exact source/target pair
    async fn list_open_mrs(
        &self,
        source_branch: &str,
        target_branch: &str,
    ) -> Result<Vec<MergeRequest>>;

    /// Create a new MR that deletes its source branch once merged
    async fn create_mr(
        &self,
        source_branch: &str,
        target_branch: &str,
        title: &str,
        description: &str,
    ) -> Result<MergeRequest>;

    /// Edit the title and description of an existing MR
    async fn update_mr(&self, iid: u64, title: &str, description: &str) -> Result<MergeRequest>;

    /// Raw content of `file_path` at `reference`, `None` if it does not exist
    async fn get_file(&self, file_path: &str, reference: &str) -> Result<Option<String>>;

    /// Get every file diff of an MR (all pages)
    async fn get_mr_diffs(&self, iid: u64) -> Result<Vec<MergeRequestDiff>>;

    /// Request a merge and return the MR as GitLab reports it afterwards
    async fn merge_mr(&self, iid: u64, options: &MergeOptions) -> Result<MergeRequest>;

    /// Project id or path this service is scoped to
    fn project_id(&self) -> &str;
}
