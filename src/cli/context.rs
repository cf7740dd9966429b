//! Shared command context for CLI commands
//!
//! Both commands need a validated config and a GitLab client scoped to the
//! target project.

use crate::CommonArgs;
use submodule_sync::config::Config;
use submodule_sync::error::Result;
use submodule_sync::platform::{GitLabService, PlatformService};
use submodule_sync::types::SyncIdentity;
use tracing::debug;

/// Setup shared by `sync-branch` and `merge-mr`
pub struct CommandContext {
    /// Validated run configuration
    pub config: Config,
    /// GitLab client for the target project
    pub platform: GitLabService,
    /// Submodule and external branch being synced
    pub identity: SyncIdentity,
    /// Branch the MR targets
    pub target_branch: String,
}

impl CommandContext {
    /// Build the context from the shared flags
    ///
    /// Command-specific config fields keep their defaults; callers fill them
    /// in afterwards.
    pub fn new(args: CommonArgs) -> Result<Self> {
        let mut config = Config::new(args.gitlab_token, args.gitlab_url);
        config.salt = args.salt;
        config.validate()?;

        let platform = GitLabService::new(
            config.gitlab_token.clone(),
            &config.gitlab_url,
            args.project_id,
        )?;
        debug!(?config, project = platform.project_id(), "command context ready");

        Ok(Self {
            config,
            platform,
            identity: SyncIdentity::new(args.submodule, args.branch),
            target_branch: args.target_branch,
        })
    }
}
