//! Sync branch reconciliation
//!
//! Rewrites the sync branch so it holds exactly one pointer-update commit on
//! top of the target branch. Each run starts from a fresh clone; any failed
//! step aborts the run, and the workspace is removed on every exit path.

use crate::config::Config;
use crate::error::{CheckoutBase, Error, GitError, Result};
use crate::platform::PlatformService;
use crate::progress::ProgressCallback;
use crate::repo::{
    EphemeralWorkspace, GitClient, ORIGIN, authenticated_clone_url, remote_ref, tracking_refspec,
};
use crate::sync::provenance::validate_provenance;
use crate::sync::submodule::SubmodulePinner;
use crate::types::{SubmodulePointer, SyncIdentity};
use std::path::Path;
use tracing::{debug, info, warn};

/// Reconciliation progress, in the order states are reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReconcileState {
    /// Project cloned and commit identity configured
    Cloned,
    /// Sync branch checked out (existing, or created from target)
    SourceBranchReady,
    /// No foreign commits on the sync branch
    ProvenanceValidated,
    /// Sync branch reset to the target tip
    Reset,
    /// Submodule checked out at the desired SHA and verified
    SubmodulePinned,
    /// Pointer update committed
    Committed,
    /// Sync branch force-pushed
    Pushed,
}

impl std::fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Cloned => "cloned",
            Self::SourceBranchReady => "branch ready",
            Self::ProvenanceValidated => "provenance validated",
            Self::Reset => "reset to target",
            Self::SubmodulePinned => "submodule pinned",
            Self::Committed => "committed",
            Self::Pushed => "pushed",
        };
        write!(f, "{label}")
    }
}

/// Inputs for one sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    /// Submodule and external branch
    pub identity: SyncIdentity,
    /// Branch the MR targets
    pub target_branch: String,
    /// SHA to pin; the external branch head when `None` or blank
    pub sha: Option<String>,
}

impl SyncRequest {
    /// The explicit SHA with surrounding whitespace removed, if not blank
    pub fn explicit_sha(&self) -> Option<&str> {
        self.sha.as_deref().map(str::trim).filter(|sha| !sha.is_empty())
    }
}

/// What a successful reconciliation produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// The pushed sync branch
    pub source_branch: String,
    /// The submodule pointer it now carries
    pub pointer: SubmodulePointer,
    /// Whether the sync branch did not exist before this run
    pub created_branch: bool,
}

/// Drives one sync branch through the reconciliation protocol
pub struct BranchReconciler<'a> {
    git: &'a dyn GitClient,
    platform: &'a dyn PlatformService,
    config: &'a Config,
}

impl<'a> BranchReconciler<'a> {
    /// Create a reconciler
    pub fn new(
        git: &'a dyn GitClient,
        platform: &'a dyn PlatformService,
        config: &'a Config,
    ) -> Self {
        Self {
            git,
            platform,
            config,
        }
    }

    /// Run the full protocol for `request`
    pub async fn reconcile(
        &self,
        request: &SyncRequest,
        progress: &dyn ProgressCallback,
    ) -> Result<ReconcileOutcome> {
        let source_branch = request.identity.source_branch_name();
        let target_branch = request.target_branch.as_str();
        info!(%source_branch, target_branch, "reconciling sync branch");

        let workspace = EphemeralWorkspace::create(&self.config.workspace_base())?;
        let repo = workspace.path();

        self.clone_project(repo).await?;
        progress.on_state(ReconcileState::Cloned).await;

        let created_branch = self
            .prepare_source_branch(repo, &source_branch, target_branch)
            .await?;
        progress.on_state(ReconcileState::SourceBranchReady).await;

        validate_provenance(
            self.git,
            repo,
            target_branch,
            &source_branch,
            &self.config.salt,
        )
        .await?;
        progress.on_state(ReconcileState::ProvenanceValidated).await;

        self.git
            .reset_hard(repo, &remote_ref(target_branch))
            .await
            .map_err(|source| Error::ResetFailure {
                branch: source_branch.clone(),
                target: target_branch.to_string(),
                source,
            })?;
        progress.on_state(ReconcileState::Reset).await;

        let pinner = SubmodulePinner::new(self.git, repo);
        let identity = &request.identity;
        let path = pinner.resolve_submodule_path(&identity.submodule).await?;
        let sha = pinner
            .resolve_desired_sha(&path, request.explicit_sha(), &identity.external_branch)
            .await?;
        let pointer = pinner
            .pin_and_verify(&path, &sha, &identity.external_branch)
            .await?;
        progress.on_state(ReconcileState::SubmodulePinned).await;

        self.commit_pointer(repo, identity, &source_branch, &pointer)
            .await?;
        progress.on_state(ReconcileState::Committed).await;

        self.git
            .push_force(repo, ORIGIN, &format!("HEAD:refs/heads/{source_branch}"))
            .await
            .map_err(|source| Error::PushFailure {
                branch: source_branch.clone(),
                source,
            })?;
        progress.on_state(ReconcileState::Pushed).await;

        info!(%source_branch, sha = %pointer.sha, "sync branch pushed");
        if let Err(e) = workspace.close() {
            warn!(error = %e, "failed to remove workspace");
        }

        Ok(ReconcileOutcome {
            source_branch,
            pointer,
            created_branch,
        })
    }

    async fn clone_project(&self, repo: &Path) -> Result<()> {
        let bot = self.platform.current_user().await?;
        let project = self.platform.get_project().await?;
        let url = authenticated_clone_url(
            &project.http_url_to_repo,
            &bot.username,
            &self.config.gitlab_token,
        )?;

        debug!(project = %project.path_with_namespace, user = %bot.username, "cloning");
        self.git
            .clone_repo(&url, repo)
            .await
            .map_err(|source| Error::CloneFailure {
                project: project.path_with_namespace.clone(),
                source,
            })?;

        self.git
            .set_identity(repo, &bot.name, &bot.email)
            .await
            .map_err(Error::IdentityConfigFailure)
    }

    /// Check out the sync branch, creating it from the target if needed
    ///
    /// Returns whether the branch was created.
    async fn prepare_source_branch(
        &self,
        repo: &Path,
        source_branch: &str,
        target_branch: &str,
    ) -> Result<bool> {
        let failure = |base: CheckoutBase| {
            let branch = source_branch.to_string();
            move |source: GitError| Error::CheckoutFailure {
                branch,
                base,
                source,
            }
        };

        let exists = self
            .git
            .ls_remote_branch(repo, ORIGIN, source_branch)
            .await
            .map_err(failure(CheckoutBase::SyncBranch))?
            .is_some();

        let (base, start_branch) = if exists {
            (CheckoutBase::SyncBranch, source_branch)
        } else {
            debug!(source_branch, target_branch, "sync branch missing, branching from target");
            (CheckoutBase::TargetBranch, target_branch)
        };

        self.git
            .fetch(repo, ORIGIN, &tracking_refspec(start_branch))
            .await
            .map_err(failure(base))?;
        self.git
            .checkout_branch(repo, source_branch, &remote_ref(start_branch))
            .await
            .map_err(failure(base))?;

        Ok(!exists)
    }

    async fn commit_pointer(
        &self,
        repo: &Path,
        identity: &SyncIdentity,
        source_branch: &str,
        pointer: &SubmodulePointer,
    ) -> Result<()> {
        let commit_failure = |source: GitError| Error::CommitFailure {
            branch: source_branch.to_string(),
            source,
        };

        self.git
            .add(repo, &pointer.path)
            .await
            .map_err(commit_failure)?;

        if !self
            .git
            .has_staged_changes(repo)
            .await
            .map_err(commit_failure)?
        {
            return Err(Error::NothingToSync {
                submodule: identity.submodule.clone(),
                sha: pointer.sha.clone(),
            });
        }

        self.git
            .commit(repo, &identity.commit_message(&self.config.salt))
            .await
            .map_err(commit_failure)
    }
}
