//! Error types for submodule-sync
//!
//! Every variant is terminal for the current run. Variants produced by git
//! operations only ever carry a [`GitError`], which holds the operation name
//! and exit status but never the process output, which can echo the
//! token-bearing remote URL.

use crate::types::PipelineStatus;
use thiserror::Error;

/// Which ref the sync branch was being prepared from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutBase {
    /// The sync branch's own remote ref
    SyncBranch,
    /// Fallback: the target branch's remote ref (sync branch did not exist)
    TargetBranch,
}

impl std::fmt::Display for CheckoutBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SyncBranch => write!(f, "its remote ref"),
            Self::TargetBranch => write!(f, "the target branch"),
        }
    }
}

/// A sanitized git failure; carries no process output
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GitError {
    /// git ran and exited unsuccessfully
    #[error("git {operation} failed{}", .exit_code.map(|c| format!(" (exit code {c})")).unwrap_or_default())]
    Failed {
        /// Operation name (e.g. "clone", "push")
        operation: &'static str,
        /// Process exit code, if the process was not killed by a signal
        exit_code: Option<i32>,
    },
    /// git could not be started at all
    #[error("could not run git for {operation}: {kind}")]
    Spawn {
        /// Operation name
        operation: &'static str,
        /// I/O error kind (the message is dropped)
        kind: std::io::ErrorKind,
    },
    /// git succeeded but printed something we could not interpret
    #[error("git {operation} produced unexpected output")]
    UnexpectedOutput {
        /// Operation name
        operation: &'static str,
    },
}

/// Errors that can occur in submodule-sync
#[derive(Error, Debug)]
pub enum Error {
    /// Cloning the project into the workspace failed
    #[error("failed to clone project '{project}': {source}")]
    CloneFailure {
        /// Project path or id
        project: String,
        /// Sanitized cause
        source: GitError,
    },

    /// Configuring the commit author identity failed
    #[error("failed to configure commit identity: {0}")]
    IdentityConfigFailure(#[source] GitError),

    /// The sync branch could not be prepared
    #[error("failed to prepare branch '{branch}' from {base}: {source}")]
    CheckoutFailure {
        /// Sync branch name
        branch: String,
        /// Which ref it was being prepared from
        base: CheckoutBase,
        /// Sanitized cause
        source: GitError,
    },

    /// A commit without the salt token sits on the sync branch
    #[error(
        "branch '{branch}' contains commit {commit} that was not produced by submodule-sync; \
         refusing to overwrite manual changes"
    )]
    DriftDetected {
        /// Sync branch name
        branch: String,
        /// Offending commit SHA
        commit: String,
    },

    /// The commit range could not be read, so drift cannot be ruled out
    #[error("could not verify commit provenance on '{branch}': {source}")]
    ProvenanceUnverifiable {
        /// Sync branch name
        branch: String,
        /// Sanitized cause
        source: GitError,
    },

    /// Hard reset of the sync branch failed
    #[error("failed to reset '{branch}' onto '{target}': {source}")]
    ResetFailure {
        /// Sync branch name
        branch: String,
        /// Target branch name
        target: String,
        /// Sanitized cause
        source: GitError,
    },

    /// The submodule name has no path in `.gitmodules`
    #[error("submodule '{0}' has no path in .gitmodules")]
    SubmodulePathNotFound(String),

    /// `.gitmodules` exists but git could not read it
    #[error("failed to read .gitmodules for submodule '{name}': {source}")]
    GitmodulesUnreadable {
        /// Logical submodule name
        name: String,
        /// Sanitized cause
        source: GitError,
    },

    /// `git submodule update --init` failed
    #[error("failed to initialize submodule at '{path}': {source}")]
    SubmoduleInitFailure {
        /// Submodule path
        path: String,
        /// Sanitized cause
        source: GitError,
    },

    /// Fetching or checking out inside the submodule failed
    #[error("failed to check out '{reference}' in submodule '{path}': {source}")]
    SubmoduleCheckoutFailure {
        /// Submodule path
        path: String,
        /// Branch or SHA being checked out
        reference: String,
        /// Sanitized cause
        source: GitError,
    },

    /// The submodule landed on a different commit than requested
    #[error("submodule '{path}' is at {actual}, expected {expected}")]
    SubmoduleShaMismatch {
        /// Submodule path
        path: String,
        /// Requested SHA
        expected: String,
        /// SHA actually checked out
        actual: String,
    },

    /// Staging or committing the pointer update failed
    #[error("failed to commit submodule update on '{branch}': {source}")]
    CommitFailure {
        /// Sync branch name
        branch: String,
        /// Sanitized cause
        source: GitError,
    },

    /// The target branch already pins the requested SHA
    #[error("target branch already pins submodule '{submodule}' at {sha}; nothing to sync")]
    NothingToSync {
        /// Submodule logical name
        submodule: String,
        /// Requested SHA
        sha: String,
    },

    /// Force-pushing the sync branch failed
    #[error("failed to push '{branch}': {source}")]
    PushFailure {
        /// Sync branch name
        branch: String,
        /// Sanitized cause
        source: GitError,
    },

    /// More than one open MR for the same source/target pair
    #[error(
        "found {count} open merge requests from '{source_branch}' into '{target_branch}'; \
         close the duplicates manually"
    )]
    MultipleOpenMrs {
        /// Source branch
        source_branch: String,
        /// Target branch
        target_branch: String,
        /// Number of open MRs found
        count: usize,
    },

    /// No open MR for the source/target pair
    #[error("no open merge request from '{source_branch}' into '{target_branch}'")]
    MrNotFound {
        /// Source branch
        source_branch: String,
        /// Target branch
        target_branch: String,
    },

    /// GitLab reports conflicts for the MR
    #[error("merge request !{iid} has conflicts")]
    MrHasConflicts {
        /// MR iid
        iid: u64,
    },

    /// The MR diff does not move the submodule to the expected SHA
    #[error("merge request !{iid} does not update the submodule to {sha}")]
    MrDiffMissingExpectedSha {
        /// MR iid
        iid: u64,
        /// Expected SHA
        sha: String,
    },

    /// The merge call returned without merging
    #[error("merge request !{iid} was not merged (pipeline status: {status})")]
    MergeNotCompleted {
        /// MR iid
        iid: u64,
        /// Pipeline status at the time of the merge call
        status: PipelineStatus,
    },

    /// The ephemeral workspace was not empty on creation
    #[error("workspace directory '{0}' is not empty")]
    WorkspaceNotEmpty(String),

    /// Creating or inspecting the ephemeral workspace failed
    #[error("workspace error: {0}")]
    Workspace(#[from] std::io::Error),

    /// GitLab API error
    #[error("GitLab API error: {0}")]
    GitLabApi(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for submodule-sync
pub type Result<T> = std::result::Result<T, Error>;
