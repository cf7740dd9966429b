//! Core types for submodule-sync

use serde::{Deserialize, Serialize};

/// Default token embedded in every commit this tool produces
pub const DEFAULT_COMMIT_SALT: &str = "submodule-auto-sync";

/// Identifies one external branch of one submodule
///
/// This is the only link between an external branch and its GitLab
/// artifacts: the sync branch name and, through it, the merge request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncIdentity {
    /// Logical submodule name (as in `.gitmodules`)
    pub submodule: String,
    /// Branch in the external repository
    pub external_branch: String,
}

impl SyncIdentity {
    /// Create a new identity
    pub fn new(submodule: impl Into<String>, external_branch: impl Into<String>) -> Self {
        Self {
            submodule: submodule.into(),
            external_branch: external_branch.into(),
        }
    }

    /// Name of the GitLab branch carrying the pointer update
    pub fn source_branch_name(&self) -> String {
        format!("{}/{}", self.submodule, self.external_branch)
    }

    /// Message for the single commit on the sync branch
    pub fn commit_message(&self, salt: &str) -> String {
        format!(
            "chore: update '{}' submodule to '{}' `{salt}`",
            self.submodule, self.external_branch
        )
    }
}

/// Submodule path and the commit it must point at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmodulePointer {
    /// Path of the submodule relative to the repository root
    pub path: String,
    /// Commit the submodule is pinned to
    pub sha: String,
}

/// The authenticated GitLab user, used for clone auth and commit authorship
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    /// Login name (used as the clone URL username)
    pub username: String,
    /// Display name for commit authorship
    pub name: String,
    /// Email for commit authorship
    pub email: String,
}

/// Project metadata needed to clone it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Numeric project id
    pub id: u64,
    /// `group/subgroup/project`
    pub path_with_namespace: String,
    /// HTTPS clone URL
    pub http_url_to_repo: String,
}

/// MR state as reported by GitLab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MrState {
    /// Open for review
    Opened,
    /// Merged into the target branch
    Merged,
    /// Closed without merging (GitLab's `locked` is folded in here)
    Closed,
}

impl MrState {
    /// Parse GitLab's `state` string
    pub fn from_api(state: &str) -> Self {
        match state {
            "opened" => Self::Opened,
            "merged" => Self::Merged,
            _ => Self::Closed,
        }
    }
}

impl std::fmt::Display for MrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Opened => write!(f, "opened"),
            Self::Merged => write!(f, "merged"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Pipeline status of an MR's head pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStatus {
    /// Pipeline passed
    Success,
    /// Pipeline failed
    Failed,
    /// Pipeline was canceled
    Canceled,
    /// Pipeline is running
    Running,
    /// Pipeline is waiting to run
    Pending,
    /// No pipeline attached to the MR
    None,
    /// Any other GitLab status (created, manual, scheduled, ...)
    Other(String),
}

impl PipelineStatus {
    /// Parse GitLab's pipeline `status` string
    pub fn from_api(status: Option<&str>) -> Self {
        match status {
            None => Self::None,
            Some("success") => Self::Success,
            Some("failed") => Self::Failed,
            Some("canceled") => Self::Canceled,
            Some("running") => Self::Running,
            Some("pending") => Self::Pending,
            Some(other) => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
            Self::Canceled => write!(f, "canceled"),
            Self::Running => write!(f, "running"),
            Self::Pending => write!(f, "pending"),
            Self::None => write!(f, "none"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A merge request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
    /// Project-scoped MR number
    pub iid: u64,
    /// Numeric project id
    pub project_id: u64,
    /// Web URL for the MR
    pub web_url: String,
    /// Source branch name
    pub source_branch: String,
    /// Target branch name
    pub target_branch: String,
    /// MR title
    pub title: String,
    /// Current state
    pub state: MrState,
    /// Whether GitLab detected conflicts with the target branch
    pub has_conflicts: bool,
    /// Head commit of the source branch
    pub sha: Option<String>,
    /// Status of the head pipeline
    pub pipeline_status: PipelineStatus,
}

/// One file diff of a merge request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequestDiff {
    /// Path before the change
    pub old_path: String,
    /// Path after the change
    pub new_path: String,
    /// Unified diff text
    pub diff: String,
}

/// Options for a merge call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    /// Ask GitLab to merge once the pipeline passes instead of immediately
    pub merge_when_pipeline_succeeds: bool,
    /// Head SHA the MR must still be at
    pub sha: Option<String>,
    /// Message for the merge commit
    pub merge_commit_message: String,
}
