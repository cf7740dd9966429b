//! Working-copy operations
//!
//! All git access goes through the [`GitClient`] trait so the reconciler can
//! be driven against a mock. [`GitCli`] is the real implementation, shelling
//! out to `git`.

mod git_cli;
mod workspace;

pub use git_cli::GitCli;
pub use workspace::EphemeralWorkspace;

use crate::error::{Error, GitError};
use async_trait::async_trait;
use std::path::Path;
use url::Url;

/// Result type for git operations
pub type GitResult<T> = std::result::Result<T, GitError>;

/// Name of the remote created by clone
pub const ORIGIN: &str = "origin";

/// One commit from a log range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Full commit SHA
    pub sha: String,
    /// Full commit message
    pub message: String,
}

/// Git operations used by the sync engine
///
/// Every method takes the repository directory it operates in. Failures are
/// [`GitError`]s, which never carry process output.
#[async_trait]
pub trait GitClient: Send + Sync {
    /// Clone `url` into the (empty) directory `dest`
    async fn clone_repo(&self, url: &str, dest: &Path) -> GitResult<()>;

    /// Set `user.name` and `user.email` for the repository
    async fn set_identity(&self, repo: &Path, name: &str, email: &str) -> GitResult<()>;

    /// Fetch a refspec from a remote
    async fn fetch(&self, repo: &Path, remote: &str, refspec: &str) -> GitResult<()>;

    /// Create or reset `branch` at `start_point` and check it out
    async fn checkout_branch(&self, repo: &Path, branch: &str, start_point: &str)
    -> GitResult<()>;

    /// Check out a revision with a detached HEAD
    async fn checkout_detached(&self, repo: &Path, rev: &str) -> GitResult<()>;

    /// Hard-reset the current branch to `rev`
    async fn reset_hard(&self, repo: &Path, rev: &str) -> GitResult<()>;

    /// Stage a single path
    async fn add(&self, repo: &Path, path: &str) -> GitResult<()>;

    /// Whether the index differs from HEAD
    async fn has_staged_changes(&self, repo: &Path) -> GitResult<bool>;

    /// Commit the index, bypassing hooks
    async fn commit(&self, repo: &Path, message: &str) -> GitResult<()>;

    /// Force-push a refspec, bypassing hooks
    async fn push_force(&self, repo: &Path, remote: &str, refspec: &str) -> GitResult<()>;

    /// Initialize and check out the recorded commit of one submodule
    async fn submodule_init(&self, repo: &Path, path: &str) -> GitResult<()>;

    /// Resolve a revision to a full SHA
    async fn rev_parse(&self, repo: &Path, rev: &str) -> GitResult<String>;

    /// Current SHA of `refs/heads/<branch>` on a remote, if the branch exists
    async fn ls_remote_branch(
        &self,
        repo: &Path,
        remote: &str,
        branch: &str,
    ) -> GitResult<Option<String>>;

    /// Commits in a revision range, newest first
    async fn log(&self, repo: &Path, range: &str) -> GitResult<Vec<LogEntry>>;

    /// Read a key from the repository's `.gitmodules`
    async fn gitmodules_get(&self, repo: &Path, key: &str) -> GitResult<Option<String>>;
}

/// Remote-tracking ref for a branch on `origin`
pub fn remote_ref(branch: &str) -> String {
    format!("refs/remotes/{ORIGIN}/{branch}")
}

/// Forced refspec updating the remote-tracking ref for a branch
pub fn tracking_refspec(branch: &str) -> String {
    format!("+refs/heads/{branch}:{}", remote_ref(branch))
}

/// Embed the bot identity into an HTTPS clone URL
///
/// `file://` URLs (local mirrors) have nowhere to carry credentials and are
/// returned unchanged.
pub fn authenticated_clone_url(http_url: &str, username: &str, token: &str) -> crate::Result<String> {
    let mut url = Url::parse(http_url)
        .map_err(|e| Error::Config(format!("invalid project clone URL: {e}")))?;
    if url.scheme() == "file" {
        return Ok(url.into());
    }
    url.set_username(username)
        .and_then(|()| url.set_password(Some(token)))
        .map_err(|()| Error::Config("project clone URL cannot carry credentials".to_string()))?;
    Ok(url.into())
}
