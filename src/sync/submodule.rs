//! Submodule resolution and pinning

use crate::error::{Error, GitError, Result};
use crate::repo::{GitClient, ORIGIN, remote_ref, tracking_refspec};
use crate::types::SubmodulePointer;
use std::path::Path;
use tracing::debug;

/// Resolves and pins one submodule inside a cloned outer repository
pub struct SubmodulePinner<'a> {
    git: &'a dyn GitClient,
    repo: &'a Path,
}

impl<'a> SubmodulePinner<'a> {
    /// Create a pinner for the outer repository at `repo`
    pub fn new(git: &'a dyn GitClient, repo: &'a Path) -> Self {
        Self { git, repo }
    }

    /// Path of the submodule named `name`, from `.gitmodules`
    pub async fn resolve_submodule_path(&self, name: &str) -> Result<String> {
        let key = format!("submodule.{name}.path");
        let path = self
            .git
            .gitmodules_get(self.repo, &key)
            .await
            .map_err(|source| Error::GitmodulesUnreadable {
                name: name.to_string(),
                source,
            })?
            .ok_or_else(|| Error::SubmodulePathNotFound(name.to_string()))?;
        debug!(submodule = name, %path, "resolved submodule path");
        Ok(path)
    }

    /// SHA the submodule should be pinned to
    ///
    /// An explicit SHA is used verbatim. Otherwise the submodule is
    /// initialized and the current head of `external_branch` on its remote
    /// is used.
    pub async fn resolve_desired_sha(
        &self,
        path: &str,
        explicit_sha: Option<&str>,
        external_branch: &str,
    ) -> Result<String> {
        if let Some(sha) = explicit_sha {
            return Ok(sha.to_string());
        }

        self.init(path).await?;
        let sub_repo = self.repo.join(path);
        let sha = self
            .git
            .ls_remote_branch(&sub_repo, ORIGIN, external_branch)
            .await
            .map_err(|source| Error::SubmoduleCheckoutFailure {
                path: path.to_string(),
                reference: external_branch.to_string(),
                source,
            })?
            .ok_or_else(|| Error::SubmoduleCheckoutFailure {
                path: path.to_string(),
                reference: external_branch.to_string(),
                source: GitError::UnexpectedOutput {
                    operation: "ls-remote",
                },
            })?;

        debug!(%path, branch = external_branch, %sha, "resolved branch head");
        Ok(sha)
    }

    /// Check out `sha` in the submodule and verify the result
    ///
    /// Checks out the branch first and the SHA second, then re-reads HEAD:
    /// a ref that resolves ambiguously cannot silently leave the submodule
    /// somewhere else.
    pub async fn pin_and_verify(
        &self,
        path: &str,
        sha: &str,
        external_branch: &str,
    ) -> Result<SubmodulePointer> {
        self.init(path).await?;

        let sub_repo = self.repo.join(path);
        let checkout_err = |reference: &str| {
            let path = path.to_string();
            let reference = reference.to_string();
            move |source: GitError| Error::SubmoduleCheckoutFailure {
                path,
                reference,
                source,
            }
        };

        self.git
            .fetch(&sub_repo, ORIGIN, &tracking_refspec(external_branch))
            .await
            .map_err(checkout_err(external_branch))?;
        self.git
            .checkout_branch(&sub_repo, external_branch, &remote_ref(external_branch))
            .await
            .map_err(checkout_err(external_branch))?;
        self.git
            .checkout_detached(&sub_repo, sha)
            .await
            .map_err(checkout_err(sha))?;

        let actual = self
            .git
            .rev_parse(&sub_repo, "HEAD")
            .await
            .map_err(checkout_err("HEAD"))?;

        if !sha_matches(&actual, sha) {
            return Err(Error::SubmoduleShaMismatch {
                path: path.to_string(),
                expected: sha.to_string(),
                actual,
            });
        }

        debug!(%path, %actual, "submodule pinned");
        Ok(SubmodulePointer {
            path: path.to_string(),
            sha: actual,
        })
    }

    async fn init(&self, path: &str) -> Result<()> {
        self.git
            .submodule_init(self.repo, path)
            .await
            .map_err(|source| Error::SubmoduleInitFailure {
                path: path.to_string(),
                source,
            })
    }
}

/// Whether a full `actual` SHA is the commit named by `expected`
///
/// `expected` may be abbreviated; an empty `expected` never matches.
pub fn sha_matches(actual: &str, expected: &str) -> bool {
    !expected.is_empty()
        && actual
            .get(..expected.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(expected))
}
