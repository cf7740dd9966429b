//! Run configuration
//!
//! Built once at startup (from flags and environment) and passed by value
//! into every component that needs it.

use crate::error::{Error, Result};
use crate::types::DEFAULT_COMMIT_SALT;
use std::path::PathBuf;

/// Environment variable holding the GitLab API token
pub const ENV_GITLAB_TOKEN: &str = "GITLAB_TOKEN";
/// Environment variable holding the GitLab host URL
pub const ENV_GITLAB_URL: &str = "GITLAB_URL";

/// Configuration shared by both commands
#[derive(Clone)]
pub struct Config {
    /// GitLab API token (also used for clone auth)
    pub gitlab_token: String,
    /// GitLab host URL
    pub gitlab_url: String,
    /// Ask GitLab to merge once the pipeline succeeds
    pub merge_when_pipeline_succeeds: bool,
    /// External pull request URL, used to decorate MR descriptions
    pub pr_url: Option<String>,
    /// Base directory for ephemeral workspaces (platform temp dir if unset)
    pub workdir: Option<PathBuf>,
    /// Token embedded in every commit this tool produces
    pub salt: String,
}

// Hand-written so the token never reaches logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("gitlab_token", &"<redacted>")
            .field("gitlab_url", &self.gitlab_url)
            .field(
                "merge_when_pipeline_succeeds",
                &self.merge_when_pipeline_succeeds,
            )
            .field("pr_url", &self.pr_url)
            .field("workdir", &self.workdir)
            .field("salt", &self.salt)
            .finish()
    }
}

impl Config {
    /// Create a config with defaults for everything but credentials
    pub fn new(gitlab_token: impl Into<String>, gitlab_url: impl Into<String>) -> Self {
        Self {
            gitlab_token: gitlab_token.into(),
            gitlab_url: gitlab_url.into(),
            merge_when_pipeline_succeeds: false,
            pr_url: None,
            workdir: None,
            salt: DEFAULT_COMMIT_SALT.to_string(),
        }
    }

    /// Reject configurations that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.gitlab_token.trim().is_empty() {
            return Err(Error::Config(format!("{ENV_GITLAB_TOKEN} is empty")));
        }
        if self.gitlab_url.trim().is_empty() {
            return Err(Error::Config(format!("{ENV_GITLAB_URL} is empty")));
        }
        if self.salt.trim().is_empty() {
            return Err(Error::Config("commit salt must not be empty".to_string()));
        }
        Ok(())
    }

    /// Directory under which ephemeral workspaces are created
    pub fn workspace_base(&self) -> PathBuf {
        self.workdir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Interpret a boolean-like flag value
///
/// `true` and `1` (case-insensitive, surrounding whitespace ignored) are
/// true; everything else, including the empty string, is false.
pub fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("true") || value == "1"
}
