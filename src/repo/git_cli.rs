//! [`GitClient`] backed by the `git` executable

use super::{GitClient, GitResult, LogEntry};
use crate::error::GitError;
use async_trait::async_trait;
use std::path::Path;
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::debug;

/// Separates the SHA from the message within one log record
const FIELD_SEP: char = '\u{1f}';
/// Terminates one log record
const RECORD_SEP: char = '\u{1e}';

/// Runs `git` as a child process
///
/// Output is only ever parsed, never logged or returned in errors. Children
/// are killed if the awaiting future is dropped.
#[derive(Debug, Clone, Default)]
pub struct GitCli {
    config_overrides: Vec<(String, String)>,
}

impl GitCli {
    /// Create a client using the ambient git configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `-c key=value` setting to every invocation
    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config_overrides.push((key.into(), value.into()));
        self
    }

    fn command(&self, dir: &Path, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        for (key, value) in &self.config_overrides {
            cmd.arg("-c").arg(format!("{key}={value}"));
        }
        cmd.args(args)
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run git and return its output regardless of exit status
    async fn output(&self, operation: &'static str, dir: &Path, args: &[&str]) -> GitResult<Output> {
        self.command(dir, args)
            .output()
            .await
            .map_err(|e| GitError::Spawn {
                operation,
                kind: e.kind(),
            })
    }

    /// Run git and fail unless it exits successfully
    async fn run(&self, operation: &'static str, dir: &Path, args: &[&str]) -> GitResult<Output> {
        let output = self.output(operation, dir, args).await?;
        if output.status.success() {
            debug!(operation, "git ok");
            Ok(output)
        } else {
            let exit_code = output.status.code();
            debug!(operation, ?exit_code, "git failed");
            Err(GitError::Failed {
                operation,
                exit_code,
            })
        }
    }

    async fn stdout(&self, operation: &'static str, dir: &Path, args: &[&str]) -> GitResult<String> {
        let output = self.run(operation, dir, args).await?;
        String::from_utf8(output.stdout).map_err(|_| GitError::UnexpectedOutput { operation })
    }
}

/// Parse records produced by `--format=%H%x1f%B%x1e`
fn parse_log(raw: &str) -> GitResult<Vec<LogEntry>> {
    raw.split(RECORD_SEP)
        .map(str::trim)
        .filter(|record| !record.is_empty())
        .map(|record| {
            let (sha, message) = record
                .split_once(FIELD_SEP)
                .ok_or(GitError::UnexpectedOutput { operation: "log" })?;
            if sha.is_empty() || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(GitError::UnexpectedOutput { operation: "log" });
            }
            Ok(LogEntry {
                sha: sha.to_string(),
                message: message.trim().to_string(),
            })
        })
        .collect()
}

/// First token of the first line of `ls-remote` output
fn parse_ls_remote(raw: &str) -> Option<String> {
    raw.lines()
        .next()
        .and_then(|line| line.split_whitespace().next())
        .map(ToString::to_string)
}

#[async_trait]
impl GitClient for GitCli {
    async fn clone_repo(&self, url: &str, dest: &Path) -> GitResult<()> {
        self.run("clone", dest, &["clone", "--quiet", "--", url, "."])
            .await
            .map(drop)
    }

    async fn set_identity(&self, repo: &Path, name: &str, email: &str) -> GitResult<()> {
        self.run("config", repo, &["config", "user.name", name]).await?;
        self.run("config", repo, &["config", "user.email", email])
            .await
            .map(drop)
    }

    async fn fetch(&self, repo: &Path, remote: &str, refspec: &str) -> GitResult<()> {
        self.run("fetch", repo, &["fetch", "--quiet", remote, refspec])
            .await
            .map(drop)
    }

    async fn checkout_branch(
        &self,
        repo: &Path,
        branch: &str,
        start_point: &str,
    ) -> GitResult<()> {
        self.run(
            "checkout",
            repo,
            &["checkout", "--quiet", "-B", branch, start_point],
        )
        .await
        .map(drop)
    }

    async fn checkout_detached(&self, repo: &Path, rev: &str) -> GitResult<()> {
        self.run("checkout", repo, &["checkout", "--quiet", "--detach", rev])
            .await
            .map(drop)
    }

    async fn reset_hard(&self, repo: &Path, rev: &str) -> GitResult<()> {
        self.run("reset", repo, &["reset", "--quiet", "--hard", rev])
            .await
            .map(drop)
    }

    async fn add(&self, repo: &Path, path: &str) -> GitResult<()> {
        self.run("add", repo, &["add", "--", path]).await.map(drop)
    }

    async fn has_staged_changes(&self, repo: &Path) -> GitResult<bool> {
        let operation = "diff";
        let output = self
            .output(operation, repo, &["diff", "--cached", "--quiet"])
            .await?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            exit_code => Err(GitError::Failed {
                operation,
                exit_code,
            }),
        }
    }

    async fn commit(&self, repo: &Path, message: &str) -> GitResult<()> {
        self.run(
            "commit",
            repo,
            &["commit", "--quiet", "--no-verify", "-m", message],
        )
        .await
        .map(drop)
    }

    async fn push_force(&self, repo: &Path, remote: &str, refspec: &str) -> GitResult<()> {
        self.run(
            "push",
            repo,
            &["push", "--quiet", "--force", "--no-verify", remote, refspec],
        )
        .await
        .map(drop)
    }

    async fn submodule_init(&self, repo: &Path, path: &str) -> GitResult<()> {
        self.run(
            "submodule update",
            repo,
            &["submodule", "update", "--quiet", "--init", "--", path],
        )
        .await
        .map(drop)
    }

    async fn rev_parse(&self, repo: &Path, rev: &str) -> GitResult<String> {
        let operation = "rev-parse";
        let out = self
            .stdout(operation, repo, &["rev-parse", "--verify", "--quiet", rev])
            .await?;
        let sha = out.trim();
        if sha.is_empty() {
            return Err(GitError::UnexpectedOutput { operation });
        }
        Ok(sha.to_string())
    }

    async fn ls_remote_branch(
        &self,
        repo: &Path,
        remote: &str,
        branch: &str,
    ) -> GitResult<Option<String>> {
        let pattern = format!("refs/heads/{branch}");
        let out = self
            .stdout("ls-remote", repo, &["ls-remote", remote, &pattern])
            .await?;
        Ok(parse_ls_remote(&out))
    }

    async fn log(&self, repo: &Path, range: &str) -> GitResult<Vec<LogEntry>> {
        let out = self
            .stdout("log", repo, &["log", "--format=%H%x1f%B%x1e", range, "--"])
            .await?;
        parse_log(&out)
    }

    async fn gitmodules_get(&self, repo: &Path, key: &str) -> GitResult<Option<String>> {
        let operation = "config";
        let output = self
            .output(
                operation,
                repo,
                &["config", "--file", ".gitmodules", "--get", key],
            )
            .await?;
        match output.status.code() {
            Some(0) => {
                let value = String::from_utf8(output.stdout)
                    .map_err(|_| GitError::UnexpectedOutput { operation })?;
                let value = value.trim();
                Ok((!value.is_empty()).then(|| value.to_string()))
            }
            // Key (or the whole file) is missing
            Some(1) => Ok(None),
            exit_code => Err(GitError::Failed {
                operation,
                exit_code,
            }),
        }
    }
}
