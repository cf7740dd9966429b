//! Mock git client for testing
//!
//! Simulates just enough of a clone (remote branch heads, `.gitmodules`,
//! detached HEAD) to drive the reconciler without spawning git.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use submodule_sync::error::GitError;
use submodule_sync::repo::{GitClient, GitResult, LogEntry};

/// Scriptable [`GitClient`]
///
/// Features:
/// - Every call recorded as a git-like command line
/// - Separate remote branch heads for the outer repo and the submodule
/// - Pushed branches appear on the remote for later runs
/// - Error injection per operation
pub struct MockGitClient {
    calls: Mutex<Vec<String>>,
    outer_repo: Mutex<Option<PathBuf>>,
    remote_branches: Mutex<HashMap<String, String>>,
    submodule_branches: Mutex<HashMap<String, String>>,
    log_entries: Mutex<Vec<LogEntry>>,
    gitmodules: Mutex<HashMap<String, String>>,
    detached_head: Mutex<Option<String>>,
    head_override: Mutex<Option<String>>,
    staged: AtomicBool,
    fail_on: Mutex<Option<&'static str>>,
}

impl Default for MockGitClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGitClient {
    /// Empty mock: no remote branches, no submodules, changes staged
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            outer_repo: Mutex::new(None),
            remote_branches: Mutex::new(HashMap::new()),
            submodule_branches: Mutex::new(HashMap::new()),
            log_entries: Mutex::new(Vec::new()),
            gitmodules: Mutex::new(HashMap::new()),
            detached_head: Mutex::new(None),
            head_override: Mutex::new(None),
            staged: AtomicBool::new(true),
            fail_on: Mutex::new(None),
        }
    }

    /// Mock with a `main` branch and submodule `my-sdk` at `libs/sdk`
    /// whose `feature/x` head is `sub_head`
    pub fn with_submodule(sub_head: &str) -> Self {
        let mock = Self::new();
        mock.set_remote_branch("main", "1111111111111111111111111111111111111111");
        mock.set_gitmodule("submodule.my-sdk.path", "libs/sdk");
        mock.set_submodule_branch("feature/x", sub_head);
        mock
    }

    // === Setup ===

    /// Branch head on the outer repository's remote
    pub fn set_remote_branch(&self, branch: &str, sha: &str) {
        self.remote_branches
            .lock()
            .unwrap()
            .insert(branch.to_string(), sha.to_string());
    }

    /// Branch head on the submodule's remote
    pub fn set_submodule_branch(&self, branch: &str, sha: &str) {
        self.submodule_branches
            .lock()
            .unwrap()
            .insert(branch.to_string(), sha.to_string());
    }

    /// Commits returned by `log`
    pub fn set_log(&self, entries: Vec<LogEntry>) {
        *self.log_entries.lock().unwrap() = entries;
    }

    /// `.gitmodules` entry
    pub fn set_gitmodule(&self, key: &str, value: &str) {
        self.gitmodules
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    /// Make `rev-parse` report this SHA regardless of checkouts
    pub fn set_head(&self, sha: &str) {
        *self.head_override.lock().unwrap() = Some(sha.to_string());
    }

    /// Whether `add` leaves anything staged
    pub fn set_staged(&self, staged: bool) {
        self.staged.store(staged, Ordering::SeqCst);
    }

    /// Make every call of `operation` fail (`clone`, `fetch`, `push`, ...)
    pub fn fail_on(&self, operation: &'static str) {
        *self.fail_on.lock().unwrap() = Some(operation);
    }

    // === Verification ===

    /// Every call, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Index of the first call starting with `prefix`
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.calls().iter().position(|c| c.starts_with(prefix))
    }

    /// Whether any call starts with `prefix`
    pub fn called(&self, prefix: &str) -> bool {
        self.position(prefix).is_some()
    }

    /// Directory the project was cloned into
    pub fn clone_dir(&self) -> Option<PathBuf> {
        self.outer_repo.lock().unwrap().clone()
    }

    /// Assert the calls starting with each prefix happened in this order
    pub fn assert_order(&self, prefixes: &[&str]) {
        let calls = self.calls();
        let mut from = 0;
        for prefix in prefixes {
            let found = calls[from..].iter().position(|c| c.starts_with(prefix));
            assert!(
                found.is_some(),
                "Expected call starting with '{prefix}' after index {from}, got: {calls:?}"
            );
            from += found.unwrap() + 1;
        }
    }

    fn record(&self, operation: &'static str, line: String) -> GitResult<()> {
        self.calls.lock().unwrap().push(line);
        if *self.fail_on.lock().unwrap() == Some(operation) {
            return Err(GitError::Failed {
                operation,
                exit_code: Some(128),
            });
        }
        Ok(())
    }

    fn is_outer(&self, repo: &Path) -> bool {
        self.outer_repo.lock().unwrap().as_deref() == Some(repo)
    }
}

#[async_trait]
impl GitClient for MockGitClient {
    async fn clone_repo(&self, url: &str, dest: &Path) -> GitResult<()> {
        assert!(dest.is_dir(), "clone destination must exist");
        *self.outer_repo.lock().unwrap() = Some(dest.to_path_buf());
        self.record("clone", format!("clone {url}"))
    }

    async fn set_identity(&self, _repo: &Path, name: &str, email: &str) -> GitResult<()> {
        self.record("identity", format!("identity {name} <{email}>"))
    }

    async fn fetch(&self, _repo: &Path, remote: &str, refspec: &str) -> GitResult<()> {
        self.record("fetch", format!("fetch {remote} {refspec}"))
    }

    async fn checkout_branch(
        &self,
        _repo: &Path,
        branch: &str,
        start_point: &str,
    ) -> GitResult<()> {
        self.record("checkout", format!("checkout -B {branch} {start_point}"))
    }

    async fn checkout_detached(&self, _repo: &Path, rev: &str) -> GitResult<()> {
        self.record("checkout", format!("checkout {rev}"))?;
        *self.detached_head.lock().unwrap() = Some(rev.to_string());
        Ok(())
    }

    async fn reset_hard(&self, _repo: &Path, rev: &str) -> GitResult<()> {
        self.record("reset", format!("reset --hard {rev}"))
    }

    async fn add(&self, _repo: &Path, path: &str) -> GitResult<()> {
        self.record("add", format!("add {path}"))
    }

    async fn has_staged_changes(&self, _repo: &Path) -> GitResult<bool> {
        self.record("diff", "diff --cached".to_string())?;
        Ok(self.staged.load(Ordering::SeqCst))
    }

    async fn commit(&self, _repo: &Path, message: &str) -> GitResult<()> {
        self.record("commit", format!("commit {message}"))
    }

    async fn push_force(&self, _repo: &Path, remote: &str, refspec: &str) -> GitResult<()> {
        self.record("push", format!("push {remote} {refspec}"))?;
        if let Some((_, branch)) = refspec.split_once(":refs/heads/") {
            self.set_remote_branch(branch, "2222222222222222222222222222222222222222");
        }
        Ok(())
    }

    async fn submodule_init(&self, _repo: &Path, path: &str) -> GitResult<()> {
        self.record("submodule", format!("submodule init {path}"))
    }

    async fn rev_parse(&self, _repo: &Path, rev: &str) -> GitResult<String> {
        self.record("rev-parse", format!("rev-parse {rev}"))?;
        self.head_override
            .lock()
            .unwrap()
            .clone()
            .or_else(|| self.detached_head.lock().unwrap().clone())
            .ok_or(GitError::UnexpectedOutput {
                operation: "rev-parse",
            })
    }

    async fn ls_remote_branch(
        &self,
        repo: &Path,
        remote: &str,
        branch: &str,
    ) -> GitResult<Option<String>> {
        self.record("ls-remote", format!("ls-remote {remote} {branch}"))?;
        let heads = if self.is_outer(repo) {
            self.remote_branches.lock().unwrap()
        } else {
            self.submodule_branches.lock().unwrap()
        };
        Ok(heads.get(branch).cloned())
    }

    async fn log(&self, _repo: &Path, range: &str) -> GitResult<Vec<LogEntry>> {
        self.record("log", format!("log {range}"))?;
        Ok(self.log_entries.lock().unwrap().clone())
    }

    async fn gitmodules_get(&self, _repo: &Path, key: &str) -> GitResult<Option<String>> {
        self.record("gitmodules", format!("gitmodules {key}"))?;
        Ok(self.gitmodules.lock().unwrap().get(key).cloned())
    }
}
