//! Mock platform service for testing
//!
//! These are test utilities - not all may be used in every test binary.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use submodule_sync::error::{Error, Result};
use submodule_sync::platform::PlatformService;
use submodule_sync::types::{
    BotIdentity, MergeOptions, MergeRequest, MergeRequestDiff, MrState, PipelineStatus,
    ProjectInfo,
};

/// Call record for `create_mr`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMrCall {
    pub source_branch: String,
    pub target_branch: String,
    pub title: String,
    pub description: String,
}

/// Call record for `update_mr`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateMrCall {
    pub iid: u64,
    pub title: String,
    pub description: String,
}

/// Call record for `merge_mr`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeMrCall {
    pub iid: u64,
    pub options: MergeOptions,
}

/// Simple mock platform service for testing
///
/// Manually implements `PlatformService` and keeps a small in-memory MR
/// store, so a create followed by a list sees the new MR.
///
/// Features:
/// - Auto-incrementing MR iids
/// - Call tracking for verification
/// - Configurable diffs and merge responses per MR
/// - Error injection for failure path testing
pub struct MockPlatformService {
    user: BotIdentity,
    project: Mutex<ProjectInfo>,
    next_iid: AtomicU64,
    mrs: Mutex<Vec<MergeRequest>>,
    files: Mutex<HashMap<String, String>>,
    diffs: Mutex<HashMap<u64, Vec<MergeRequestDiff>>>,
    merge_responses: Mutex<HashMap<u64, MergeRequest>>,
    // Call tracking
    list_calls: Mutex<Vec<(String, String)>>,
    file_calls: Mutex<Vec<(String, String)>>,
    create_calls: Mutex<Vec<CreateMrCall>>,
    update_calls: Mutex<Vec<UpdateMrCall>>,
    diff_calls: Mutex<Vec<u64>>,
    merge_calls: Mutex<Vec<MergeMrCall>>,
    // Error injection
    error_on_list: Mutex<Option<String>>,
    error_on_create: Mutex<Option<String>>,
    error_on_merge: Mutex<Option<String>>,
}

impl Default for MockPlatformService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlatformService {
    /// Mock for project `group/mirror` authenticated as `sync-bot`
    ///
    /// Every branch carries a `.gitmodules` mapping `my-sdk` to `libs/sdk`.
    pub fn new() -> Self {
        let files = HashMap::from([(
            ".gitmodules".to_string(),
            "[submodule \"my-sdk\"]\n\tpath = libs/sdk\n\turl = https://example.com/sdk.git\n"
                .to_string(),
        )]);
        Self {
            user: BotIdentity {
                username: "sync-bot".to_string(),
                name: "Sync Bot".to_string(),
                email: "sync-bot@example.com".to_string(),
            },
            project: Mutex::new(ProjectInfo {
                id: 7,
                path_with_namespace: "group/mirror".to_string(),
                http_url_to_repo: "https://gitlab.example.com/group/mirror.git".to_string(),
            }),
            next_iid: AtomicU64::new(1),
            mrs: Mutex::new(Vec::new()),
            files: Mutex::new(files),
            diffs: Mutex::new(HashMap::new()),
            merge_responses: Mutex::new(HashMap::new()),
            list_calls: Mutex::new(Vec::new()),
            file_calls: Mutex::new(Vec::new()),
            create_calls: Mutex::new(Vec::new()),
            update_calls: Mutex::new(Vec::new()),
            diff_calls: Mutex::new(Vec::new()),
            merge_calls: Mutex::new(Vec::new()),
            error_on_list: Mutex::new(None),
            error_on_create: Mutex::new(None),
            error_on_merge: Mutex::new(None),
        }
    }

    // === Error injection methods ===

    /// Make `list_open_mrs` return an error
    pub fn fail_list(&self, msg: &str) {
        *self.error_on_list.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `create_mr` return an error
    pub fn fail_create(&self, msg: &str) {
        *self.error_on_create.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `merge_mr` return an error
    pub fn fail_merge(&self, msg: &str) {
        *self.error_on_merge.lock().unwrap() = Some(msg.to_string());
    }

    // === Setup ===

    /// Point the project's clone URL somewhere else (a local bare repo)
    pub fn set_clone_url(&self, url: &str) {
        self.project.lock().unwrap().http_url_to_repo = url.to_string();
    }

    /// Add an existing MR to the store
    pub fn add_mr(&self, mr: MergeRequest) {
        self.next_iid.fetch_max(mr.iid + 1, Ordering::SeqCst);
        self.mrs.lock().unwrap().push(mr);
    }

    /// Replace a repository file (same content on every branch)
    pub fn set_file(&self, path: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
    }

    /// Remove a repository file
    pub fn remove_file(&self, path: &str) {
        self.files.lock().unwrap().remove(path);
    }

    /// Set the diffs returned for an MR
    pub fn set_diffs(&self, iid: u64, diffs: Vec<MergeRequestDiff>) {
        self.diffs.lock().unwrap().insert(iid, diffs);
    }

    /// Set the MR returned by `merge_mr` (defaults to the MR marked merged)
    pub fn set_merge_response(&self, iid: u64, mr: MergeRequest) {
        self.merge_responses.lock().unwrap().insert(iid, mr);
    }

    // === Call verification methods ===

    /// All MRs in the store
    pub fn mrs(&self) -> Vec<MergeRequest> {
        self.mrs.lock().unwrap().clone()
    }

    /// Get all `list_open_mrs` calls as (source, target)
    pub fn get_list_calls(&self) -> Vec<(String, String)> {
        self.list_calls.lock().unwrap().clone()
    }

    /// Get all `get_file` calls as (path, ref)
    pub fn get_file_calls(&self) -> Vec<(String, String)> {
        self.file_calls.lock().unwrap().clone()
    }

    /// Get all `create_mr` calls
    pub fn get_create_calls(&self) -> Vec<CreateMrCall> {
        self.create_calls.lock().unwrap().clone()
    }

    /// Get all `update_mr` calls
    pub fn get_update_calls(&self) -> Vec<UpdateMrCall> {
        self.update_calls.lock().unwrap().clone()
    }

    /// Get all `get_mr_diffs` calls
    pub fn get_diff_calls(&self) -> Vec<u64> {
        self.diff_calls.lock().unwrap().clone()
    }

    /// Get all `merge_mr` calls
    pub fn get_merge_calls(&self) -> Vec<MergeMrCall> {
        self.merge_calls.lock().unwrap().clone()
    }

    /// Assert that `merge_mr` was NOT called
    pub fn assert_merge_not_called(&self) {
        let calls = self.get_merge_calls();
        assert!(
            calls.is_empty(),
            "Expected merge_mr NOT to be called but it was: {calls:?}"
        );
    }
}

#[async_trait]
impl PlatformService for MockPlatformService {
    async fn current_user(&self) -> Result<BotIdentity> {
        Ok(self.user.clone())
    }

    async fn get_project(&self) -> Result<ProjectInfo> {
        Ok(self.project.lock().unwrap().clone())
    }

    async fn list_open_mrs(
        &self,
        source_branch: &str,
        target_branch: &str,
    ) -> Result<Vec<MergeRequest>> {
        self.list_calls
            .lock()
            .unwrap()
            .push((source_branch.to_string(), target_branch.to_string()));

        if let Some(msg) = self.error_on_list.lock().unwrap().as_ref() {
            return Err(Error::GitLabApi(msg.clone()));
        }

        Ok(self
            .mrs
            .lock()
            .unwrap()
            .iter()
            .filter(|mr| {
                mr.state == MrState::Opened
                    && mr.source_branch == source_branch
                    && mr.target_branch == target_branch
            })
            .cloned()
            .collect())
    }

    async fn create_mr(
        &self,
        source_branch: &str,
        target_branch: &str,
        title: &str,
        description: &str,
    ) -> Result<MergeRequest> {
        self.create_calls.lock().unwrap().push(CreateMrCall {
            source_branch: source_branch.to_string(),
            target_branch: target_branch.to_string(),
            title: title.to_string(),
            description: description.to_string(),
        });

        if let Some(msg) = self.error_on_create.lock().unwrap().as_ref() {
            return Err(Error::GitLabApi(msg.clone()));
        }

        let iid = self.next_iid.fetch_add(1, Ordering::SeqCst);
        let mut mr = super::make_mr(iid, source_branch, target_branch);
        mr.title = title.to_string();
        self.mrs.lock().unwrap().push(mr.clone());
        Ok(mr)
    }

    async fn update_mr(&self, iid: u64, title: &str, description: &str) -> Result<MergeRequest> {
        self.update_calls.lock().unwrap().push(UpdateMrCall {
            iid,
            title: title.to_string(),
            description: description.to_string(),
        });

        let mut mrs = self.mrs.lock().unwrap();
        let mr = mrs
            .iter_mut()
            .find(|mr| mr.iid == iid)
            .ok_or_else(|| Error::GitLabApi(format!("MR !{iid} not found")))?;
        mr.title = title.to_string();
        Ok(mr.clone())
    }

    async fn get_file(&self, file_path: &str, reference: &str) -> Result<Option<String>> {
        self.file_calls
            .lock()
            .unwrap()
            .push((file_path.to_string(), reference.to_string()));
        Ok(self.files.lock().unwrap().get(file_path).cloned())
    }

    async fn get_mr_diffs(&self, iid: u64) -> Result<Vec<MergeRequestDiff>> {
        self.diff_calls.lock().unwrap().push(iid);
        Ok(self
            .diffs
            .lock()
            .unwrap()
            .get(&iid)
            .cloned()
            .unwrap_or_default())
    }

    async fn merge_mr(&self, iid: u64, options: &MergeOptions) -> Result<MergeRequest> {
        self.merge_calls.lock().unwrap().push(MergeMrCall {
            iid,
            options: options.clone(),
        });

        if let Some(msg) = self.error_on_merge.lock().unwrap().as_ref() {
            return Err(Error::GitLabApi(msg.clone()));
        }

        if let Some(response) = self.merge_responses.lock().unwrap().get(&iid) {
            return Ok(response.clone());
        }

        let mut mrs = self.mrs.lock().unwrap();
        let mr = mrs
            .iter_mut()
            .find(|mr| mr.iid == iid)
            .ok_or_else(|| Error::GitLabApi(format!("MR !{iid} not found")))?;
        mr.state = MrState::Merged;
        mr.pipeline_status = PipelineStatus::Success;
        Ok(mr.clone())
    }

    fn project_id(&self) -> &str {
        "group/mirror"
    }
}
