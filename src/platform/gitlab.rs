//! GitLab platform service implementation

use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::types::{
    BotIdentity, MergeOptions, MergeRequest, MergeRequestDiff, MrState, PipelineStatus,
    ProjectInfo,
};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// GitLab service using reqwest
pub struct GitLabService {
    client: Client,
    token: String,
    base_url: String,
    project_id: String,
}

#[derive(Deserialize)]
struct User {
    username: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    commit_email: Option<String>,
    #[serde(default)]
    public_email: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct Pipeline {
    status: String,
}

#[derive(Deserialize)]
struct ApiMergeRequest {
    iid: u64,
    project_id: u64,
    web_url: String,
    source_branch: String,
    target_branch: String,
    title: String,
    state: String, // "opened", "closed", "locked", "merged"
    #[serde(default)]
    has_conflicts: bool,
    #[serde(default)]
    sha: Option<String>,
    // Only the single-MR endpoints populate these
    #[serde(default)]
    head_pipeline: Option<Pipeline>,
    #[serde(default)]
    pipeline: Option<Pipeline>,
}

impl From<ApiMergeRequest> for MergeRequest {
    fn from(mr: ApiMergeRequest) -> Self {
        let status = mr.head_pipeline.or(mr.pipeline).map(|p| p.status);
        Self {
            iid: mr.iid,
            project_id: mr.project_id,
            web_url: mr.web_url,
            source_branch: mr.source_branch,
            target_branch: mr.target_branch,
            title: mr.title,
            state: MrState::from_api(&mr.state),
            has_conflicts: mr.has_conflicts,
            sha: mr.sha,
            pipeline_status: PipelineStatus::from_api(status.as_deref()),
        }
    }
}

#[derive(Deserialize)]
struct ApiDiff {
    old_path: String,
    new_path: String,
    #[serde(default)]
    diff: String,
}

#[derive(Serialize)]
struct CreateMrPayload<'a> {
    source_branch: &'a str,
    target_branch: &'a str,
    title: &'a str,
    description: &'a str,
    remove_source_branch: bool,
}

#[derive(Serialize)]
struct UpdateMrPayload<'a> {
    title: &'a str,
    description: &'a str,
}

#[derive(Serialize)]
struct MergePayload<'a> {
    merge_when_pipeline_succeeds: bool,
    merge_commit_message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Page size for paginated endpoints
const PER_PAGE: &str = "100";

impl GitLabService {
    /// Create a new GitLab service scoped to one project
    ///
    /// `host` may be a bare hostname (`gitlab.example.com`, https assumed) or
    /// a full base URL. `project_id` may be numeric or a `group/project` path.
    pub fn new(token: String, host: &str, project_id: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::GitLabApi(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token,
            base_url: normalize_base_url(host),
            project_id,
        })
    }

    /// Host part of the base URL, used for the fallback commit email
    fn host(&self) -> &str {
        self.base_url
            .split_once("://")
            .map_or(self.base_url.as_str(), |(_, rest)| rest)
            .split(['/', ':'])
            .next()
            .unwrap_or_default()
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v4{}", self.base_url, path)
    }

    fn encoded_project(&self) -> String {
        urlencoding::encode(&self.project_id).into_owned()
    }

    fn mr_url(&self, iid: u64, suffix: &str) -> String {
        self.api_url(&format!(
            "/projects/{}/merge_requests/{iid}{suffix}",
            self.encoded_project()
        ))
    }
}

fn normalize_base_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

/// Turn a non-2xx response into an error carrying GitLab's `message`/`error` payload
async fn check_status(response: Response, context: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = api_error_message(&body).map_or_else(String::new, |m| format!(": {m}"));
    Err(Error::GitLabApi(format!("{context} ({status}){detail}")))
}

fn api_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let message = value.get("message").or_else(|| value.get("error"))?;
    Some(match message {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

#[async_trait]
impl PlatformService for GitLabService {
    async fn current_user(&self) -> Result<BotIdentity> {
        debug!("resolving current user");
        let response = self
            .client
            .get(self.api_url("/user"))
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?;
        let user: User = check_status(response, "get current user")
            .await?
            .json()
            .await?;

        let email = [user.commit_email, user.public_email, user.email]
            .into_iter()
            .flatten()
            .find(|e| !e.is_empty())
            .unwrap_or_else(|| format!("{}@users.noreply.{}", user.username, self.host()));
        let name = user
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| user.username.clone());

        debug!(username = %user.username, "resolved current user");
        Ok(BotIdentity {
            username: user.username,
            name,
            email,
        })
    }

    async fn get_project(&self) -> Result<ProjectInfo> {
        debug!(project = %self.project_id, "getting project");
        let url = self.api_url(&format!("/projects/{}", self.encoded_project()));
        let response = self
            .client
            .get(&url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?;
        let project: ProjectInfo = check_status(response, "get project")
            .await?
            .json()
            .await?;

        debug!(path = %project.path_with_namespace, "got project");
        Ok(project)
    }

    async fn list_open_mrs(
        &self,
        source_branch: &str,
        target_branch: &str,
    ) -> Result<Vec<MergeRequest>> {
        debug!(source_branch, target_branch, "listing open MRs");
        let url = self.api_url(&format!(
            "/projects/{}/merge_requests",
            self.encoded_project()
        ));

        let response = self
            .client
            .get(&url)
            .header("PRIVATE-TOKEN", &self.token)
            .query(&[
                ("source_branch", source_branch),
                ("target_branch", target_branch),
                ("state", "opened"),
            ])
            .send()
            .await?;
        let mrs: Vec<ApiMergeRequest> = check_status(response, "list merge requests")
            .await?
            .json()
            .await?;

        // The API filters already; re-check so the multiplicity rule only
        // ever counts exact pairs.
        let mrs: Vec<MergeRequest> = mrs
            .into_iter()
            .map(MergeRequest::from)
            .filter(|mr| {
                mr.state == MrState::Opened
                    && mr.source_branch == source_branch
                    && mr.target_branch == target_branch
            })
            .collect();
        debug!(count = mrs.len(), "listed open MRs");
        Ok(mrs)
    }

    async fn create_mr(
        &self,
        source_branch: &str,
        target_branch: &str,
        title: &str,
        description: &str,
    ) -> Result<MergeRequest> {
        debug!(source_branch, target_branch, "creating MR");
        let url = self.api_url(&format!(
            "/projects/{}/merge_requests",
            self.encoded_project()
        ));

        let payload = CreateMrPayload {
            source_branch,
            target_branch,
            title,
            description,
            remove_source_branch: true,
        };

        let response = self
            .client
            .post(&url)
            .header("PRIVATE-TOKEN", &self.token)
            .json(&payload)
            .send()
            .await?;
        let mr: ApiMergeRequest = check_status(response, "create merge request")
            .await?
            .json()
            .await?;

        let mr: MergeRequest = mr.into();
        debug!(mr_iid = mr.iid, "created MR");
        Ok(mr)
    }

    async fn update_mr(&self, iid: u64, title: &str, description: &str) -> Result<MergeRequest> {
        debug!(mr_iid = iid, "updating MR");
        let response = self
            .client
            .put(self.mr_url(iid, ""))
            .header("PRIVATE-TOKEN", &self.token)
            .json(&UpdateMrPayload { title, description })
            .send()
            .await?;
        let mr: ApiMergeRequest = check_status(response, "update merge request")
            .await?
            .json()
            .await?;

        debug!(mr_iid = iid, "updated MR");
        Ok(mr.into())
    }

    async fn get_file(&self, file_path: &str, reference: &str) -> Result<Option<String>> {
        debug!(file_path, reference, "getting raw file");
        let url = self.api_url(&format!(
            "/projects/{}/repository/files/{}/raw",
            self.encoded_project(),
            urlencoding::encode(file_path)
        ));

        let response = self
            .client
            .get(&url)
            .header("PRIVATE-TOKEN", &self.token)
            .query(&[("ref", reference)])
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(file_path, reference, "file not found");
            return Ok(None);
        }
        let content = check_status(response, "get repository file")
            .await?
            .text()
            .await?;

        Ok(Some(content))
    }

    async fn get_mr_diffs(&self, iid: u64) -> Result<Vec<MergeRequestDiff>> {
        debug!(mr_iid = iid, "getting MR diffs");
        let url = self.mr_url(iid, "/diffs");
        let mut diffs = Vec::new();
        let mut page = "1".to_string();

        loop {
            let response = self
                .client
                .get(&url)
                .header("PRIVATE-TOKEN", &self.token)
                .query(&[("per_page", PER_PAGE), ("page", page.as_str())])
                .send()
                .await?;
            let response = check_status(response, "get merge request diffs").await?;

            let next_page = response
                .headers()
                .get("x-next-page")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(ToString::to_string);

            let batch: Vec<ApiDiff> = response.json().await?;
            diffs.extend(batch.into_iter().map(|d| MergeRequestDiff {
                old_path: d.old_path,
                new_path: d.new_path,
                diff: d.diff,
            }));

            match next_page {
                Some(next) => page = next,
                None => break,
            }
        }

        debug!(mr_iid = iid, count = diffs.len(), "got MR diffs");
        Ok(diffs)
    }

    async fn merge_mr(&self, iid: u64, options: &MergeOptions) -> Result<MergeRequest> {
        debug!(
            mr_iid = iid,
            when_pipeline_succeeds = options.merge_when_pipeline_succeeds,
            "merging MR"
        );

        let payload = MergePayload {
            merge_when_pipeline_succeeds: options.merge_when_pipeline_succeeds,
            merge_commit_message: &options.merge_commit_message,
            sha: options.sha.as_deref(),
        };

        let response = self
            .client
            .put(self.mr_url(iid, "/merge"))
            .header("PRIVATE-TOKEN", &self.token)
            .json(&payload)
            .send()
            .await?;
        let mr: ApiMergeRequest = check_status(response, "merge failed").await?.json().await?;

        let mr: MergeRequest = mr.into();
        debug!(
            mr_iid = iid,
            state = %mr.state,
            pipeline = %mr.pipeline_status,
            "merge call returned"
        );
        Ok(mr)
    }

    fn project_id(&self) -> &str {
        &self.project_id
    }
}
