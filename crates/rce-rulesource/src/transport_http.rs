// crates/rce-rulesource/src/transport_http.rs
// ============================================================================
// Module: HTTP Git Host Client
// Description: reqwest-backed GitHostClient for GitHub and GitLab.
// Purpose: spec.md §4.6 tarball pull + blame query.
// Dependencies: rce-core, async-trait, reqwest, serde_json
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use rce_core::interfaces::BlameInfo;
use rce_core::interfaces::GitHostClient;
use rce_core::interfaces::GitHostError;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::json;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Which git host a [`HttpGitHostClient`] talks to; archive-fetch and blame
/// query shapes differ per spec.md §4.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHostKind {
    Github,
    /// `GITHUB_RELEASE`: fetches the latest release tarball instead of a
    /// ref tarball.
    GithubRelease,
    Gitlab,
}

/// `GitHostClient` backed by the real GitHub/GitLab APIs.
pub struct HttpGitHostClient {
    client: Client,
    kind: GitHostKind,
    base_url: String,
    token: Option<String>,
}

impl HttpGitHostClient {
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(kind: GitHostKind, base_url: impl Into<String>, token: Option<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            kind,
            base_url: base_url.into(),
            token,
        })
    }

    fn auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|token| format!("Bearer {token}"))
    }
}

#[async_trait]
impl GitHostClient for HttpGitHostClient {
    async fn fetch_archive(&self, project_id: &str, git_ref: &str) -> Result<Vec<u8>, GitHostError> {
        let url = match self.kind {
            GitHostKind::Github => format!(
                "{}/repos/{project_id}/tarball/{git_ref}",
                self.base_url.trim_end_matches('/')
            ),
            GitHostKind::GithubRelease => format!(
                "{}/repos/{project_id}/releases/latest",
                self.base_url.trim_end_matches('/')
            ),
            GitHostKind::Gitlab => format!(
                "{}/projects/{project_id}/repository/archive.tar.gz?sha={git_ref}",
                self.base_url.trim_end_matches('/')
            ),
        };

        let mut request = self.client.get(&url);
        if let Some(header) = self.auth_header() {
            request = request.header("Authorization", header);
        }
        let response = request
            .send()
            .await
            .map_err(|err| GitHostError::Backend(err.to_string()))?;

        match response.status() {
            StatusCode::OK | StatusCode::FOUND => response
                .bytes()
                .await
                .map(|bytes| bytes.to_vec())
                .map_err(|err| GitHostError::Backend(err.to_string())),
            StatusCode::NOT_FOUND => Err(GitHostError::NotFound(project_id.to_string())),
            status => Err(GitHostError::Backend(format!("unexpected status {status}"))),
        }
    }

    async fn blame_commit(&self, project_id: &str, path: &str) -> Result<BlameInfo, GitHostError> {
        match self.kind {
            GitHostKind::Github | GitHostKind::GithubRelease => self.blame_via_graphql(project_id, path).await,
            GitHostKind::Gitlab => self.blame_via_gitlab_head(project_id, path).await,
        }
    }
}

impl HttpGitHostClient {
    /// `git blame` via GraphQL, per spec.md §4.6 ("`git blame` via GraphQL
    /// for GitHub when token present").
    async fn blame_via_graphql(&self, project_id: &str, path: &str) -> Result<BlameInfo, GitHostError> {
        let Some(auth) = self.auth_header() else {
            return Err(GitHostError::NotFound(path.to_string()));
        };
        let (owner, name) = project_id
            .split_once('/')
            .ok_or_else(|| GitHostError::Backend(format!("invalid GitHub project id: {project_id}")))?;

        let query = json!({
            "query": "query($owner:String!,$name:String!,$path:String!){repository(owner:$owner,name:$name){defaultBranchRef{target{... on Commit{blame(path:$path){ranges{commit{oid committedDate}}}}}}}}",
            "variables": { "owner": owner, "name": name, "path": path },
        });

        let response = self
            .client
            .post(format!("{}/graphql", self.base_url.trim_end_matches('/')))
            .header("Authorization", auth)
            .json(&query)
            .send()
            .await
            .map_err(|err| GitHostError::Backend(err.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(GitHostError::NotFound(path.to_string()));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|err| GitHostError::Backend(err.to_string()))?;

        let first_range = body
            .pointer("/data/repository/defaultBranchRef/target/blame/ranges/0/commit")
            .ok_or_else(|| GitHostError::NotFound(path.to_string()))?;

        let commit_hash = first_range
            .get("oid")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| GitHostError::NotFound(path.to_string()))?
            .to_string();
        let updated_date = first_range
            .get("committedDate")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| GitHostError::NotFound(path.to_string()))?
            .to_string();

        Ok(BlameInfo {
            commit_hash,
            updated_date,
        })
    }

    /// `HEAD /projects/:id/repository/files/:path`, per spec.md §4.6's
    /// GitLab blame path. GitLab surfaces the last-modified commit via
    /// response headers on a HEAD request against the file's blob.
    async fn blame_via_gitlab_head(&self, project_id: &str, path: &str) -> Result<BlameInfo, GitHostError> {
        let encoded_path = path.replace('/', "%2F");
        let url = format!(
            "{}/projects/{project_id}/repository/files/{encoded_path}?ref=HEAD",
            self.base_url.trim_end_matches('/')
        );
        let mut request = self.client.head(&url);
        if let Some(header) = self.auth_header() {
            request = request.header("Authorization", header);
        }
        let response = request
            .send()
            .await
            .map_err(|err| GitHostError::Backend(err.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(GitHostError::NotFound(path.to_string()));
        }

        let commit_hash = response
            .headers()
            .get("x-gitlab-last-commit-id")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| GitHostError::NotFound(path.to_string()))?
            .to_string();
        let updated_date = response
            .headers()
            .get("last-modified")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Ok(BlameInfo {
            commit_hash,
            updated_date,
        })
    }
}
