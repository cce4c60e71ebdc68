//! GitHub REST integration
//!
//! Reads the repository file tree and issue thread through the REST API using
//! a personal access token. Nothing is ever written back to GitHub.

use crate::config::Secret;
use crate::context::{FileTreeSource, Issue, IssueSource};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;
use url::Url;

// ============================================================================
// Repository identifiers
// ============================================================================

/// An `owner/name` pair identifying a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Parse a repository identifier.
///
/// Supports:
/// - owner/repo
/// - git@github.com:owner/repo.git
/// - https://github.com/owner/repo(.git)
pub fn parse_repo_identifier(raw: &str) -> Option<RepoId> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let path = if let Some(rest) = raw.strip_prefix("git@github.com:") {
        rest.to_string()
    } else if raw.contains("github.com") {
        match Url::parse(raw) {
            Ok(parsed) if parsed.host_str() == Some("github.com") => {
                parsed.path().trim_start_matches('/').to_string()
            }
            Ok(_) => return None,
            Err(_) => raw
                .split("github.com")
                .nth(1)?
                .trim_start_matches(['/', ':'])
                .to_string(),
        }
    } else if raw.contains("://") || raw.contains('@') {
        return None;
    } else {
        raw.to_string()
    };

    let path = path.trim_end_matches('/').trim_end_matches(".git");
    let mut parts = path.split('/');
    let owner = parts.next()?.trim();
    let name = parts.next()?.trim();
    if owner.is_empty() || name.is_empty() || parts.next().is_some() {
        return None;
    }

    Some(RepoId {
        owner: owner.to_string(),
        name: name.to_string(),
    })
}

// ============================================================================
// Error sanitizing
// ============================================================================

/// Maximum length for error body content in error messages
const MAX_ERROR_BODY_LEN: usize = 200;

/// Sanitize an API error body to prevent credential leakage.
/// Truncates long responses and redacts potential secrets.
pub(crate) fn sanitize_error_body(body: &str) -> String {
    const SECRET_PATTERNS: &[&str] = &[
        "token",
        "secret",
        "password",
        "credential",
        "bearer",
        "ghp_",
        "gho_",
        "ghu_",
        "github_pat_",
        "sk-",
    ];

    let truncated = crate::util::truncate(body.trim(), MAX_ERROR_BODY_LEN);

    let lower = truncated.to_lowercase();
    if SECRET_PATTERNS.iter().any(|p| lower.contains(p)) {
        return "(error details redacted - may contain sensitive data)".to_string();
    }

    truncated
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

fn describe_api_error(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(body) {
        let detail = api_error
            .errors
            .first()
            .and_then(|e| e.message.clone())
            .unwrap_or_default();
        let message = if detail.is_empty() {
            api_error.message
        } else {
            format!("{}: {}", api_error.message, detail)
        };
        return format!("GitHub API error ({}): {}", status, sanitize_error_body(&message));
    }
    format!("GitHub API error ({}): {}", status, sanitize_error_body(body))
}

// ============================================================================
// API payloads
// ============================================================================

#[derive(Debug, Deserialize)]
struct ContentEntry {
    #[serde(rename = "type")]
    kind: String,
    path: String,
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    title: String,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    #[serde(default)]
    body: Option<String>,
}

const COMMENTS_PER_PAGE: usize = 100;

// ============================================================================
// Client
// ============================================================================

/// Read-only GitHub client scoped to one repository.
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: Url,
    token: Secret,
    repo: RepoId,
}

impl GitHubClient {
    pub fn new(api_base: Url, token: Secret, repo: RepoId, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            http,
            api_base,
            token,
            repo,
        })
    }

    /// Build `{base}/repos/{owner}/{name}/{tail...}` with each segment escaped.
    fn repo_url(&self, tail: &[&str]) -> Result<Url> {
        build_repo_url(&self.api_base, &self.repo, tail)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::debug!(%url, "GitHub GET");
        let resp = self
            .http
            .get(url.clone())
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {}", self.token.expose()))
            .header("User-Agent", "issuefix")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .await
            .with_context(|| format!("Failed to reach GitHub at {}", url.path()))?;

        let status = resp.status();
        let text = resp.text().await.context("Failed to read GitHub response")?;
        if !status.is_success() {
            return Err(anyhow::anyhow!("{}", describe_api_error(status, &text)));
        }

        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse GitHub response for {}", url.path()))
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<ContentEntry>> {
        let mut tail = vec!["contents"];
        tail.extend(path.split('/').filter(|s| !s.is_empty()));
        let url = self.repo_url(&tail)?;
        self.get_json(url).await
    }
}

impl FileTreeSource for GitHubClient {
    /// Walk the contents API breadth-first from the repository root.
    async fn file_tree(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        let mut queue: VecDeque<ContentEntry> = self.list_directory("").await?.into();

        while let Some(entry) = queue.pop_front() {
            match entry.kind.as_str() {
                "dir" => queue.extend(self.list_directory(&entry.path).await?),
                "submodule" => {
                    tracing::debug!(path = %entry.path, "skipping submodule");
                }
                _ => files.push(entry.path),
            }
        }

        Ok(files)
    }
}

impl IssueSource for GitHubClient {
    async fn issue(&self, number: u64) -> Result<Issue> {
        let number_str = number.to_string();
        let issue: IssueResponse = self
            .get_json(self.repo_url(&["issues", &number_str])?)
            .await
            .with_context(|| format!("Failed to fetch issue #{} of {}", number, self.repo))?;

        let mut comments = Vec::new();
        let mut page = 1usize;
        loop {
            let mut url = self.repo_url(&["issues", &number_str, "comments"])?;
            url.query_pairs_mut()
                .append_pair("per_page", &COMMENTS_PER_PAGE.to_string())
                .append_pair("page", &page.to_string());
            let batch: Vec<CommentResponse> = self
                .get_json(url)
                .await
                .with_context(|| format!("Failed to fetch comments for issue #{}", number))?;
            let batch_len = batch.len();
            comments.extend(batch.into_iter().map(|c| c.body.unwrap_or_default()));
            if batch_len < COMMENTS_PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(Issue {
            title: issue.title,
            body: issue.body.unwrap_or_default(),
            comments,
        })
    }
}

fn build_repo_url(base: &Url, repo: &RepoId, tail: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| anyhow::anyhow!("GitHub API URL cannot be a base: {}", base))?;
        segments.pop_if_empty();
        segments.push("repos").push(&repo.owner).push(&repo.name);
        for segment in tail {
            segments.push(segment);
        }
    }
    Ok(url)
}

// ============================================================================
// Tests
// ============================================================================
