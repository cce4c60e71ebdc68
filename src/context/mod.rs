//! Context assembly
//!
//! Gathers everything the proposal prompt needs into one immutable
//! [`ContextBundle`]: the repository file listing, a heuristic repository
//! type, and the issue thread.

mod repo_type;
mod tree;

pub use repo_type::{detect_repository_type, RepositoryType};
pub use tree::LocalCheckout;

use crate::error::{FixError, Result};
use std::collections::HashSet;

/// An issue as fetched from the repository provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Issue {
    pub title: String,
    pub body: String,
    /// Comment bodies in chronological order
    pub comments: Vec<String>,
}

/// Something that can list every file of a repository, breadth-first.
#[allow(async_fn_in_trait)]
pub trait FileTreeSource {
    async fn file_tree(&self) -> anyhow::Result<Vec<String>>;
}

/// Something that can fetch an issue thread by number.
#[allow(async_fn_in_trait)]
pub trait IssueSource {
    async fn issue(&self, number: u64) -> anyhow::Result<Issue>;
}

/// Immutable inputs for one remediation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBundle {
    repository_type: RepositoryType,
    file_paths: Vec<String>,
    issue_title: String,
    issue_body: String,
    comments_text: String,
}

impl ContextBundle {
    /// Build a bundle from a raw listing and an issue.
    ///
    /// Duplicate paths are dropped (first occurrence wins) and empty entries
    /// are ignored; listing order is otherwise preserved.
    pub fn new(file_paths: Vec<String>, issue: Issue) -> Self {
        let mut seen = HashSet::with_capacity(file_paths.len());
        let file_paths: Vec<String> = file_paths
            .into_iter()
            .filter(|p| !p.is_empty())
            .filter(|p| seen.insert(p.clone()))
            .collect();

        let repository_type = detect_repository_type(&file_paths);

        Self {
            repository_type,
            file_paths,
            issue_title: issue.title,
            issue_body: issue.body,
            comments_text: issue.comments.join("\n"),
        }
    }

    pub fn repository_type(&self) -> RepositoryType {
        self.repository_type
    }

    pub fn file_paths(&self) -> &[String] {
        &self.file_paths
    }

    pub fn issue_title(&self) -> &str {
        &self.issue_title
    }

    pub fn issue_body(&self) -> &str {
        &self.issue_body
    }

    pub fn comments_text(&self) -> &str {
        &self.comments_text
    }
}

/// Fetch the file listing and issue, then bundle them.
pub async fn assemble<T, I>(tree: &T, issues: &I, issue_number: u64) -> Result<ContextBundle>
where
    T: FileTreeSource,
    I: IssueSource,
{
    let file_paths = tree
        .file_tree()
        .await
        .map_err(|e| FixError::Repository(format!("{:#}", e)))?;
    tracing::info!(files = file_paths.len(), "listed repository files");

    let issue = issues
        .issue(issue_number)
        .await
        .map_err(|e| FixError::Repository(format!("{:#}", e)))?;
    tracing::info!(
        issue = issue_number,
        title = %issue.title,
        comments = issue.comments.len(),
        "fetched issue"
    );

    let bundle = ContextBundle::new(file_paths, issue);
    tracing::info!(
        repository_type = %bundle.repository_type(),
        "detected repository type"
    );
    Ok(bundle)
}
