//! Run configuration for issuefix
//!
//! Credentials and the target issue come from required environment variables.
//! Tunables come from an optional `issuefix.toml`, with a few environment
//! overrides for endpoints and the model id.

use crate::error::{FixError, Result};
use crate::github::{parse_repo_identifier, RepoId};
use crate::llm::prompt_utils::PromptBudget;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

pub const ENV_GITHUB_TOKEN: &str = "PAT_TOKEN";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_REPO_NAME: &str = "REPO_NAME";
pub const ENV_ISSUE_NUMBER: &str = "ISSUE_NUMBER";

const ENV_OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
const ENV_GITHUB_API_URL: &str = "GITHUB_API_URL";
const ENV_MODEL: &str = "ISSUEFIX_MODEL";

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Name of the tuning file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "issuefix.toml";

/// A credential that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Tunables read from `issuefix.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Tuning {
    pub model: String,
    /// Output budget for the repository-wide proposal call
    pub proposal_max_tokens: u32,
    /// Output budget for the single-file reconciliation call
    pub reconcile_max_tokens: u32,
    pub request_timeout_secs: u64,
    /// Count an attempt as failed when none of its paths match the tree
    pub reject_unmatched_paths: bool,
    pub prompt: PromptBudget,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            proposal_max_tokens: 2000,
            reconcile_max_tokens: 1500,
            request_timeout_secs: 120,
            reject_unmatched_paths: false,
            prompt: PromptBudget::default(),
        }
    }
}

impl Tuning {
    /// Load tunables.
    ///
    /// An explicit path must exist. Without one, `issuefix.toml` in `workdir`
    /// is used when present, otherwise defaults.
    pub fn load(explicit: Option<&Path>, workdir: &Path) -> Result<Self> {
        let path: PathBuf = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = workdir.join(DEFAULT_CONFIG_FILE);
                if !candidate.is_file() {
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let content = fs::read_to_string(&path).map_err(|e| {
            FixError::InvalidConfiguration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let tuning = Self::from_toml(&content).map_err(|e| match e {
            FixError::InvalidConfiguration(msg) => {
                FixError::InvalidConfiguration(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        tracing::debug!(path = %path.display(), "loaded tuning file");
        Ok(tuning)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let tuning: Tuning = toml::from_str(content)
            .map_err(|e| FixError::InvalidConfiguration(e.message().to_string()))?;
        tuning.validate()?;
        Ok(tuning)
    }

    fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(FixError::InvalidConfiguration(
                "model must not be empty".to_string(),
            ));
        }
        if self.proposal_max_tokens == 0 || self.reconcile_max_tokens == 0 {
            return Err(FixError::InvalidConfiguration(
                "token budgets must be positive".to_string(),
            ));
        }
        if self.reconcile_max_tokens >= self.proposal_max_tokens {
            return Err(FixError::InvalidConfiguration(format!(
                "reconcile_max_tokens ({}) must be smaller than proposal_max_tokens ({})",
                self.reconcile_max_tokens, self.proposal_max_tokens
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(FixError::InvalidConfiguration(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything a run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub github_token: Secret,
    pub openai_api_key: Secret,
    pub repo: RepoId,
    pub issue_number: u64,
    pub openai_base_url: Url,
    pub github_api_url: Url,
    pub tuning: Tuning,
}

impl Config {
    /// Build the config from the process environment.
    pub fn from_env<T>(load_tuning: T) -> Result<Self>
    where
        T: FnOnce() -> Result<Tuning>,
    {
        Self::from_lookup(|key| std::env::var(key).ok(), load_tuning)
    }

    /// Build the config from an arbitrary variable lookup.
    ///
    /// Required variables are checked in a fixed order so the first missing
    /// one is always the one reported. Empty values count as missing.
    /// `load_tuning` only runs once every required variable is present, so a
    /// broken tuning file never hides a missing credential.
    pub fn from_lookup<F, T>(lookup: F, load_tuning: T) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
        T: FnOnce() -> Result<Tuning>,
    {
        let required = |key: &'static str| -> Result<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(FixError::ConfigurationMissing(key))
        };

        let github_token = Secret::new(required(ENV_GITHUB_TOKEN)?);
        let openai_api_key = Secret::new(required(ENV_OPENAI_API_KEY)?);
        let repo_raw = required(ENV_REPO_NAME)?;
        let issue_raw = required(ENV_ISSUE_NUMBER)?;
        let mut tuning = load_tuning()?;

        let repo = parse_repo_identifier(&repo_raw).ok_or_else(|| {
            FixError::InvalidConfiguration(format!(
                "{} must look like owner/name, got {:?}",
                ENV_REPO_NAME, repo_raw
            ))
        })?;

        let issue_number = issue_raw
            .trim_start_matches('#')
            .parse::<u64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                FixError::InvalidConfiguration(format!(
                    "{} must be a positive integer, got {:?}",
                    ENV_ISSUE_NUMBER, issue_raw
                ))
            })?;

        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_base_url = parse_url(
            ENV_OPENAI_BASE_URL,
            optional(ENV_OPENAI_BASE_URL).as_deref(),
            DEFAULT_OPENAI_BASE_URL,
        )?;
        let github_api_url = parse_url(
            ENV_GITHUB_API_URL,
            optional(ENV_GITHUB_API_URL).as_deref(),
            DEFAULT_GITHUB_API_URL,
        )?;

        if let Some(model) = optional(ENV_MODEL) {
            tuning.model = model.trim().to_string();
        }

        Ok(Self {
            github_token,
            openai_api_key,
            repo,
            issue_number,
            openai_base_url,
            github_api_url,
            tuning,
        })
    }
}

fn parse_url(key: &str, value: Option<&str>, default: &str) -> Result<Url> {
    let raw = value.unwrap_or(default).trim();
    // A trailing slash keeps Url::join from dropping the last path segment.
    let normalized = format!("{}/", raw.trim_end_matches('/'));
    Url::parse(&normalized)
        .map_err(|e| FixError::InvalidConfiguration(format!("{} is not a valid URL: {}", key, e)))
}
