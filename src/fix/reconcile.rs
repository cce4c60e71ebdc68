//! Second model pass: merge one proposal into the file's current content.

use super::resolve::ResolvedChange;
use crate::llm::prompts::{reconcile_prompt, RECONCILE_SYSTEM};
use crate::llm::{CompletionProvider, CompletionRequest, PromptBudget, Usage};

/// Content ready to be written for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalFile {
    pub path: String,
    pub content: String,
}

/// Where the final content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    Reconciled,
    /// The merge call failed and the proposal was used verbatim
    ProposedFallback,
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub file: FinalFile,
    pub source: ContentSource,
    pub usage: Option<Usage>,
}

pub struct Reconciler<'a, P> {
    provider: &'a P,
    budget: &'a PromptBudget,
    max_tokens: u32,
}

impl<'a, P: CompletionProvider> Reconciler<'a, P> {
    pub fn new(provider: &'a P, budget: &'a PromptBudget, max_tokens: u32) -> Self {
        Self {
            provider,
            budget,
            max_tokens,
        }
    }

    /// Produce the final content for `change`.
    ///
    /// `existing` is the current on-disk content, `None` when the file does
    /// not exist. Never fails: any problem with the merge call falls back to
    /// the proposed content for this file only.
    pub async fn reconcile(
        &self,
        change: &ResolvedChange,
        existing: Option<&str>,
    ) -> Reconciliation {
        let path = change.resolved_path.as_str();
        let user = reconcile_prompt(
            path,
            existing.unwrap_or(""),
            &change.proposed_content,
            self.budget,
        );
        let request = CompletionRequest::greedy(RECONCILE_SYSTEM, &user, self.max_tokens);

        let (content, source, usage) = match self.provider.complete(&request).await {
            Ok(response) => {
                let merged = response.content.trim();
                if merged.is_empty() && !change.proposed_content.is_empty() {
                    tracing::warn!(
                        path,
                        "reconciliation returned no content, using proposed content"
                    );
                    (
                        change.proposed_content.clone(),
                        ContentSource::ProposedFallback,
                        response.usage,
                    )
                } else {
                    (merged.to_string(), ContentSource::Reconciled, response.usage)
                }
            }
            Err(e) => {
                tracing::warn!(path, "reconciliation call failed, using proposed content: {:#}", e);
                (
                    change.proposed_content.clone(),
                    ContentSource::ProposedFallback,
                    None,
                )
            }
        };

        let content = match existing {
            Some(original) => match_trailing_newline(original, content),
            None => content,
        };
        tracing::debug!(path, content = %content, "final content");

        Reconciliation {
            file: FinalFile {
                path: path.to_string(),
                content,
            },
            source,
            usage,
        }
    }
}

/// Make the trailing newline of `content` follow the original file's.
///
/// Model output is trimmed, so without this every file ending in a newline
/// would be rewritten just to drop it.
pub(crate) fn match_trailing_newline(original: &str, content: String) -> String {
    let mut normalized = content;

    if original.ends_with('\n') {
        if !normalized.ends_with('\n') {
            if original.ends_with("\r\n") {
                normalized.push_str("\r\n");
            } else {
                normalized.push('\n');
            }
        }
    } else {
        while normalized.ends_with('\n') {
            let cut = if normalized.ends_with("\r\n") { 2 } else { 1 };
            let new_len = normalized.len().saturating_sub(cut);
            normalized.truncate(new_len);
        }
    }

    normalized
}
