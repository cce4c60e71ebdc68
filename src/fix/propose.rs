//! Repository-wide proposal step: prompt, complete, extract.

use super::resolve::unmatched_paths;
use super::retry::AttemptFailure;
use crate::context::ContextBundle;
use crate::llm::prompt_utils::estimate_tokens;
use crate::llm::prompts::{proposal_prompt, PROPOSE_SYSTEM};
use crate::llm::{
    extract_proposals, ChangeProposal, CompletionProvider, CompletionRequest, PromptBudget, Usage,
};

/// Proposals from one successful attempt.
#[derive(Debug, Clone)]
pub struct Generation {
    pub proposals: Vec<ChangeProposal>,
    pub usage: Option<Usage>,
}

pub struct ProposalGenerator<'a, P> {
    provider: &'a P,
    bundle: &'a ContextBundle,
    budget: &'a PromptBudget,
    max_tokens: u32,
    reject_unmatched_paths: bool,
}

impl<'a, P: CompletionProvider> ProposalGenerator<'a, P> {
    pub fn new(
        provider: &'a P,
        bundle: &'a ContextBundle,
        budget: &'a PromptBudget,
        max_tokens: u32,
    ) -> Self {
        Self {
            provider,
            bundle,
            budget,
            max_tokens,
            reject_unmatched_paths: false,
        }
    }

    /// Treat an attempt whose paths all miss the repository as failed.
    pub fn reject_unmatched_paths(mut self, reject: bool) -> Self {
        self.reject_unmatched_paths = reject;
        self
    }

    /// Run one attempt with the given accumulated feedback.
    pub async fn generate(&self, feedback: &str) -> Result<Generation, AttemptFailure> {
        let user = proposal_prompt(self.bundle, self.budget, feedback);
        tracing::debug!(
            estimated_tokens = estimate_tokens(&user),
            "proposal prompt prepared"
        );
        tracing::debug!(prompt = %user, "proposal prompt");

        let request = CompletionRequest::greedy(PROPOSE_SYSTEM, &user, self.max_tokens);
        let response = self
            .provider
            .complete(&request)
            .await
            .map_err(|e| AttemptFailure::Transport(format!("{:#}", e)))?;
        tracing::debug!(response = %response.content, "received proposal response");

        let proposals = extract_proposals(response.content.trim());
        tracing::debug!(
            paths = ?proposals.iter().map(|p| p.raw_path.as_str()).collect::<Vec<_>>(),
            "extracted file blocks"
        );
        if proposals.is_empty() {
            return Err(AttemptFailure::GenerationEmpty);
        }

        if self.reject_unmatched_paths {
            let missing = unmatched_paths(&proposals, self.bundle.file_paths());
            if missing.len() == proposals.len() {
                return Err(AttemptFailure::GenerationUnmatched(missing));
            }
        }

        tracing::info!(files = proposals.len(), "extracted proposed file changes");
        Ok(Generation {
            proposals,
            usage: response.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Issue;
    use crate::llm::LlmResponse;
    use std::cell::RefCell;

    struct Canned {
        reply: anyhow::Result<String>,
        prompts: RefCell<Vec<String>>,
    }

    impl Canned {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl CompletionProvider for Canned {
        async fn complete(&self, request: &CompletionRequest<'_>) -> anyhow::Result<LlmResponse> {
            self.prompts.borrow_mut().push(request.user.to_string());
            assert_eq!(request.temperature, 0.0);
            match &self.reply {
                Ok(text) => Ok(LlmResponse {
                    content: text.clone(),
                    usage: None,
                }),
                Err(e) => Err(anyhow::anyhow!("{}", e)),
            }
        }
    }

    fn bundle() -> ContextBundle {
        ContextBundle::new(
            vec!["src/app.js".to_string()],
            Issue {
                title: "Broken".to_string(),
                ..Issue::default()
            },
        )
    }

    #[tokio::test]
    async fn test_generate_extracts_proposals() {
        let provider = Canned::ok("File: src/app.js\n```js\nfixed();\n```");
        let bundle = bundle();
        let budget = PromptBudget::default();
        let generation = ProposalGenerator::new(&provider, &bundle, &budget, 2000)
            .generate("")
            .await
            .unwrap();
        assert_eq!(generation.proposals.len(), 1);
        assert_eq!(generation.proposals[0].content, "fixed();");
    }

    #[tokio::test]
    async fn test_generate_reports_empty_response() {
        let provider = Canned::ok("Sorry, I can't help with that.");
        let bundle = bundle();
        let budget = PromptBudget::default();
        let err = ProposalGenerator::new(&provider, &bundle, &budget, 2000)
            .generate("")
            .await
            .unwrap_err();
        assert_eq!(err, AttemptFailure::GenerationEmpty);
    }

    #[tokio::test]
    async fn test_generate_wraps_transport_errors() {
        let provider = Canned {
            reply: Err(anyhow::anyhow!("quota exceeded")),
            prompts: RefCell::new(Vec::new()),
        };
        let bundle = bundle();
        let budget = PromptBudget::default();
        let err = ProposalGenerator::new(&provider, &bundle, &budget, 2000)
            .generate("")
            .await
            .unwrap_err();
        assert!(matches!(err, AttemptFailure::Transport(msg) if msg.contains("quota")));
    }

    #[tokio::test]
    async fn test_feedback_reaches_prompt() {
        let provider = Canned::ok("File: src/app.js\n```\nx\n```");
        let bundle = bundle();
        let budget = PromptBudget::default();
        ProposalGenerator::new(&provider, &bundle, &budget, 2000)
            .generate("NOTE: be precise")
            .await
            .unwrap();
        assert!(provider.prompts.borrow()[0].ends_with("NOTE: be precise"));
    }

    #[tokio::test]
    async fn test_unmatched_paths_accepted_by_default() {
        let provider = Canned::ok("File: docs/architecture/overview.md\n```\n# Docs\n```");
        let bundle = bundle();
        let budget = PromptBudget::default();
        let generation = ProposalGenerator::new(&provider, &bundle, &budget, 2000)
            .generate("")
            .await
            .unwrap();
        assert_eq!(generation.proposals.len(), 1);
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_all_unmatched() {
        let provider = Canned::ok("File: docs/architecture/overview.md\n```\n# Docs\n```");
        let bundle = bundle();
        let budget = PromptBudget::default();
        let err = ProposalGenerator::new(&provider, &bundle, &budget, 2000)
            .reject_unmatched_paths(true)
            .generate("")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AttemptFailure::GenerationUnmatched(vec!["docs/architecture/overview.md".to_string()])
        );
    }
}
