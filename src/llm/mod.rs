pub mod client;
pub mod models;
pub mod parse;
pub mod prompt_utils;
pub mod prompts;

pub use client::{CompletionProvider, LlmResponse, OpenAiClient};
pub use models::{merge_usage, CompletionRequest, Usage};
pub use parse::{extract_proposals, ChangeProposal};
pub use prompt_utils::PromptBudget;
