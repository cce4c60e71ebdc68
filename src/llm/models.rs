use serde::Deserialize;

/// Decoding is always greedy; every call in a run uses this temperature.
pub const GREEDY_TEMPERATURE: f32 = 0.0;

/// One chat completion call: a system prompt, a user prompt and an output budget.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl<'a> CompletionRequest<'a> {
    /// A zero-temperature request.
    pub fn greedy(system: &'a str, user: &'a str, max_tokens: u32) -> Self {
        Self {
            system,
            user,
            max_tokens,
            temperature: GREEDY_TEMPERATURE,
        }
    }
}

/// API usage information reported by the completion service
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl Usage {
    pub fn add(&mut self, other: &Usage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Sum two optional usages; `None` only when both are `None`.
pub fn merge_usage(primary: Option<Usage>, secondary: Option<Usage>) -> Option<Usage> {
    match (primary, secondary) {
        (Some(mut p), Some(s)) => {
            p.add(&s);
            Some(p)
        }
        (Some(p), None) => Some(p),
        (None, Some(s)) => Some(s),
        (None, None) => None,
    }
}
