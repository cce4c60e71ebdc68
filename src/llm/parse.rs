use regex::Regex;
use std::sync::OnceLock;

/// A candidate file change extracted from model output, not yet resolved
/// against the repository tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeProposal {
    pub raw_path: String,
    pub content: String,
}

/// `File: <path>` followed by a fenced block with an optional info string.
fn file_block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)\b[Ff]ile:[ \t]*(.*?)\s*```[^\n]*\n(.*?)```")
            .expect("file block pattern is valid")
    })
}

/// Extract every `File:` block from a model response, in order of appearance.
///
/// Paths and contents are trimmed. Blocks whose path is empty after cleanup
/// are dropped. Zero blocks means the response carried no proposals.
pub fn extract_proposals(response: &str) -> Vec<ChangeProposal> {
    file_block_pattern()
        .captures_iter(response)
        .filter_map(|caps| {
            let raw_path = clean_raw_path(caps.get(1).map_or("", |m| m.as_str()));
            if raw_path.is_empty() {
                tracing::debug!("dropping file block without a path");
                return None;
            }
            let content = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();
            Some(ChangeProposal { raw_path, content })
        })
        .collect()
}

/// Strip markdown decoration models like to wrap paths in.
fn clean_raw_path(raw: &str) -> String {
    let trimmed = raw
        .trim()
        .trim_matches(|c: char| c == '`' || c == '*' || c == '"' || c == '\'')
        .trim();
    trimmed.strip_prefix("./").unwrap_or(trimmed).to_string()
}
