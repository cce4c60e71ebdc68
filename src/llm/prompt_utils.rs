use serde::Deserialize;

/// Optional size caps applied while rendering prompts.
///
/// Caps only shape prompt text; the context bundle itself is never cut.
/// Every cap defaults to unset, which embeds the text in full.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PromptBudget {
    /// Maximum number of repository paths listed in the proposal prompt
    pub max_listed_paths: Option<usize>,
    /// Maximum characters of concatenated issue comments
    pub max_comments_chars: Option<usize>,
    /// Maximum characters of the issue body
    pub max_body_chars: Option<usize>,
    /// Maximum characters of existing file content in the reconciliation prompt
    pub max_existing_chars: Option<usize>,
}

/// Truncate text for prompt safety (keep beginning + end).
///
/// Returns the text unchanged when `max_chars` is `None` or not exceeded.
pub fn truncate_middle(content: &str, max_chars: Option<usize>, label: &str) -> String {
    let Some(max_chars) = max_chars else {
        return content.to_string();
    };
    let total = content.chars().count();
    if total <= max_chars {
        return content.to_string();
    }

    tracing::warn!(
        section = label,
        chars = total,
        limit = max_chars,
        "truncating prompt section"
    );
    let head: String = content.chars().take(max_chars / 2).collect();
    let tail: String = content
        .chars()
        .skip(total - (max_chars - max_chars / 2))
        .collect();
    format!("{}\n\n... [truncated] ...\n\n{}", head, tail)
}

/// Render a path listing, one path per line, capped at `max_paths` entries.
pub fn render_path_listing(paths: &[String], max_paths: Option<usize>) -> String {
    let limit = max_paths.unwrap_or(usize::MAX);
    let mut out = paths
        .iter()
        .take(limit)
        .map(|p| format!("- {}", p))
        .collect::<Vec<_>>()
        .join("\n");

    if paths.len() > limit {
        let omitted = paths.len() - limit;
        tracing::warn!(
            listed = limit,
            omitted,
            "truncating repository file listing in prompt"
        );
        out.push_str(&format!("\n... [{} more files not shown]", omitted));
    }
    out
}

/// Estimate the number of tokens in a text string.
///
/// Whitespace-separated words plus half the punctuation; close enough for
/// logging prompt sizes.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    let word_count = text.split_whitespace().count();
    let punct_count = text.chars().filter(|c| c.is_ascii_punctuation()).count();
    word_count + punct_count / 2
}
