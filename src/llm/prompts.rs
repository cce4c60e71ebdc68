use super::prompt_utils::{render_path_listing, truncate_middle, PromptBudget};
use crate::context::ContextBundle;

pub const PROPOSE_SYSTEM: &str =
    "You are a senior developer who fixes reported issues in code repositories.";

pub const RECONCILE_SYSTEM: &str =
    "You are a senior developer who integrates proposed code changes into existing files.";

/// Output convention the proposal parser understands.
const OUTPUT_FORMAT: &str = r#"OUTPUT FORMAT:
Respond ONLY with the changed files, each written as:

File: path/to/file.ext
```
<complete file content>
```

- Repeat the block for every file that needs to change.
- Use the exact repository-relative paths listed above; a path not in the list creates a new file.
- Give the complete content of each file, never a fragment or a diff.
- No explanations, headings, or any text outside the file blocks.
- Make sure no file content is cut off."#;

/// Build the repository-wide proposal prompt.
///
/// `feedback` holds corrective notes accumulated by earlier failed attempts
/// and is appended verbatim.
pub fn proposal_prompt(bundle: &ContextBundle, budget: &PromptBudget, feedback: &str) -> String {
    let listing = render_path_listing(bundle.file_paths(), budget.max_listed_paths);
    let body = truncate_middle(bundle.issue_body(), budget.max_body_chars, "issue body");
    let comments = truncate_middle(
        bundle.comments_text(),
        budget.max_comments_chars,
        "issue comments",
    );

    let listing = if listing.is_empty() {
        "(empty repository)".to_string()
    } else {
        listing
    };

    let mut prompt = format!(
        "Fix the issue below.\n\n\
         REPOSITORY TYPE: {}\n\n\
         REPOSITORY FILES:\n{}\n\n\
         ISSUE TITLE:\n{}\n\n\
         ISSUE DESCRIPTION:\n{}\n\n\
         COMMENTS:\n{}\n\n\
         {}",
        bundle.repository_type(),
        listing,
        bundle.issue_title(),
        or_none(&body),
        or_none(&comments),
        OUTPUT_FORMAT,
    );

    if !feedback.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(feedback);
    }
    prompt
}

/// Build the single-file merge prompt.
pub fn reconcile_prompt(
    path: &str,
    existing: &str,
    proposed: &str,
    budget: &PromptBudget,
) -> String {
    let existing = truncate_middle(existing, budget.max_existing_chars, "existing content");
    let existing_section = if existing.is_empty() {
        "(the file does not exist yet)".to_string()
    } else {
        existing
    };

    format!(
        "Integrate the proposed change into the file {}.\n\n\
         EXISTING CONTENT:\n{}\n\n\
         PROPOSED CHANGE:\n{}\n\n\
         Produce the final, complete content of the file that applies the proposed change \
         to the existing content.\n\
         Respond ONLY with that file content: no explanations, no commentary, no code fences.",
        path, existing_section, proposed
    )
}

fn or_none(text: &str) -> &str {
    if text.trim().is_empty() {
        "(none)"
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Issue;

    fn bundle() -> ContextBundle {
        ContextBundle::new(
            vec!["package.json".to_string(), "src/app.js".to_string()],
            Issue {
                title: "Button does nothing".to_string(),
                body: "Clicking save is a no-op".to_string(),
                comments: vec!["confirmed".to_string()],
            },
        )
    }

    #[test]
    fn test_proposal_prompt_embeds_context() {
        let prompt = proposal_prompt(&bundle(), &PromptBudget::default(), "");
        assert!(prompt.contains("REPOSITORY TYPE: Node.js"));
        assert!(prompt.contains("- src/app.js"));
        assert!(prompt.contains("Button does nothing"));
        assert!(prompt.contains("Clicking save is a no-op"));
        assert!(prompt.contains("confirmed"));
        assert!(prompt.contains("File: path/to/file.ext"));
    }

    #[test]
    fn test_proposal_prompt_appends_feedback_last() {
        let prompt = proposal_prompt(&bundle(), &PromptBudget::default(), "NOTE: try again");
        assert!(prompt.ends_with("NOTE: try again"));
    }

    #[test]
    fn test_proposal_prompt_marks_missing_sections() {
        let empty = ContextBundle::new(Vec::new(), Issue::default());
        let prompt = proposal_prompt(&empty, &PromptBudget::default(), "");
        assert!(prompt.contains("(empty repository)"));
        assert!(prompt.contains("COMMENTS:\n(none)"));
    }

    #[test]
    fn test_proposal_prompt_respects_listing_cap() {
        let budget = PromptBudget {
            max_listed_paths: Some(1),
            ..PromptBudget::default()
        };
        let prompt = proposal_prompt(&bundle(), &budget, "");
        assert!(prompt.contains("- package.json"));
        assert!(!prompt.contains("- src/app.js"));
        assert!(prompt.contains("1 more files not shown"));
    }

    #[test]
    fn test_reconcile_prompt_for_new_file() {
        let prompt = reconcile_prompt("src/new.py", "", "print('hi')", &PromptBudget::default());
        assert!(prompt.contains("does not exist yet"));
        assert!(prompt.contains("print('hi')"));
        assert!(prompt.contains("src/new.py"));
    }

    #[test]
    fn test_reconcile_prompt_includes_both_versions() {
        let prompt = reconcile_prompt("a.js", "old()", "new()", &PromptBudget::default());
        let existing_at = prompt.find("old()").unwrap();
        let proposed_at = prompt.find("new()").unwrap();
        assert!(existing_at < proposed_at);
    }
}
