//! Fuzzy resolution of proposed paths against the repository listing.

use crate::llm::ChangeProposal;
use similar::TextDiff;
use std::cmp::Ordering;

/// Minimum similarity for a proposed path to snap onto an existing one.
pub const SIMILARITY_THRESHOLD: f32 = 0.5;

/// A proposal whose path has been mapped onto the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedChange {
    /// The matched existing path, or the raw path verbatim for a new file
    pub resolved_path: String,
    pub proposed_content: String,
    pub is_new_file: bool,
    /// Similarity of the match; `None` for new files
    pub similarity: Option<f32>,
}

/// Normalized character similarity in `[0, 1]`: twice the matched characters
/// over the combined length. Identical strings score exactly 1.0.
pub fn similarity(a: &str, b: &str) -> f32 {
    if a == b {
        return 1.0;
    }
    TextDiff::from_chars(a, b).ratio()
}

/// Cheap upper bound on [`similarity`] from lengths alone.
fn length_bound(a_len: usize, b_len: usize) -> f32 {
    let total = a_len + b_len;
    if total == 0 {
        return 1.0;
    }
    (2 * a_len.min(b_len)) as f32 / total as f32
}

/// Find the closest existing path with similarity at or above the threshold.
///
/// Ties go to the shorter path, then the lexicographically smaller one, so
/// the result never depends on listing order.
pub fn best_match<'a>(raw_path: &str, candidates: &'a [String]) -> Option<(&'a str, f32)> {
    if let Some(exact) = candidates.iter().find(|c| c.as_str() == raw_path) {
        return Some((exact.as_str(), 1.0));
    }

    let raw_len = raw_path.chars().count();
    let mut best: Option<(&'a str, f32)> = None;

    for candidate in candidates {
        let bound = length_bound(raw_len, candidate.chars().count());
        if bound < SIMILARITY_THRESHOLD {
            continue;
        }
        if let Some((_, best_score)) = best {
            if bound < best_score {
                continue;
            }
        }

        let score = similarity(raw_path, candidate);
        if score < SIMILARITY_THRESHOLD {
            continue;
        }

        let better = match best {
            None => true,
            Some((best_path, best_score)) => {
                compare_candidates((candidate, score), (best_path, best_score)) == Ordering::Less
            }
        };
        if better {
            best = Some((candidate.as_str(), score));
        }
    }

    best
}

/// Ordering where `Less` means "preferred".
fn compare_candidates(a: (&str, f32), b: (&str, f32)) -> Ordering {
    b.1.total_cmp(&a.1)
        .then_with(|| a.0.len().cmp(&b.0.len()))
        .then_with(|| a.0.cmp(b.0))
}

/// Map a proposal onto the repository listing.
pub fn resolve(proposal: ChangeProposal, file_paths: &[String]) -> ResolvedChange {
    match best_match(&proposal.raw_path, file_paths) {
        Some((path, score)) => {
            if path != proposal.raw_path {
                tracing::info!(
                    proposed = %proposal.raw_path,
                    matched = %path,
                    similarity = score,
                    "resolved proposed path to existing file"
                );
            }
            ResolvedChange {
                resolved_path: path.to_string(),
                proposed_content: proposal.content,
                is_new_file: false,
                similarity: Some(score),
            }
        }
        None => {
            tracing::info!(
                path = %proposal.raw_path,
                "no matching file in repository, treating as new file"
            );
            ResolvedChange {
                resolved_path: proposal.raw_path,
                proposed_content: proposal.content,
                is_new_file: true,
                similarity: None,
            }
        }
    }
}

/// Raw paths among `proposals` that match nothing in the listing.
pub fn unmatched_paths(proposals: &[ChangeProposal], file_paths: &[String]) -> Vec<String> {
    proposals
        .iter()
        .filter(|p| best_match(&p.raw_path, file_paths).is_none())
        .map(|p| p.raw_path.clone())
        .collect()
}
