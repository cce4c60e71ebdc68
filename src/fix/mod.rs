//! The generation-and-reconciliation engine.
//!
//! One run goes: propose (with retries) → resolve paths → for each file,
//! reconcile against disk and write. Every step is awaited in sequence.

pub mod confine;
pub mod propose;
pub mod reconcile;
pub mod resolve;
pub mod retry;
pub mod writer;

pub use confine::{confine_to_workdir, UnsafePath};
pub use propose::{Generation, ProposalGenerator};
pub use reconcile::{ContentSource, FinalFile, Reconciler, Reconciliation};
pub use resolve::{resolve, ResolvedChange, SIMILARITY_THRESHOLD};
pub use retry::{run_with_retry, AttemptFailure, RetryController, RetryState, MAX_ATTEMPTS};
pub use writer::WriteOutcome;

use crate::config::Tuning;
use crate::context::ContextBundle;
use crate::error::Result;
use crate::llm::{merge_usage, CompletionProvider, Usage};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Working copy the final files are written into
    pub workdir: PathBuf,
    /// Do everything except touch the disk
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Written(WriteOutcome),
    Skipped(String),
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: String,
    pub is_new_file: bool,
    pub outcome: FileOutcome,
    /// `None` when the file was skipped before reconciliation
    pub source: Option<ContentSource>,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub files: Vec<FileReport>,
    pub usage: Option<Usage>,
    pub dry_run: bool,
}

impl RunSummary {
    /// Files whose content on disk changed (or would change, in a dry run).
    pub fn changed_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| {
                matches!(
                    f.outcome,
                    FileOutcome::Written(WriteOutcome::Created | WriteOutcome::Updated)
                )
            })
            .count()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.files {
            let status = match &report.outcome {
                FileOutcome::Written(outcome) => outcome.label().to_string(),
                FileOutcome::Skipped(reason) => format!("skipped ({})", reason),
            };
            let fallback = if report.source == Some(ContentSource::ProposedFallback) {
                " [unreconciled]"
            } else {
                ""
            };
            writeln!(f, "{:<10} {}{}", status, report.path, fallback)?;
        }
        let verb = if self.dry_run { "would change" } else { "changed" };
        write!(
            f,
            "{} of {} proposed files {}",
            self.changed_count(),
            self.files.len(),
            verb
        )
    }
}

/// Run the engine for an assembled context.
///
/// Fails only when no usable proposal comes back within the retry ceiling,
/// or when a disk write fails part-way. Per-file problems before the write
/// are reported as skipped files.
pub async fn run<P: CompletionProvider>(
    provider: &P,
    bundle: &ContextBundle,
    tuning: &Tuning,
    options: &RunOptions,
) -> Result<RunSummary> {
    let generator = ProposalGenerator::new(
        provider,
        bundle,
        &tuning.prompt,
        tuning.proposal_max_tokens,
    )
    .reject_unmatched_paths(tuning.reject_unmatched_paths);
    let generator = &generator;

    let generation = run_with_retry(|_, feedback| async move {
        generator.generate(&feedback).await
    })
    .await?;

    let mut summary = RunSummary {
        files: Vec::with_capacity(generation.proposals.len()),
        usage: generation.usage,
        dry_run: options.dry_run,
    };

    let changes: Vec<ResolvedChange> = generation
        .proposals
        .into_iter()
        .map(|proposal| resolve(proposal, bundle.file_paths()))
        .collect();

    let reconciler = Reconciler::new(provider, &tuning.prompt, tuning.reconcile_max_tokens);

    for change in changes {
        let report = apply_change(&reconciler, &change, options, &mut summary.usage).await?;
        tracing::info!(
            path = %report.path,
            outcome = ?report.outcome,
            "processed file"
        );
        summary.files.push(report);
    }

    Ok(summary)
}

async fn apply_change<P: CompletionProvider>(
    reconciler: &Reconciler<'_, P>,
    change: &ResolvedChange,
    options: &RunOptions,
    usage: &mut Option<Usage>,
) -> Result<FileReport> {
    let skipped = |reason: String| FileReport {
        path: change.resolved_path.clone(),
        is_new_file: change.is_new_file,
        outcome: FileOutcome::Skipped(reason),
        source: None,
    };

    let target = match confine_to_workdir(&options.workdir, &change.resolved_path) {
        Ok(target) => target,
        Err(reason) => {
            tracing::warn!(path = %change.resolved_path, "refusing unsafe path: {}", reason);
            return Ok(skipped(reason.to_string()));
        }
    };

    let existing = match writer::read_existing(&target) {
        Ok(existing) => existing,
        Err(e) => {
            tracing::warn!(path = %change.resolved_path, "cannot read existing file: {}", e);
            return Ok(skipped(format!("cannot read existing file: {}", e)));
        }
    };
    if existing.is_none() {
        tracing::info!(
            path = %change.resolved_path,
            "file does not exist locally, creating new file"
        );
    }

    let reconciliation = reconciler.reconcile(change, existing.as_deref()).await;
    *usage = merge_usage(usage.take(), reconciliation.usage);

    let outcome = writer::write_if_changed(
        &target,
        existing.as_deref(),
        &reconciliation.file.content,
        options.dry_run,
    )?;

    Ok(FileReport {
        path: reconciliation.file.path,
        is_new_file: change.is_new_file,
        outcome: FileOutcome::Written(outcome),
        source: Some(reconciliation.source),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(path: &str, outcome: FileOutcome, source: Option<ContentSource>) -> FileReport {
        FileReport {
            path: path.to_string(),
            is_new_file: false,
            outcome,
            source,
        }
    }

    #[test]
    fn test_summary_counts_only_real_changes() {
        let summary = RunSummary {
            files: vec![
                report(
                    "a.js",
                    FileOutcome::Written(WriteOutcome::Updated),
                    Some(ContentSource::Reconciled),
                ),
                report(
                    "b.js",
                    FileOutcome::Written(WriteOutcome::Unchanged),
                    Some(ContentSource::Reconciled),
                ),
                report("../c.js", FileOutcome::Skipped("escapes".to_string()), None),
                report(
                    "d.js",
                    FileOutcome::Written(WriteOutcome::Created),
                    Some(ContentSource::ProposedFallback),
                ),
            ],
            usage: None,
            dry_run: false,
        };
        assert_eq!(summary.changed_count(), 2);

        let text = summary.to_string();
        assert!(text.contains("updated    a.js"));
        assert!(text.contains("no change  b.js"));
        assert!(text.contains("skipped (escapes) ../c.js"));
        assert!(text.contains("d.js [unreconciled]"));
        assert!(text.ends_with("2 of 4 proposed files changed"));
    }

    #[test]
    fn test_dry_run_summary_wording() {
        let summary = RunSummary {
            dry_run: true,
            ..RunSummary::default()
        };
        assert_eq!(summary.to_string(), "0 of 0 proposed files would change");
    }
}
