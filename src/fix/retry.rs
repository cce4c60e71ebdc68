//! Bounded retry loop around the proposal step.
//!
//! The loop is an explicit state machine: a state, an attempt counter, and a
//! feedback string that grows with a corrective note after each unusable
//! attempt and is appended to the next prompt.

use crate::error::FixError;
use std::future::Future;

/// Generation attempts before the run is declared failed.
pub const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Attempting,
    Succeeded,
    ExhaustedRetries,
}

/// Why a single generation attempt produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// The response contained no extractable file blocks
    GenerationEmpty,
    /// The completion call itself failed
    Transport(String),
    /// Every proposed path failed resolution (strict path mode only)
    GenerationUnmatched(Vec<String>),
}

impl AttemptFailure {
    /// Note appended to the next prompt, if this failure is the model's doing.
    fn corrective_note(&self) -> Option<String> {
        match self {
            AttemptFailure::GenerationEmpty => Some(
                "NOTE: Your previous response contained no usable file blocks. \
                 Respond only with `File: <path>` lines each followed by a fenced code block."
                    .to_string(),
            ),
            AttemptFailure::GenerationUnmatched(paths) => Some(format!(
                "NOTE: The files {:?} do not exist in the repository. Please only use existing files.",
                paths
            )),
            AttemptFailure::Transport(_) => None,
        }
    }
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptFailure::GenerationEmpty => write!(f, "no code changes were generated"),
            AttemptFailure::Transport(cause) => write!(f, "completion call failed: {}", cause),
            AttemptFailure::GenerationUnmatched(paths) => {
                write!(f, "no proposed path matches the repository: {}", paths.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryController {
    state: RetryState,
    attempts: u32,
    feedback: String,
}

impl Default for RetryController {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryController {
    pub fn new() -> Self {
        Self {
            state: RetryState::Attempting,
            attempts: 0,
            feedback: String::new(),
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    /// Attempts started so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Accumulated corrective notes for the next prompt.
    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    /// Start the next attempt, returning its 1-based number, or `None` once
    /// the loop has left the `Attempting` state.
    pub fn begin_attempt(&mut self) -> Option<u32> {
        if self.state != RetryState::Attempting || self.attempts >= MAX_ATTEMPTS {
            return None;
        }
        self.attempts += 1;
        Some(self.attempts)
    }

    pub fn record_success(&mut self) {
        if self.state == RetryState::Attempting {
            self.state = RetryState::Succeeded;
        }
    }

    pub fn record_failure(&mut self, failure: &AttemptFailure) {
        if self.state != RetryState::Attempting {
            return;
        }
        if let Some(note) = failure.corrective_note() {
            if !self.feedback.contains(&note) {
                if !self.feedback.is_empty() {
                    self.feedback.push('\n');
                }
                self.feedback.push_str(&note);
            }
        }
        if self.attempts >= MAX_ATTEMPTS {
            self.state = RetryState::ExhaustedRetries;
        }
    }
}

/// Drive `attempt` until it succeeds or the ceiling is reached.
///
/// `attempt` receives the attempt number and the feedback accumulated so far.
pub async fn run_with_retry<T, F, Fut>(mut attempt: F) -> Result<T, FixError>
where
    F: FnMut(u32, String) -> Fut,
    Fut: Future<Output = Result<T, AttemptFailure>>,
{
    let mut controller = RetryController::new();

    while let Some(number) = controller.begin_attempt() {
        tracing::info!(attempt = number, max = MAX_ATTEMPTS, "generating code changes");
        match attempt(number, controller.feedback().to_string()).await {
            Ok(value) => {
                controller.record_success();
                return Ok(value);
            }
            Err(failure) => {
                tracing::warn!(attempt = number, "attempt failed: {}", failure);
                controller.record_failure(&failure);
            }
        }
    }

    tracing::error!(
        attempts = controller.attempts(),
        "failed to generate valid code changes"
    );
    Err(FixError::RetriesExhausted {
        attempts: controller.attempts(),
    })
}
