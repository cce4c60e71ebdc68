use thiserror::Error;

/// Fatal errors that abort a remediation run.
///
/// Recoverable failures (empty generations, transport errors during an
/// attempt, failed reconciliation calls) never surface here; they are handled
/// by the retry loop or by the per-file fallback.
#[derive(Debug, Error)]
pub enum FixError {
    #[error("missing required environment variable {0}")]
    ConfigurationMissing(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("no usable code changes after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("repository provider error: {0}")]
    Repository(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FixError {
    /// Process exit code for this error.
    ///
    /// Every fatal outcome exits with 1; success is 0.
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Short machine-friendly label, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FixError::ConfigurationMissing(_) => "configuration_missing",
            FixError::InvalidConfiguration(_) => "invalid_configuration",
            FixError::RetriesExhausted { .. } => "retries_exhausted",
            FixError::Repository(_) => "repository",
            FixError::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, FixError>;
