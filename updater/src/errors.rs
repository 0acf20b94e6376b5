//! Error types for sysupdate

use thiserror::Error;

/// Exit code used when a run is interrupted by a termination signal
pub const EXIT_INTERRUPTED: i32 = 130;

/// Main error type for an update run
#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Failed to launch {program}: {reason}")]
    SpawnError { program: String, reason: String },

    #[error("Step '{step}' failed{}", .code.map(|c| format!(" with exit code {c}")).unwrap_or_default())]
    StepFailed { step: String, code: Option<i32> },

    #[error("Prompt error: {0}")]
    PromptError(String),

    #[error("Declined by operator: {0}")]
    Declined(String),

    #[error("Interrupted")]
    Interrupted,
}

impl UpdateError {
    /// Process exit code for this error.
    ///
    /// A failed step propagates the external tool's own exit code when it has one.
    pub fn exit_code(&self) -> i32 {
        match self {
            UpdateError::StepFailed { code: Some(code), .. } if *code != 0 => *code,
            UpdateError::Interrupted => EXIT_INTERRUPTED,
            _ => 1,
        }
    }
}
