//! Error handling module for dockerup
//!
//! Provides the error taxonomy for the provisioning pipeline using thiserror.
//! Every fatal condition maps to one variant; cleanup failures are logged
//! by the caller and never surface here.

use thiserror::Error;

/// Main error type for the provisioning pipeline
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Missing privilege or missing required tool, detected before any mutation
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// An external command exited non-zero or could not be started
    #[error("Command `{program}` failed{}: {detail}", .code.map(|c| format!(" with exit code {c}")).unwrap_or_default())]
    Command {
        program: String,
        code: Option<i32>,
        detail: String,
    },

    /// Downloaded key or host metadata failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// The test workload did not run successfully
    #[error("Verification failed: {0}")]
    Verification(String),

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pipeline state machine transition errors
    #[error("Install transition error: {0}")]
    Transition(String),

    /// IO errors (keyring, sources list, os-release)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisionError>;

impl ProvisionError {
    /// Create a precondition error
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Create a command failure error
    pub fn command(program: impl Into<String>, code: Option<i32>, detail: impl Into<String>) -> Self {
        Self::Command {
            program: program.into(),
            code,
            detail: detail.into(),
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a verification error
    pub fn verification(msg: impl Into<String>) -> Self {
        Self::Verification(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Process exit code for this error. Every fatal condition exits 1.
    pub fn exit_code(&self) -> u8 {
        1
    }
}
