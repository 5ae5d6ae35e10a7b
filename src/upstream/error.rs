use thiserror::Error;

use crate::budget::Transient;

/// Errors from the live catalog search API and the secondary invoke API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The call exceeded its deadline.
    #[error("upstream call timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// Non-success HTTP status.
    #[error("upstream returned status {status}: {message}")]
    Http { status: u16, message: String },

    /// Connection-level failure.
    #[error("upstream transport error: {0}")]
    Transport(String),

    /// 200 response whose body could not be decoded.
    #[error("upstream payload invalid: {0}")]
    InvalidPayload(String),

    /// 200 response whose rows are all structurally empty.
    #[error("upstream returned only shell rows")]
    ShellRows,
}

impl Transient for UpstreamError {
    fn is_transient(&self) -> bool {
        match self {
            UpstreamError::Timeout { .. } | UpstreamError::Transport(_) => true,
            UpstreamError::Http { status, .. } => *status >= 500,
            UpstreamError::InvalidPayload(_) | UpstreamError::ShellRows => false,
        }
    }
}

pub type UpstreamResult<T> = Result<T, UpstreamError>;
