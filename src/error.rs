//! Errors surfaced by the validation operation.

use thiserror::Error;

/// Failure of a `validate` call.
///
/// `InvalidArgument` is reported before any source is checked; `Internal`
/// covers store failures and anything unexpected during the batch. Probe
/// failures never appear here; they are folded into the `urlAccessible`
/// check.
#[derive(Error, Debug)]
pub enum ValidateError {
    /// Malformed request (missing session id, bad sources, oversized batch).
    #[error("{0}")]
    InvalidArgument(String),

    /// Persistence or other internal failure.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ValidateError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ValidateError::InvalidArgument(message.into())
    }
}
