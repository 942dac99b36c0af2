use thiserror::Error as ThisError;

use super::{ApplyError, ConfigError, ExtractError, FetchError};

/// Top-level error type. Every stage-local error is caught at the
/// reconciler boundary and converted into an `Error(reason)` status;
/// nothing here crashes the process.
#[derive(Debug, ThisError)]
pub enum DumpsyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Apply(#[from] ApplyError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("state store error: {0}")]
    State(#[from] sqlx::Error),

    #[error("actor error: {0}")]
    Ractor(String),
}

impl DumpsyncError {
    /// Short label of the originating stage, used in logs.
    pub fn stage(&self) -> &'static str {
        match self {
            DumpsyncError::Fetch(_) => "fetch",
            DumpsyncError::Extract(_) => "extract",
            DumpsyncError::Apply(_) => "apply",
            DumpsyncError::Config(_) => "config",
            DumpsyncError::State(_) => "state",
            DumpsyncError::Ractor(_) => "actor",
        }
    }
}
