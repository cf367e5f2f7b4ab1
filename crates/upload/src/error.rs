//! Upload error types.

use std::path::PathBuf;

use cloudpan_client::ClientError;
use cloudpan_transfer::TransferError;

use crate::types::FileStage;

/// Errors produced while uploading.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("cannot access {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request failed: {0}")]
    Auth(#[source] ClientError),

    #[error("remote error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("block {index} failed verification: expected {expected}, got {actual}")]
    Integrity {
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("no transfer endpoint available")]
    EndpointUnavailable,

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid exclude pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("unexpected response: {0}")]
    Protocol(String),

    #[error("transfer error: {0}")]
    Transfer(TransferError),

    #[error("cancelled")]
    Cancelled,

    #[error("task failed: {0}")]
    Task(String),
}

impl From<ClientError> for UploadError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Remote { code, message } => Self::Remote { code, message },
            ClientError::Json(e) => Self::Protocol(e.to_string()),
            ClientError::UnexpectedResponse(m) => Self::Protocol(m),
            ClientError::InvalidArgument(m) => Self::InvalidPath(m),
            other => Self::Auth(other),
        }
    }
}

impl From<TransferError> for UploadError {
    fn from(e: TransferError) -> Self {
        match e {
            TransferError::FileAccess { path, source } => Self::FileAccess { path, source },
            TransferError::InvalidPath(m) => Self::InvalidPath(m),
            other => Self::Transfer(other),
        }
    }
}

impl From<tokio::task::JoinError> for UploadError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

/// Single-file failure tagged with the stage that could not be completed.
#[derive(Debug, thiserror::Error)]
#[error("{} failed: {error}", stage.step())]
pub struct StageError {
    pub stage: FileStage,
    #[source]
    pub error: UploadError,
}

impl StageError {
    pub fn new(stage: FileStage, error: impl Into<UploadError>) -> Self {
        Self {
            stage,
            error: error.into(),
        }
    }
}
