//! Block planning, block reads and progress accounting for chunked uploads.
//!
//! Everything here is local: hashing and file I/O. Network transfer lives in
//! `cloudpan-upload`.

mod planner;
mod progress;
mod types;
mod validation;

use std::path::PathBuf;

pub use planner::{hash_bytes, hash_file, plan_dir, plan_file, read_block};
pub use progress::{ProgressCallback, ProgressSnapshot, TransferProgress};
pub use types::{BlockSize, UploadPlan};
pub use validation::{join_remote, validate_remote_path};

/// Length of a hex-encoded MD5 digest.
pub const HASH_HEX_LEN: usize = 32;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("cannot access {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid block size: {0}")]
    InvalidBlockSize(u64),

    #[error("block {index} out of range ({count} blocks)")]
    BlockOutOfRange { index: usize, count: usize },

    #[error("invalid remote path: {0}")]
    InvalidPath(String),
}

impl TransferError {
    pub(crate) fn access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileAccess {
            path: path.into(),
            source,
        }
    }
}
