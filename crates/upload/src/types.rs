//! Data types for the upload flow.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use cloudpan_protocol::messages::CreatedFile;
use cloudpan_protocol::{ConflictPolicy, UploadMode};
use cloudpan_transfer::{BlockSize, UploadPlan};

use crate::error::UploadError;

/// Default worker count for either tier: one less than the available
/// parallelism, never below one.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

/// A negotiated upload attempt for one local file.
///
/// Read-only once negotiated, so block tasks share it without locking.
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub upload_id: String,
    pub endpoint: String,
    pub plan: Arc<UploadPlan>,
    /// Sent again at finalize time.
    pub policy: ConflictPolicy,
}

/// Outcome of one verified block transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTransferResult {
    pub index: usize,
    pub remote_hash: String,
}

/// Per-file pipeline state. Linear, with `Failed` reachable from any
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStage {
    Planned,
    Announced,
    EndpointLocated,
    BlocksTransferring,
    BlocksVerified,
    Finalized,
    Failed,
}

impl FileStage {
    /// Name of the step that produces this stage.
    pub fn step(self) -> &'static str {
        match self {
            Self::Planned => "plan",
            Self::Announced => "announce",
            Self::EndpointLocated => "locate endpoint",
            Self::BlocksTransferring | Self::BlocksVerified => "block transfer",
            Self::Finalized => "finalize",
            Self::Failed => "upload",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::Failed)
    }
}

impl fmt::Display for FileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Planned => "planned",
            Self::Announced => "announced",
            Self::EndpointLocated => "endpoint-located",
            Self::BlocksTransferring => "blocks-transferring",
            Self::BlocksVerified => "blocks-verified",
            Self::Finalized => "finalized",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Optional fields passed through to finalize. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizeOptions {
    pub local_ctime: Option<i64>,
    pub local_mtime: Option<i64>,
    pub is_revision: Option<bool>,
    pub mode: Option<UploadMode>,
}

/// Settings for a single-file upload.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub policy: ConflictPolicy,
    pub block_size: BlockSize,
    /// Concurrent block transfers per file.
    pub chunk_workers: usize,
    pub finalize: FinalizeOptions,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            policy: ConflictPolicy::default(),
            block_size: BlockSize::default(),
            chunk_workers: default_workers(),
            finalize: FinalizeOptions::default(),
        }
    }
}

/// Settings for a directory upload.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Concurrent files.
    pub file_workers: usize,
    /// Glob patterns matched against every relative path segment.
    pub exclude: Vec<String>,
    pub upload: UploadOptions,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            file_workers: default_workers(),
            exclude: Vec::new(),
            upload: UploadOptions::default(),
        }
    }
}

/// Progress event emitted during uploads. Purely observational.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    /// A file entered a new pipeline stage.
    Stage { remote_path: String, stage: FileStage },
    /// A block of a file was transferred and verified.
    Blocks {
        remote_path: String,
        uploaded: usize,
        total: usize,
    },
    /// A file finished, successfully or not.
    FileFinished {
        remote_path: String,
        error: Option<String>,
    },
}

/// A file that was uploaded.
#[derive(Debug, Clone)]
pub struct FileSuccess {
    pub local_path: PathBuf,
    pub remote_path: String,
    pub created: CreatedFile,
}

/// A file that could not be uploaded.
#[derive(Debug)]
pub struct FileFailure {
    pub local_path: PathBuf,
    pub remote_path: String,
    pub stage: FileStage,
    pub error: UploadError,
}

/// Accounting of a directory upload.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub successes: Vec<FileSuccess>,
    pub failures: Vec<FileFailure>,
    pub total_files: usize,
}

impl BatchResult {
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}
