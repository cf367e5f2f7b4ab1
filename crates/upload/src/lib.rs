//! Chunked upload pipeline for the cloud storage open API.
//!
//! Business logic only. Every remote call goes through a
//! [`cloudpan_client::Gateway`], so the pipeline runs unchanged against the
//! real service or a test double.
//!
//! # Per-file pipeline
//!
//! 1. **Plan**: hash the file into fixed-size blocks
//! 2. **Announce**: `precreate` returns an upload id
//! 3. **Locate**: pick a transfer host for the blocks
//! 4. **Transfer**: send blocks concurrently, verifying each echoed hash
//! 5. **Finalize**: `create` merges the blocks into the remote file
//!
//! [`BatchOrchestrator`] walks a directory and runs that pipeline for many
//! files at once.

pub mod batch;
pub mod error;
pub mod finalize;
pub mod pipeline;
pub mod scanner;
pub mod scheduler;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::BatchOrchestrator;
pub use error::{StageError, UploadError};
pub use finalize::Finalizer;
pub use pipeline::FileUploader;
pub use scanner::{ExcludeSet, ScannedFile, scan_files_for_upload};
pub use scheduler::PartTransferScheduler;
pub use session::SessionNegotiator;
pub use types::{
    BatchOptions, BatchResult, BlockTransferResult, FileFailure, FileStage, FileSuccess,
    FinalizeOptions, UploadEvent, UploadOptions, UploadSession, default_workers,
};
