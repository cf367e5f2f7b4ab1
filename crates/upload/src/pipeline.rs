//! Single-file upload pipeline.
//!
//! Runs plan, announce, locate, transfer and finalize in order for one
//! local file. Each failure is tagged with the stage it prevented.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cloudpan_client::Gateway;
use cloudpan_protocol::messages::CreatedFile;
use cloudpan_transfer::{ProgressSnapshot, TransferProgress, plan_dir, plan_file, validate_remote_path};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{StageError, UploadError};
use crate::finalize::Finalizer;
use crate::scheduler::PartTransferScheduler;
use crate::session::SessionNegotiator;
use crate::types::{FileStage, UploadEvent, UploadOptions, UploadSession};

/// Uploads single files through the full pipeline.
pub struct FileUploader {
    negotiator: SessionNegotiator,
    scheduler: PartTransferScheduler,
    finalizer: Finalizer,
    options: UploadOptions,
    events_tx: Option<mpsc::Sender<UploadEvent>>,
    cancel: CancellationToken,
}

impl FileUploader {
    pub fn new(gateway: Arc<dyn Gateway>, options: UploadOptions) -> Self {
        Self {
            negotiator: SessionNegotiator::new(Arc::clone(&gateway)),
            scheduler: PartTransferScheduler::new(Arc::clone(&gateway), options.chunk_workers),
            finalizer: Finalizer::new(gateway),
            options,
            events_tx: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Sends stage and block events to `tx`. Events are dropped when the
    /// channel is full.
    pub fn with_events(mut self, tx: mpsc::Sender<UploadEvent>) -> Self {
        self.events_tx = Some(tx);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Uploads `local` to `remote` and returns the created file.
    pub async fn upload_file(&self, local: &Path, remote: &str) -> Result<CreatedFile, StageError> {
        self.step(FileStage::Planned)?;
        validate_remote_path(remote).map_err(|e| StageError::new(FileStage::Planned, e))?;

        let plan = {
            let local: PathBuf = local.to_path_buf();
            let remote = remote.to_string();
            let block_size = self.options.block_size;
            tokio::task::spawn_blocking(move || plan_file(&local, &remote, block_size))
                .await
                .map_err(|e| StageError::new(FileStage::Planned, e))?
                .map_err(|e| StageError::new(FileStage::Planned, e))?
        };
        let plan = Arc::new(plan);
        let total = plan.block_count();
        debug!(path = remote, size = plan.size, blocks = total, "planned");
        self.emit_stage(remote, FileStage::Planned);

        self.step(FileStage::Announced)?;
        let upload_id = self
            .negotiator
            .announce(&plan, self.options.policy)
            .await
            .map_err(|e| StageError::new(FileStage::Announced, e))?;
        self.emit_stage(remote, FileStage::Announced);

        self.step(FileStage::EndpointLocated)?;
        let endpoint = self
            .negotiator
            .locate(remote, &upload_id)
            .await
            .map_err(|e| StageError::new(FileStage::EndpointLocated, e))?;
        self.emit_stage(remote, FileStage::EndpointLocated);

        let session = UploadSession {
            upload_id,
            endpoint,
            plan: Arc::clone(&plan),
            policy: self.options.policy,
        };

        self.step(FileStage::BlocksVerified)?;
        self.emit_stage(remote, FileStage::BlocksTransferring);
        let progress = Arc::new(self.progress_for(remote, total));
        self.scheduler
            .transfer(&session, progress, &self.cancel)
            .await
            .map_err(|e| StageError::new(FileStage::BlocksVerified, e))?;
        self.emit_stage(remote, FileStage::BlocksVerified);

        self.step(FileStage::Finalized)?;
        let created = self
            .finalizer
            .finalize(&session, &self.options.finalize)
            .await
            .map_err(|e| StageError::new(FileStage::Finalized, e))?;
        self.emit_stage(remote, FileStage::Finalized);

        info!(local = %local.display(), remote, bytes = plan.size, "uploaded");
        Ok(created)
    }

    /// Creates a remote directory. No endpoint or block transfer is involved.
    pub async fn create_dir(&self, remote: &str) -> Result<CreatedFile, StageError> {
        self.step(FileStage::Planned)?;
        validate_remote_path(remote).map_err(|e| StageError::new(FileStage::Planned, e))?;
        let plan = Arc::new(plan_dir(Path::new(""), remote));

        self.step(FileStage::Announced)?;
        let upload_id = self
            .negotiator
            .announce(&plan, self.options.policy)
            .await
            .map_err(|e| StageError::new(FileStage::Announced, e))?;

        let session = UploadSession {
            upload_id,
            endpoint: String::new(),
            plan,
            policy: self.options.policy,
        };

        self.step(FileStage::Finalized)?;
        let created = self
            .finalizer
            .finalize(&session, &self.options.finalize)
            .await
            .map_err(|e| StageError::new(FileStage::Finalized, e))?;
        info!(remote, "directory created");
        Ok(created)
    }

    /// Fails with `Cancelled` before starting the step that produces `next`.
    fn step(&self, next: FileStage) -> Result<(), StageError> {
        if self.cancel.is_cancelled() {
            return Err(StageError::new(next, UploadError::Cancelled));
        }
        Ok(())
    }

    fn emit_stage(&self, remote: &str, stage: FileStage) {
        if let Some(tx) = &self.events_tx {
            let _ = tx.try_send(UploadEvent::Stage {
                remote_path: remote.to_string(),
                stage,
            });
        }
    }

    fn progress_for(&self, remote: &str, total: usize) -> TransferProgress {
        let Some(tx) = self.events_tx.clone() else {
            return TransferProgress::new(total);
        };
        let remote = remote.to_string();
        TransferProgress::with_callback(
            total,
            Arc::new(move |s: ProgressSnapshot| {
                let _ = tx.try_send(UploadEvent::Blocks {
                    remote_path: remote.clone(),
                    uploaded: s.uploaded,
                    total: s.total,
                });
            }),
        )
    }
}
