//! Batch orchestrator for directory uploads.
//!
//! Scans a local directory, runs the single-file pipeline for every file
//! with bounded parallelism, and aggregates per-file outcomes. A failed file
//! never stops the others.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cloudpan_client::Gateway;
use cloudpan_transfer::{join_remote, validate_remote_path};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{StageError, UploadError};
use crate::pipeline::FileUploader;
use crate::scanner::{ExcludeSet, ScannedFile, scan_files_for_upload};
use crate::types::{BatchOptions, BatchResult, FileFailure, FileStage, FileSuccess, UploadEvent};

/// Uploads directory trees.
pub struct BatchOrchestrator {
    gateway: Arc<dyn Gateway>,
    options: BatchOptions,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
    cancel: CancellationToken,
}

impl BatchOrchestrator {
    pub fn new(gateway: Arc<dyn Gateway>, options: BatchOptions) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            gateway,
            options,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    /// Returns the cancellation token for this batch.
    ///
    /// Files not yet started when it fires are recorded as cancelled
    /// failures; files in flight stop at their next stage boundary.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Uploads every non-excluded file under `local_root` to the same
    /// relative path under `remote_root`.
    ///
    /// Returns `Err` only when the batch cannot start (bad root, bad
    /// pattern). Per-file problems land in [`BatchResult::failures`].
    pub async fn upload_dir(
        &self,
        local_root: &Path,
        remote_root: &str,
    ) -> Result<BatchResult, UploadError> {
        validate_remote_path(remote_root)?;
        let exclude = ExcludeSet::new(&self.options.exclude)?;

        let files = {
            let root = local_root.to_path_buf();
            tokio::task::spawn_blocking(move || scan_files_for_upload(&root, &exclude)).await??
        };
        if files.is_empty() {
            info!(root = %local_root.display(), "nothing to upload");
            return Ok(BatchResult::default());
        }

        let total = files.len();
        let jobs: Arc<Vec<(ScannedFile, String)>> = Arc::new(
            files
                .into_iter()
                .map(|f| {
                    let remote = join_remote(remote_root, &f.relative_path);
                    (f, remote)
                })
                .collect(),
        );

        let uploader = Arc::new(
            FileUploader::new(Arc::clone(&self.gateway), self.options.upload.clone())
                .with_events(self.events_tx.clone())
                .with_cancel(self.cancel.clone()),
        );
        let ledger = Arc::new(Mutex::new(BatchResult::default()));
        let next = Arc::new(AtomicUsize::new(0));
        let workers = self.options.file_workers.max(1).min(total);

        info!(
            root = %local_root.display(),
            remote = remote_root,
            files = total,
            workers,
            "batch upload started"
        );

        let mut set = JoinSet::new();
        for _ in 0..workers {
            let uploader = Arc::clone(&uploader);
            let jobs = Arc::clone(&jobs);
            let ledger = Arc::clone(&ledger);
            let next = Arc::clone(&next);
            let cancel = self.cancel.clone();
            let events_tx = self.events_tx.clone();

            set.spawn(async move {
                loop {
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some((file, remote)) = jobs.get(index) else {
                        break;
                    };

                    let outcome = if cancel.is_cancelled() {
                        Err(StageError::new(FileStage::Planned, UploadError::Cancelled))
                    } else {
                        uploader.upload_file(&file.local_path, remote).await
                    };

                    let error = outcome.as_ref().err().map(|e| e.to_string());
                    match outcome {
                        Ok(created) => {
                            ledger.lock().unwrap().successes.push(FileSuccess {
                                local_path: file.local_path.clone(),
                                remote_path: remote.clone(),
                                created,
                            });
                        }
                        Err(e) => {
                            warn!(remote = %remote, error = %e, "file upload failed");
                            ledger.lock().unwrap().failures.push(FileFailure {
                                local_path: file.local_path.clone(),
                                remote_path: remote.clone(),
                                stage: e.stage,
                                error: e.error,
                            });
                        }
                    }
                    let _ = events_tx.try_send(UploadEvent::FileFinished {
                        remote_path: remote.clone(),
                        error,
                    });
                }
            });
        }

        while let Some(joined) = set.join_next().await {
            joined?;
        }

        let mut result = std::mem::take(&mut *ledger.lock().unwrap());
        result.total_files = total;
        info!(
            succeeded = result.success_count(),
            failed = result.failure_count(),
            total,
            "batch upload finished"
        );
        Ok(result)
    }
}
