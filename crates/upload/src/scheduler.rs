//! Concurrent block transfer with per-block verification.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use cloudpan_client::{ApiRequest, FilePart, Gateway};
use cloudpan_protocol::endpoints;
use cloudpan_protocol::messages::UploadPartResponse;
use cloudpan_protocol::Envelope;
use cloudpan_transfer::{TransferProgress, read_block};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::UploadError;
use crate::types::{BlockTransferResult, UploadSession};

/// Transfers every block of one file with bounded parallelism.
pub struct PartTransferScheduler {
    gateway: Arc<dyn Gateway>,
    workers: usize,
}

impl PartTransferScheduler {
    pub fn new(gateway: Arc<dyn Gateway>, workers: usize) -> Self {
        Self {
            gateway,
            workers: workers.max(1),
        }
    }

    /// Uploads all blocks of `session.plan`, returning results sorted by index.
    ///
    /// `min(workers, blocks)` tasks pull block indices from a shared cursor.
    /// The first failure cancels the remaining queued blocks and is returned.
    /// Blocks already on the wire are detached and their results dropped.
    pub async fn transfer(
        &self,
        session: &UploadSession,
        progress: Arc<TransferProgress>,
        cancel: &CancellationToken,
    ) -> Result<Vec<BlockTransferResult>, UploadError> {
        let count = session.plan.block_count();
        if count == 0 {
            return Ok(Vec::new());
        }

        let workers = self.workers.min(count);
        let next = Arc::new(AtomicUsize::new(0));
        let abort = cancel.child_token();
        let session = Arc::new(session.clone());
        let mut set = JoinSet::new();

        debug!(
            path = %session.plan.remote_path,
            blocks = count,
            workers,
            "transferring blocks"
        );

        for _ in 0..workers {
            let gateway = Arc::clone(&self.gateway);
            let session = Arc::clone(&session);
            let next = Arc::clone(&next);
            let abort = abort.clone();
            let progress = Arc::clone(&progress);

            set.spawn(async move {
                let mut done = Vec::new();
                loop {
                    if abort.is_cancelled() {
                        return Err(UploadError::Cancelled);
                    }
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    if index >= count {
                        return Ok(done);
                    }
                    let result = transfer_block(gateway.as_ref(), &session, index).await?;
                    if abort.is_cancelled() {
                        return Err(UploadError::Cancelled);
                    }
                    progress.increment();
                    done.push(result);
                }
            });
        }

        let mut results = Vec::with_capacity(count);
        while let Some(joined) = set.join_next().await {
            match joined.map_err(UploadError::from).and_then(|r| r) {
                Ok(mut done) => results.append(&mut done),
                Err(e) => {
                    abort.cancel();
                    set.detach_all();
                    // A sibling's Cancelled is a consequence, not the cause.
                    let e = if matches!(e, UploadError::Cancelled) && !cancel.is_cancelled() {
                        UploadError::Task("block worker stopped without an error".into())
                    } else {
                        e
                    };
                    warn!(path = %session.plan.remote_path, error = %e, "block transfer failed");
                    return Err(e);
                }
            }
        }

        results.sort_by_key(|r| r.index);
        Ok(results)
    }
}

/// Reads, sends and verifies one block.
async fn transfer_block(
    gateway: &dyn Gateway,
    session: &UploadSession,
    index: usize,
) -> Result<BlockTransferResult, UploadError> {
    let plan = Arc::clone(&session.plan);
    let data = tokio::task::spawn_blocking(move || read_block(&plan, index)).await??;

    let url = format!(
        "{}{}",
        session.endpoint.trim_end_matches('/'),
        endpoints::SUPERFILE
    );
    let req = ApiRequest::post(url)
        .query("method", "upload")
        .query("type", "tmpfile")
        .query("path", &session.plan.remote_path)
        .query("uploadid", &session.upload_id)
        .query("partseq", index)
        .part(FilePart {
            field: "file".into(),
            file_name: "part".into(),
            data,
        });

    let value = gateway.request(req).await?;
    let expected = &session.plan.block_hashes[index];
    let resp: UploadPartResponse =
        serde_json::from_value(value.clone()).map_err(|e| UploadError::Protocol(e.to_string()))?;

    let Some(actual) = resp.md5 else {
        Envelope::from_value(&value).check().map_err(|s| UploadError::Remote {
            code: s.code,
            message: s.message,
        })?;
        return Err(UploadError::Integrity {
            index,
            expected: expected.clone(),
            actual: "<missing>".into(),
        });
    };
    if actual != *expected {
        return Err(UploadError::Integrity {
            index,
            expected: expected.clone(),
            actual,
        });
    }

    debug!(path = %session.plan.remote_path, index, "block verified");
    Ok(BlockTransferResult {
        index,
        remote_hash: actual,
    })
}
