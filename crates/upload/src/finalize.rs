use std::sync::Arc;

use cloudpan_client::{ApiRequest, Gateway, fetch};
use cloudpan_protocol::endpoints;
use cloudpan_protocol::messages::{CreateRequest, CreatedFile};
use tracing::info;

use crate::error::UploadError;
use crate::types::{FinalizeOptions, UploadSession};

/// Commits a negotiated upload (`create`).
pub struct Finalizer {
    gateway: Arc<dyn Gateway>,
}

impl Finalizer {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Sends the planned block list in index order with the session's policy.
    pub async fn finalize(
        &self,
        session: &UploadSession,
        opts: &FinalizeOptions,
    ) -> Result<CreatedFile, UploadError> {
        let plan = &session.plan;
        let body = CreateRequest {
            path: plan.remote_path.clone(),
            size: plan.size,
            is_dir: plan.is_dir,
            block_list: plan.block_hashes.clone(),
            upload_id: session.upload_id.clone(),
            policy: session.policy,
            local_ctime: opts.local_ctime,
            local_mtime: opts.local_mtime,
            is_revision: opts.is_revision,
            mode: opts.mode,
        };
        let req = ApiRequest::post(endpoints::FILE)
            .query("method", "create")
            .form(body.to_form());

        let created: CreatedFile = fetch(self.gateway.as_ref(), req).await?;
        info!(path = %created.path, fs_id = created.fs_id, size = created.size, "created");
        Ok(created)
    }
}
