//! Upload negotiation: announce the file, then locate a transfer host.

use std::sync::Arc;

use cloudpan_client::{ApiRequest, Gateway, fetch};
use cloudpan_protocol::endpoints;
use cloudpan_protocol::messages::{LocateUploadResponse, PrecreateRequest, PrecreateResponse};
use cloudpan_protocol::ConflictPolicy;
use cloudpan_transfer::UploadPlan;
use tracing::debug;

use crate::error::UploadError;
use crate::types::UploadSession;

/// Obtains an upload id and transfer endpoint for a plan.
///
/// No retries here; a caller that wants one restarts the whole attempt.
pub struct SessionNegotiator {
    gateway: Arc<dyn Gateway>,
}

impl SessionNegotiator {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Announces the upload (`precreate`) and returns the upload id.
    pub async fn announce(
        &self,
        plan: &UploadPlan,
        policy: ConflictPolicy,
    ) -> Result<String, UploadError> {
        let (content_md5, slice_md5) = if plan.is_dir {
            (None, None)
        } else {
            (
                Some(plan.whole_file_hash.clone()),
                Some(plan.leading_slice_hash.clone()),
            )
        };
        let body = PrecreateRequest {
            path: plan.remote_path.clone(),
            size: plan.size,
            is_dir: plan.is_dir,
            block_list: plan.block_hashes.clone(),
            policy,
            content_md5,
            slice_md5,
            local_ctime: None,
            local_mtime: None,
        };
        let req = ApiRequest::post(endpoints::FILE)
            .query("method", "precreate")
            .form(body.to_form());

        let resp: PrecreateResponse = fetch(self.gateway.as_ref(), req).await?;
        if resp.uploadid.is_empty() {
            return Err(UploadError::Protocol("precreate returned no uploadid".into()));
        }
        debug!(
            path = %plan.remote_path,
            upload_id = %resp.uploadid,
            return_type = resp.return_type,
            "announced"
        );
        Ok(resp.uploadid)
    }

    /// Asks for transfer hosts and picks the first.
    pub async fn locate(&self, remote_path: &str, upload_id: &str) -> Result<String, UploadError> {
        let req = ApiRequest::get(endpoints::LOCATE_UPLOAD_URL)
            .query("method", "locateupload")
            .query("appid", endpoints::LOCATE_APP_ID)
            .query("path", remote_path)
            .query("uploadid", upload_id)
            .query("upload_version", endpoints::UPLOAD_VERSION);

        let resp: LocateUploadResponse = fetch(self.gateway.as_ref(), req).await?;
        let server = resp
            .first_server()
            .ok_or(UploadError::EndpointUnavailable)?
            .to_string();
        debug!(path = remote_path, server = %server, "endpoint located");
        Ok(server)
    }

    /// Announce followed by locate.
    pub async fn negotiate(
        &self,
        plan: Arc<UploadPlan>,
        policy: ConflictPolicy,
    ) -> Result<UploadSession, UploadError> {
        let upload_id = self.announce(&plan, policy).await?;
        let endpoint = self.locate(&plan.remote_path, &upload_id).await?;
        Ok(UploadSession {
            upload_id,
            endpoint,
            plan,
            policy,
        })
    }
}
