use std::sync::Arc;

use cloudpan_protocol::endpoints;
use cloudpan_protocol::messages::{Quota, UserInfo};
use cloudpan_transfer::BlockSize;
use tracing::debug;

use crate::error::ClientError;
use crate::gateway::{ApiRequest, Gateway, fetch};

/// Account information and the block size tier it implies.
pub struct Account {
    gateway: Arc<dyn Gateway>,
}

impl Account {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn user_info(&self) -> Result<UserInfo, ClientError> {
        let req = ApiRequest::get(endpoints::NAS).query("method", "uinfo");
        fetch(self.gateway.as_ref(), req).await
    }

    pub async fn quota(&self) -> Result<Quota, ClientError> {
        let req = ApiRequest::get(endpoints::QUOTA)
            .query("checkfree", 1)
            .query("checkexpire", 1);
        fetch(self.gateway.as_ref(), req).await
    }

    /// Looks up the account tier once and returns its block size.
    pub async fn block_size(&self) -> Result<BlockSize, ClientError> {
        let info = self.user_info().await?;
        let size = BlockSize::for_vip_type(info.vip_type);
        debug!(vip_type = info.vip_type, block_size = size.bytes(), "resolved block size");
        Ok(size)
    }
}
