use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::TransferError;

const MIB: u64 = 1024 * 1024;

/// Size of one upload block, fixed per account tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockSize(u64);

impl BlockSize {
    /// Regular accounts: 4 MiB.
    pub const DEFAULT: Self = Self(4 * MIB);
    /// Member accounts (`vip_type = 1`): 16 MiB.
    pub const MEMBER: Self = Self(16 * MIB);
    /// Super member accounts (`vip_type = 2`): 32 MiB.
    pub const SUPER_MEMBER: Self = Self(32 * MIB);

    /// Maps the account's `vip_type` to its block size. Unknown tiers get the default.
    pub fn for_vip_type(vip_type: i64) -> Self {
        match vip_type {
            1 => Self::MEMBER,
            2 => Self::SUPER_MEMBER,
            _ => Self::DEFAULT,
        }
    }

    /// Arbitrary non-zero block size.
    pub fn from_bytes(bytes: u64) -> Result<Self, TransferError> {
        if bytes == 0 {
            return Err(TransferError::InvalidBlockSize(bytes));
        }
        Ok(Self(bytes))
    }

    pub fn bytes(self) -> u64 {
        self.0
    }

    /// Number of blocks needed for `size` bytes.
    pub fn block_count(self, size: u64) -> usize {
        size.div_ceil(self.0) as usize
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Everything needed to upload one local entry, computed once up front.
///
/// `block_hashes[i]` covers bytes `[i * block_size, min(size, (i + 1) * block_size))`.
/// The list is sent verbatim at announce and finalize time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPlan {
    pub local_path: PathBuf,
    pub remote_path: String,
    pub size: u64,
    pub is_dir: bool,
    pub block_size: BlockSize,
    pub block_hashes: Vec<String>,
    pub whole_file_hash: String,
    pub leading_slice_hash: String,
}

impl UploadPlan {
    pub fn block_count(&self) -> usize {
        self.block_hashes.len()
    }

    /// Byte range `(offset, len)` of block `index`.
    pub fn block_range(&self, index: usize) -> Option<(u64, u64)> {
        if index >= self.block_hashes.len() {
            return None;
        }
        let bs = self.block_size.bytes();
        let offset = index as u64 * bs;
        Some((offset, bs.min(self.size - offset)))
    }
}
