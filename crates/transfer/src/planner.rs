use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use cloudpan_protocol::SLICE_HASH_LEN;
use md5::{Digest, Md5};

use crate::TransferError;
use crate::types::{BlockSize, UploadPlan};

/// MD5 of an empty input.
const EMPTY_HASH: &str = "d41d8cd98f00b204e9800998ecf8427e";

// ---------------------------------------------------------------------------
// Hash helpers
// ---------------------------------------------------------------------------

/// Computes MD5 of `data` and returns the lowercase hex digest.
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Computes MD5 of an entire file with constant memory.
pub fn hash_file(path: &Path) -> Result<String, TransferError> {
    let mut file = File::open(path).map_err(|e| TransferError::access(path, e))?;
    let mut hasher = Md5::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| TransferError::access(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Builds the upload plan for a regular file.
///
/// Single sequential pass: each block is read into memory, hashed, fed to the
/// whole-file and leading-slice hashers, then dropped before the next read.
pub fn plan_file(
    local: &Path,
    remote: &str,
    block_size: BlockSize,
) -> Result<UploadPlan, TransferError> {
    let mut file = File::open(local).map_err(|e| TransferError::access(local, e))?;
    let size = file
        .metadata()
        .map_err(|e| TransferError::access(local, e))?
        .len();

    let count = block_size.block_count(size);
    let mut block_hashes = Vec::with_capacity(count);
    let mut whole = Md5::new();
    let mut slice = Md5::new();
    let mut slice_left = SLICE_HASH_LEN;

    for index in 0..count {
        let data = read_exact_block(&mut file, block_size.bytes())
            .map_err(|e| TransferError::access(local, e))?;

        whole.update(&data);
        if slice_left > 0 {
            let take = slice_left.min(data.len() as u64) as usize;
            slice.update(&data[..take]);
            slice_left -= take as u64;
        }
        block_hashes.push(hash_bytes(&data));

        tracing::trace!(path = %local.display(), index, len = data.len(), "block hashed");
    }

    Ok(UploadPlan {
        local_path: local.to_path_buf(),
        remote_path: remote.to_string(),
        size,
        is_dir: false,
        block_size,
        block_hashes,
        whole_file_hash: hex::encode(whole.finalize()),
        leading_slice_hash: hex::encode(slice.finalize()),
    })
}

/// Builds the plan for a directory entry: no size, no blocks.
pub fn plan_dir(local: &Path, remote: &str) -> UploadPlan {
    UploadPlan {
        local_path: local.to_path_buf(),
        remote_path: remote.to_string(),
        size: 0,
        is_dir: true,
        block_size: BlockSize::default(),
        block_hashes: Vec::new(),
        whole_file_hash: EMPTY_HASH.into(),
        leading_slice_hash: EMPTY_HASH.into(),
    }
}

/// Reads block `index` of `plan` from its local file.
///
/// Returns the bytes `[index * block_size, min(size, (index + 1) * block_size))`.
pub fn read_block(plan: &UploadPlan, index: usize) -> Result<Vec<u8>, TransferError> {
    let (offset, len) = plan.block_range(index).ok_or(TransferError::BlockOutOfRange {
        index,
        count: plan.block_count(),
    })?;

    let path = &plan.local_path;
    let mut file = File::open(path).map_err(|e| TransferError::access(path, e))?;
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| TransferError::access(path, e))?;
    read_exact_block(&mut file, len).map_err(|e| TransferError::access(path, e))
}

/// Reads up to `len` bytes, stopping early only at EOF.
fn read_exact_block(file: &mut File, len: u64) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(len as usize);
    file.by_ref().take(len).read_to_end(&mut buf)?;
    Ok(buf)
}
