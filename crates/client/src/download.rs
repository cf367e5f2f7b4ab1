//! File and directory downloads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cloudpan_protocol::messages::FileEntry;
use tracing::{debug, info};

use crate::error::ClientError;
use crate::gateway::Gateway;
use crate::metadata::Metadata;

/// What a finished download produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub fs_id: u64,
    pub remote_path: String,
    pub local_path: PathBuf,
    pub bytes: u64,
}

/// What a directory download produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirDownloadOutcome {
    pub files: Vec<DownloadOutcome>,
    /// Remote paths left alone because the local file already exists.
    pub skipped: Vec<String>,
}

impl DirDownloadOutcome {
    pub fn bytes(&self) -> u64 {
        self.files.iter().map(|f| f.bytes).sum()
    }
}

/// Downloads remote files by path.
///
/// Content hashes reported by the service are not compared against the
/// downloaded bytes; they are unreliable for large files.
pub struct Downloader {
    gateway: Arc<dyn Gateway>,
    metadata: Metadata,
}

impl Downloader {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            metadata: Metadata::new(Arc::clone(&gateway)),
            gateway,
        }
    }

    /// Resolves `remote`, fetches its download link and streams it to `local`.
    /// An existing `local` is only replaced when `overwrite` is set.
    pub async fn download_file(
        &self,
        remote: &str,
        local: &Path,
        overwrite: bool,
    ) -> Result<DownloadOutcome, ClientError> {
        if local.exists() && !overwrite {
            return Err(ClientError::InvalidArgument(format!(
                "{} already exists",
                local.display()
            )));
        }

        let entry = self.metadata.resolve_path(remote).await?;
        self.fetch_entry(&entry, local).await
    }

    /// Downloads every file under `remote_dir` into `local_dir`, keeping the
    /// remote layout. Directories themselves are not created unless a file
    /// lands in them.
    ///
    /// Existing local files are skipped unless `overwrite` is set. The first
    /// failing file stops the walk.
    pub async fn download_dir(
        &self,
        remote_dir: &str,
        local_dir: &Path,
        overwrite: bool,
    ) -> Result<DirDownloadOutcome, ClientError> {
        if !remote_dir.starts_with('/') {
            return Err(ClientError::InvalidArgument(format!(
                "remote path must start with '/': {remote_dir}"
            )));
        }

        let files: Vec<FileEntry> = self
            .metadata
            .list_all(remote_dir, true)
            .await?
            .into_iter()
            .filter(|e| !e.is_dir())
            .collect();
        info!(remote = remote_dir, files = files.len(), "downloading directory");

        let mut outcome = DirDownloadOutcome::default();
        for entry in &files {
            let local = local_path_for(remote_dir, &entry.path, local_dir)?;
            if local.exists() && !overwrite {
                debug!(remote = %entry.path, local = %local.display(), "exists, skipping");
                outcome.skipped.push(entry.path.clone());
                continue;
            }
            outcome.files.push(self.fetch_entry(entry, &local).await?);
        }
        Ok(outcome)
    }

    /// Fetches the download link for `entry` and streams it to `local`.
    ///
    /// The body is written to `<local>.part` and renamed into place once
    /// complete.
    async fn fetch_entry(&self, entry: &FileEntry, local: &Path) -> Result<DownloadOutcome, ClientError> {
        let meta = self
            .metadata
            .file_metas(&[entry.fs_id], true)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::UnexpectedResponse("empty filemetas list".into()))?;
        let dlink = meta
            .dlink
            .filter(|l| !l.is_empty())
            .ok_or_else(|| ClientError::UnexpectedResponse("filemetas returned no dlink".into()))?;

        if let Some(parent) = local.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let partial = part_path(local);
        debug!(remote = %entry.path, fs_id = entry.fs_id, dest = %partial.display(), "downloading");

        let bytes = match self.gateway.download(dlink, partial.clone()).await {
            Ok(n) => n,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };
        tokio::fs::rename(&partial, local).await?;
        info!(remote = %entry.path, local = %local.display(), bytes, "download complete");

        Ok(DownloadOutcome {
            fs_id: entry.fs_id,
            remote_path: entry.path.clone(),
            local_path: local.to_path_buf(),
            bytes,
        })
    }
}

/// Maps a remote file under `remote_dir` to its place under `local_dir`.
/// Paths outside `remote_dir` or with `.`/`..` segments are rejected.
fn local_path_for(remote_dir: &str, remote: &str, local_dir: &Path) -> Result<PathBuf, ClientError> {
    let bad = || ClientError::UnexpectedResponse(format!("{remote} is not under {remote_dir}"));
    let relative = remote
        .strip_prefix(remote_dir.trim_end_matches('/'))
        .and_then(|r| r.strip_prefix('/'))
        .ok_or_else(bad)?;

    let mut local = local_dir.to_path_buf();
    for segment in relative.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(bad());
        }
        local.push(segment);
    }
    Ok(local)
}

fn part_path(local: &Path) -> PathBuf {
    let mut name = local.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}
