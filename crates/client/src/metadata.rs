//! Listing, search, metadata and file operations.

use std::sync::Arc;
use std::time::Duration;

use cloudpan_protocol::endpoints;
use cloudpan_protocol::messages::{
    FileEntry, FileManagerItem, FileManagerRequest, FileManagerResponse, FileMeta,
    FileMetasResponse, ListPage,
};
use cloudpan_protocol::{FileOperation, OnDuplicate};
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::gateway::{ApiRequest, Gateway, fetch};

const LISTALL_PAGE: u32 = 1000;
const LISTALL_MAX_TRIES: u32 = 5;
const LISTALL_BACKOFF: Duration = Duration::from_secs(2);
const SEARCH_NUM: u32 = 500;

/// Sort key for directory listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Name,
    Size,
    Time,
}

impl SortOrder {
    fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Size => "size",
            Self::Time => "time",
        }
    }
}

/// Options for a single-directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    pub order: SortOrder,
    pub desc: bool,
    pub start: u32,
    pub limit: u32,
    /// Only list folders.
    pub folders_only: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            order: SortOrder::Name,
            desc: false,
            start: 0,
            limit: 1000,
            folders_only: false,
        }
    }
}

/// Metadata/listing service.
pub struct Metadata {
    gateway: Arc<dyn Gateway>,
    backoff: Duration,
}

impl Metadata {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            backoff: LISTALL_BACKOFF,
        }
    }

    /// Overrides the per-attempt back-off of [`list_all`](Self::list_all).
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Lists one directory (non-recursive).
    pub async fn list_dir(&self, dir: &str, opts: &ListOptions) -> Result<Vec<FileEntry>, ClientError> {
        let req = ApiRequest::get(endpoints::FILE)
            .query("method", "list")
            .query("dir", dir)
            .query("order", opts.order.as_str())
            .query("desc", u8::from(opts.desc))
            .query("start", opts.start)
            .query("limit", opts.limit)
            .query("web", 0)
            .query("folder", u8::from(opts.folders_only))
            .query("showempty", 1);
        let page: ListPage = fetch(self.gateway.as_ref(), req).await?;
        Ok(page.list)
    }

    /// Fetches one cursor page of `listall`.
    pub async fn list_page(
        &self,
        path: &str,
        recursive: bool,
        cursor: u64,
        limit: u32,
    ) -> Result<ListPage, ClientError> {
        let req = ApiRequest::get(endpoints::MULTIMEDIA)
            .query("method", "listall")
            .query("path", path)
            .query("recursion", u8::from(recursive))
            .query("start", cursor)
            .query("limit", limit)
            .query("web", 0);
        fetch(self.gateway.as_ref(), req).await
    }

    /// Lists everything under `path`, following the cursor until exhausted.
    ///
    /// A failed page is retried up to five times, waiting `backoff * attempt`
    /// between tries. The attempt count resets after each successful page.
    pub async fn list_all(&self, path: &str, recursive: bool) -> Result<Vec<FileEntry>, ClientError> {
        let mut entries = Vec::new();
        let mut cursor = 0u64;
        let mut tries = 0u32;

        loop {
            match self.list_page(path, recursive, cursor, LISTALL_PAGE).await {
                Ok(page) => {
                    tries = 0;
                    let more = page.has_more();
                    debug!(path, cursor, count = page.list.len(), more, "listall page");
                    entries.extend(page.list);
                    if !more {
                        return Ok(entries);
                    }
                    cursor = page.cursor;
                }
                Err(e) => {
                    tries += 1;
                    if tries >= LISTALL_MAX_TRIES {
                        return Err(e);
                    }
                    warn!(path, cursor, attempt = tries, error = %e, "listall page failed, retrying");
                    tokio::time::sleep(self.backoff * tries).await;
                }
            }
        }
    }

    /// Searches file names. `dir` must be absolute.
    pub async fn search(&self, key: &str, dir: &str, recursive: bool) -> Result<Vec<FileEntry>, ClientError> {
        if !dir.starts_with('/') {
            return Err(ClientError::InvalidArgument(format!(
                "search directory must start with '/': {dir}"
            )));
        }
        let req = ApiRequest::get(endpoints::FILE)
            .query("method", "search")
            .query("key", key)
            .query("dir", dir)
            .query("recursion", u8::from(recursive))
            .query("num", SEARCH_NUM)
            .query("web", 0);
        let page: ListPage = fetch(self.gateway.as_ref(), req).await?;
        Ok(page.list)
    }

    /// Fetches metadata for the given ids, optionally with download links.
    pub async fn file_metas(&self, fs_ids: &[u64], with_dlink: bool) -> Result<Vec<FileMeta>, ClientError> {
        let req = ApiRequest::get(endpoints::MULTIMEDIA)
            .query("method", "filemetas")
            .query("fsids", serde_json::to_string(fs_ids)?)
            .query("dlink", u8::from(with_dlink));
        let resp: FileMetasResponse = fetch(self.gateway.as_ref(), req).await?;
        Ok(resp.list)
    }

    /// Copies, moves, renames or deletes remote entries.
    pub async fn file_manager(
        &self,
        op: FileOperation,
        items: Vec<FileManagerItem>,
        ondup: OnDuplicate,
    ) -> Result<FileManagerResponse, ClientError> {
        if items.is_empty() {
            return Err(ClientError::InvalidArgument("no files given".into()));
        }
        let mut request = FileManagerRequest::new(op, items);
        request.ondup = ondup;
        let req = ApiRequest::post(endpoints::FILE)
            .query("method", "filemanager")
            .queries(request.to_query())
            .form(Vec::new());
        fetch(self.gateway.as_ref(), req).await
    }

    /// Resolves an absolute remote file path to its entry.
    ///
    /// Lists the parent directory and picks the non-directory entry whose
    /// path matches exactly.
    pub async fn resolve_path(&self, remote: &str) -> Result<FileEntry, ClientError> {
        if !remote.starts_with('/') {
            return Err(ClientError::InvalidArgument(format!(
                "remote path must start with '/': {remote}"
            )));
        }
        let parent = match remote.rfind('/') {
            Some(0) | None => "/",
            Some(i) => &remote[..i],
        };
        self.list_dir(parent, &ListOptions::default())
            .await?
            .into_iter()
            .find(|e| e.path == remote && !e.is_dir())
            .ok_or_else(|| ClientError::NotFound(remote.to_string()))
    }
}
