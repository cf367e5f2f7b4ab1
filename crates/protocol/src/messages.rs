use serde::{Deserialize, Serialize};

use crate::types::{ConflictPolicy, FileOperation, OnDuplicate, UploadMode};

/// Form body as ordered key/value pairs.
pub type Form = Vec<(String, String)>;

/// Serializes a block hash list as a compact JSON array, preserving order.
pub fn block_list_json(block_list: &[String]) -> String {
    serde_json::to_string(block_list).unwrap_or_else(|_| "[]".into())
}

fn flag(v: bool) -> String {
    if v { "1".into() } else { "0".into() }
}

// ---------------------------------------------------------------------------
// Upload: announce
// ---------------------------------------------------------------------------

/// Announces an upload (`method=precreate`).
#[derive(Debug, Clone, PartialEq)]
pub struct PrecreateRequest {
    pub path: String,
    pub size: u64,
    pub is_dir: bool,
    pub block_list: Vec<String>,
    pub policy: ConflictPolicy,
    pub content_md5: Option<String>,
    pub slice_md5: Option<String>,
    pub local_ctime: Option<i64>,
    pub local_mtime: Option<i64>,
}

impl PrecreateRequest {
    /// Builds the form body. Unset optional fields are omitted.
    pub fn to_form(&self) -> Form {
        let mut form: Form = vec![
            ("path".into(), self.path.clone()),
            ("size".into(), self.size.to_string()),
            ("isdir".into(), flag(self.is_dir)),
            ("block_list".into(), block_list_json(&self.block_list)),
            ("autoinit".into(), "1".into()),
            ("rtype".into(), self.policy.rtype().to_string()),
        ];
        if let Some(md5) = &self.content_md5 {
            form.push(("content-md5".into(), md5.clone()));
        }
        if let Some(md5) = &self.slice_md5 {
            form.push(("slice-md5".into(), md5.clone()));
        }
        if let Some(t) = self.local_ctime {
            form.push(("local_ctime".into(), t.to_string()));
        }
        if let Some(t) = self.local_mtime {
            form.push(("local_mtime".into(), t.to_string()));
        }
        form
    }
}

/// Response to `precreate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecreateResponse {
    #[serde(default)]
    pub uploadid: String,
    #[serde(default)]
    pub return_type: i64,
    /// Indices of blocks the service still needs.
    #[serde(default)]
    pub block_list: Vec<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

// ---------------------------------------------------------------------------
// Upload: locate
// ---------------------------------------------------------------------------

/// A candidate transfer host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadServer {
    pub server: String,
}

/// Response to `locateupload`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocateUploadResponse {
    #[serde(default)]
    pub servers: Vec<UploadServer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bak_servers: Vec<UploadServer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl LocateUploadResponse {
    /// Returns the first candidate host, if any.
    pub fn first_server(&self) -> Option<&str> {
        self.servers
            .iter()
            .map(|s| s.server.as_str())
            .find(|s| !s.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Upload: block transfer
// ---------------------------------------------------------------------------

/// Response to a block upload. The service echoes the block's MD5.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadPartResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploadid: Option<String>,
}

// ---------------------------------------------------------------------------
// Upload: finalize
// ---------------------------------------------------------------------------

/// Merges uploaded blocks into a file (`method=create`).
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRequest {
    pub path: String,
    pub size: u64,
    pub is_dir: bool,
    pub block_list: Vec<String>,
    pub upload_id: String,
    pub policy: ConflictPolicy,
    pub local_ctime: Option<i64>,
    pub local_mtime: Option<i64>,
    pub is_revision: Option<bool>,
    pub mode: Option<UploadMode>,
}

impl CreateRequest {
    /// Builds the form body. Unset optional fields are omitted.
    pub fn to_form(&self) -> Form {
        let mut form: Form = vec![
            ("path".into(), self.path.clone()),
            ("size".into(), self.size.to_string()),
            ("isdir".into(), flag(self.is_dir)),
            ("block_list".into(), block_list_json(&self.block_list)),
            ("uploadid".into(), self.upload_id.clone()),
            ("rtype".into(), self.policy.rtype().to_string()),
        ];
        if let Some(t) = self.local_ctime {
            form.push(("local_ctime".into(), t.to_string()));
        }
        if let Some(t) = self.local_mtime {
            form.push(("local_mtime".into(), t.to_string()));
        }
        if let Some(rev) = self.is_revision {
            form.push(("is_revision".into(), flag(rev)));
        }
        if let Some(mode) = self.mode {
            form.push(("mode".into(), mode.code().to_string()));
        }
        form
    }
}

/// Descriptor of a created remote object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatedFile {
    #[serde(default)]
    pub fs_id: u64,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub md5: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server_filename: String,
    #[serde(default)]
    pub category: i64,
    #[serde(default)]
    pub isdir: i32,
    #[serde(default)]
    pub ctime: i64,
    #[serde(default)]
    pub mtime: i64,
}

// ---------------------------------------------------------------------------
// Listing, search, metadata
// ---------------------------------------------------------------------------

/// A file or directory entry returned by listing and search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub fs_id: u64,
    pub path: String,
    #[serde(default)]
    pub server_filename: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub isdir: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub md5: String,
    #[serde(default)]
    pub category: i64,
    #[serde(default)]
    pub server_ctime: i64,
    #[serde(default)]
    pub server_mtime: i64,
}

impl FileEntry {
    pub fn is_dir(&self) -> bool {
        self.isdir == 1
    }
}

/// One page of a listing (`list`, `listall`, `search`).
///
/// `has_more`/`cursor` are only present on cursor-paginated endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListPage {
    #[serde(default)]
    pub list: Vec<FileEntry>,
    #[serde(default)]
    pub has_more: i32,
    #[serde(default)]
    pub cursor: u64,
}

impl ListPage {
    pub fn has_more(&self) -> bool {
        self.has_more == 1
    }
}

/// Metadata for one file, optionally with a download link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    pub fs_id: u64,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub isdir: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub md5: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dlink: Option<String>,
}

/// Response to `filemetas`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMetasResponse {
    #[serde(default)]
    pub list: Vec<FileMeta>,
}

// ---------------------------------------------------------------------------
// File manager
// ---------------------------------------------------------------------------

/// One item of a file manager request.
///
/// Delete items are bare paths; the others are objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileManagerItem {
    Relocate {
        path: String,
        dest: String,
        newname: String,
    },
    Rename {
        path: String,
        newname: String,
    },
    Delete(String),
}

/// A file manager request (`method=filemanager`).
#[derive(Debug, Clone, PartialEq)]
pub struct FileManagerRequest {
    pub op: FileOperation,
    pub items: Vec<FileManagerItem>,
    pub ondup: OnDuplicate,
    /// 0 synchronous, 1 adaptive, 2 asynchronous.
    pub asynchronous: u8,
}

impl FileManagerRequest {
    pub fn new(op: FileOperation, items: Vec<FileManagerItem>) -> Self {
        Self {
            op,
            items,
            ondup: OnDuplicate::default(),
            asynchronous: 1,
        }
    }

    /// Query parameters (the endpoint takes everything on the URL).
    pub fn to_query(&self) -> Form {
        vec![
            ("opera".into(), self.op.as_str().into()),
            ("async".into(), self.asynchronous.to_string()),
            (
                "filelist".into(),
                serde_json::to_string(&self.items).unwrap_or_else(|_| "[]".into()),
            ),
            ("ondup".into(), self.ondup.as_str().into()),
        ]
    }
}

/// Per-item outcome of a file manager request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileOperationInfo {
    #[serde(default)]
    pub errno: i64,
    #[serde(default)]
    pub path: String,
}

/// Response to `filemanager`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileManagerResponse {
    #[serde(default)]
    pub info: Vec<FileOperationInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taskid: Option<u64>,
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// Response to `uinfo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub baidu_name: String,
    #[serde(default)]
    pub netdisk_name: String,
    #[serde(default)]
    pub uk: u64,
    /// 0 regular, 1 member, 2 super member.
    #[serde(default)]
    pub vip_type: i64,
}

/// Response to the quota endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quota {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub used: u64,
    #[serde(default)]
    pub free: u64,
    #[serde(default)]
    pub expire: bool,
}

/// Token grant returned by the OAuth token endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}
