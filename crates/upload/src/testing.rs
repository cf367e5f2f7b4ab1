//! In-memory stand-in for the remote service.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use cloudpan_client::{ApiRequest, Body, BoxFuture, ClientError, Gateway};
use cloudpan_transfer::{BlockSize, UploadPlan, hash_bytes, plan_file};
use serde_json::{Value, json};

pub(crate) const REMOTE_ROOT: &str = "/apps/test";

/// Writes `size` patterned bytes to `dir/name` and plans it with `block` byte blocks.
pub(crate) fn plan_for(dir: &Path, name: &str, size: usize, block: u64) -> UploadPlan {
    let path = write_file(dir, name, size);
    plan_file(
        &path,
        &format!("{REMOTE_ROOT}/{name}"),
        BlockSize::from_bytes(block).unwrap(),
    )
    .unwrap()
}

pub(crate) fn write_file(dir: &Path, name: &str, size: usize) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, data).unwrap();
    path
}

fn form_map(req: &ApiRequest) -> HashMap<String, String> {
    match &req.body {
        Body::Form(fields) => fields.iter().cloned().collect(),
        _ => HashMap::new(),
    }
}

/// Answers precreate, locate, part upload and create like the service would.
///
/// Part uploads echo the MD5 of the received bytes unless the file's remote
/// path is marked corrupt (wrong hash), uppercase (right hash, upper-case
/// hex) or hashless (no `md5` field).
pub(crate) struct MockGateway {
    requests: Mutex<Vec<ApiRequest>>,
    corrupt: HashSet<String>,
    uppercase: HashSet<String>,
    hashless: HashSet<String>,
    precreate_errno: Option<i64>,
    no_servers: bool,
    part_delay: Duration,
}

impl MockGateway {
    pub(crate) fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            corrupt: HashSet::new(),
            uppercase: HashSet::new(),
            hashless: HashSet::new(),
            precreate_errno: None,
            no_servers: false,
            part_delay: Duration::ZERO,
        }
    }

    pub(crate) fn corrupting(mut self, remote_path: &str) -> Self {
        self.corrupt.insert(remote_path.to_string());
        self
    }

    pub(crate) fn uppercase(mut self, remote_path: &str) -> Self {
        self.uppercase.insert(remote_path.to_string());
        self
    }

    pub(crate) fn hashless(mut self, remote_path: &str) -> Self {
        self.hashless.insert(remote_path.to_string());
        self
    }

    pub(crate) fn with_precreate_errno(mut self, errno: i64) -> Self {
        self.precreate_errno = Some(errno);
        self
    }

    pub(crate) fn without_servers(mut self) -> Self {
        self.no_servers = true;
        self
    }

    pub(crate) fn with_part_delay(mut self, delay: Duration) -> Self {
        self.part_delay = delay;
        self
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// `method` query values in call order.
    pub(crate) fn methods(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|r| r.query_value("method").map(str::to_string))
            .collect()
    }

    fn forms_for(&self, method: &str) -> Vec<HashMap<String, String>> {
        self.requests()
            .iter()
            .filter(|r| r.query_value("method") == Some(method))
            .map(form_map)
            .collect()
    }

    pub(crate) fn precreate_forms(&self) -> Vec<HashMap<String, String>> {
        self.forms_for("precreate")
    }

    pub(crate) fn create_forms(&self) -> Vec<HashMap<String, String>> {
        self.forms_for("create")
    }

    /// `(path, partseq)` of every part upload, in call order.
    pub(crate) fn parts(&self) -> Vec<(String, usize)> {
        self.requests()
            .iter()
            .filter(|r| r.query_value("method") == Some("upload"))
            .map(|r| {
                let path = r.query_value("path").unwrap_or_default().to_string();
                let seq = r
                    .query_value("partseq")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(usize::MAX);
                (path, seq)
            })
            .collect()
    }

    fn respond(&self, req: &ApiRequest) -> Result<Value, ClientError> {
        match req.query_value("method") {
            Some("precreate") => {
                if let Some(errno) = self.precreate_errno {
                    return Ok(json!({"errno": errno, "errmsg": "rejected"}));
                }
                let form = form_map(req);
                let path = form.get("path").cloned().unwrap_or_default();
                Ok(json!({"errno": 0, "uploadid": format!("up-{path}"), "return_type": 1, "block_list": []}))
            }
            Some("locateupload") => {
                let servers = if self.no_servers {
                    json!([])
                } else {
                    json!([{"server": "https://c.pcs.test"}])
                };
                Ok(json!({"error_code": 0, "servers": servers}))
            }
            Some("upload") => {
                let path = req.query_value("path").unwrap_or_default();
                let data = match &req.body {
                    Body::Multipart(part) => part.data.as_slice(),
                    _ => return Err(ClientError::UnexpectedResponse("no part".into())),
                };
                if self.hashless.contains(path) {
                    return Ok(json!({"uploadid": req.query_value("uploadid")}));
                }
                let md5 = if self.corrupt.contains(path) {
                    "0".repeat(32)
                } else if self.uppercase.contains(path) {
                    hash_bytes(data).to_ascii_uppercase()
                } else {
                    hash_bytes(data)
                };
                Ok(json!({"md5": md5, "uploadid": req.query_value("uploadid")}))
            }
            Some("create") => {
                let form = form_map(req);
                let size: u64 = form.get("size").and_then(|s| s.parse().ok()).unwrap_or(0);
                let isdir: i32 = form.get("isdir").and_then(|s| s.parse().ok()).unwrap_or(0);
                Ok(json!({
                    "errno": 0,
                    "fs_id": 1000 + size,
                    "path": form.get("path"),
                    "size": size,
                    "isdir": isdir,
                    "category": 6,
                    "ctime": 1_700_000_000,
                    "mtime": 1_700_000_000
                }))
            }
            other => Err(ClientError::UnexpectedResponse(format!("unmocked method {other:?}"))),
        }
    }
}

impl Gateway for MockGateway {
    fn request(&self, req: ApiRequest) -> BoxFuture<'_, Result<Value, ClientError>> {
        let is_part = req.query_value("method") == Some("upload");
        let result = self.respond(&req);
        self.requests.lock().unwrap().push(req);
        let delay = if is_part { self.part_delay } else { Duration::ZERO };
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }

    fn download(&self, _url: String, _dest: PathBuf) -> BoxFuture<'_, Result<u64, ClientError>> {
        Box::pin(async { Err(ClientError::UnexpectedResponse("download not mocked".into())) })
    }
}
