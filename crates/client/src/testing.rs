//! Scripted gateway for service tests.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::Value;

use crate::error::ClientError;
use crate::gateway::{ApiRequest, BoxFuture, Gateway};

/// Answers requests from a queue and records what was asked.
pub(crate) struct ScriptedGateway {
    script: Mutex<VecDeque<Result<Value, ClientError>>>,
    requests: Mutex<Vec<ApiRequest>>,
    downloads: Mutex<Vec<String>>,
    payload: Vec<u8>,
}

impl ScriptedGateway {
    pub(crate) fn new(script: Vec<Result<Value, ClientError>>) -> Self {
        Self::with_payload(script, Vec::new())
    }

    pub(crate) fn with_payload(script: Vec<Result<Value, ClientError>>, payload: Vec<u8>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            downloads: Mutex::new(Vec::new()),
            payload,
        }
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

impl Gateway for ScriptedGateway {
    fn request(&self, req: ApiRequest) -> BoxFuture<'_, Result<Value, ClientError>> {
        self.requests.lock().unwrap().push(req);
        let next = self.script.lock().unwrap().pop_front();
        Box::pin(async move {
            next.unwrap_or_else(|| Err(ClientError::UnexpectedResponse("script exhausted".into())))
        })
    }

    fn download(&self, url: String, dest: PathBuf) -> BoxFuture<'_, Result<u64, ClientError>> {
        self.downloads.lock().unwrap().push(url);
        Box::pin(async move {
            tokio::fs::write(&dest, &self.payload).await?;
            Ok(self.payload.len() as u64)
        })
    }
}
