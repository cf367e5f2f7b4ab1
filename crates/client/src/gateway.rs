//! The authenticated request seam.
//!
//! Services build an [`ApiRequest`] and hand it to a [`Gateway`]. The gateway
//! attaches credentials, resolves relative URLs and performs the call.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use cloudpan_protocol::Envelope;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ClientError;

/// Boxed future returned by [`Gateway`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Status codes the service uses for rejected or expired credentials.
const AUTH_ERRNOS: &[i64] = &[-6, 110, 111];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// One file field of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Body {
    #[default]
    Empty,
    Form(Vec<(String, String)>),
    Multipart(FilePart),
}

/// A request to the open API.
///
/// `url` is either absolute or a path joined onto the gateway's API base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Body,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Adds the parameter only when set.
    pub fn query_opt<T: ToString>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub fn queries(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Body::Form(fields);
        self
    }

    pub fn part(mut self, part: FilePart) -> Self {
        self.body = Body::Multipart(part);
        self
    }

    /// Value of a query parameter, if present.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Authenticated access to the open API.
///
/// Implementations supply a valid credential on every call. Refreshing it is
/// their business and invisible to callers.
pub trait Gateway: Send + Sync {
    /// Performs the request and returns the parsed body without inspecting it.
    fn request(&self, req: ApiRequest) -> BoxFuture<'_, Result<Value, ClientError>>;

    /// Streams the body of `url` into `dest`. Returns the number of bytes written.
    fn download(&self, url: String, dest: PathBuf) -> BoxFuture<'_, Result<u64, ClientError>>;

    /// Performs the request and fails when the body reports a non-zero status.
    fn request_json(&self, req: ApiRequest) -> BoxFuture<'_, Result<Value, ClientError>> {
        Box::pin(async move {
            let value = self.request(req).await?;
            check_envelope(&value)?;
            Ok(value)
        })
    }
}

/// Maps a non-zero status in `value` to an error.
pub fn check_envelope(value: &Value) -> Result<(), ClientError> {
    match Envelope::from_value(value).check() {
        Ok(()) => Ok(()),
        Err(status) if AUTH_ERRNOS.contains(&status.code) => {
            Err(ClientError::Auth(status.to_string()))
        }
        Err(status) => Err(status.into()),
    }
}

/// Performs a checked request and deserializes the body into `T`.
pub async fn fetch<T: DeserializeOwned>(
    gateway: &dyn Gateway,
    req: ApiRequest,
) -> Result<T, ClientError> {
    let value = gateway.request_json(req).await?;
    Ok(serde_json::from_value(value)?)
}
