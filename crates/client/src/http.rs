//! `reqwest` implementation of [`Gateway`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cloudpan_protocol::endpoints;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::ClientError;
use crate::gateway::{ApiRequest, Body, BoxFuture, Gateway, HttpMethod};
use crate::token::TokenSource;

/// Download links reject requests without this agent.
const AGENT: &str = "pan.baidu.com";
const TIMEOUT: Duration = Duration::from_secs(30);

/// Hosts the gateway talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Base for relative request URLs.
    pub api_base: String,
    /// OAuth token endpoint.
    pub token_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base: endpoints::API_BASE.into(),
            token_url: endpoints::TOKEN_URL.into(),
        }
    }
}

/// Builds the HTTP client shared by the gateway and token refresh.
pub fn build_http_client() -> Result<reqwest::Client, ClientError> {
    http_client_with_timeout(TIMEOUT)
}

/// `timeout` bounds connecting and each read, not the whole request.
fn http_client_with_timeout(timeout: Duration) -> Result<reqwest::Client, ClientError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(AGENT));

    Ok(reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(timeout)
        .read_timeout(timeout)
        .build()?)
}

/// Gateway over HTTPS. Appends `access_token` to every request.
pub struct HttpGateway {
    http: reqwest::Client,
    endpoints: Endpoints,
    token: Arc<dyn TokenSource>,
}

impl HttpGateway {
    pub fn new(token: Arc<dyn TokenSource>) -> Result<Self, ClientError> {
        Ok(Self::with_endpoints(
            build_http_client()?,
            Endpoints::default(),
            token,
        ))
    }

    pub fn with_endpoints(
        http: reqwest::Client,
        endpoints: Endpoints,
        token: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            http,
            endpoints,
            token,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!(
                "{}/{}",
                self.endpoints.api_base.trim_end_matches('/'),
                url.trim_start_matches('/')
            )
        }
    }

    async fn send(&self, req: ApiRequest) -> Result<reqwest::Response, ClientError> {
        let token = self.token.access_token().await?;
        let url = self.resolve(&req.url);
        debug!(method = ?req.method, url = %url, "request");

        let builder = match req.method {
            HttpMethod::Get => self.http.get(&url),
            HttpMethod::Post => self.http.post(&url),
        };
        let builder = builder
            .query(&req.query)
            .query(&[("access_token", token.as_str())]);
        let builder = match req.body {
            Body::Empty => builder,
            Body::Form(fields) => builder.form(&fields),
            Body::Multipart(part) => {
                let file = reqwest::multipart::Part::bytes(part.data).file_name(part.file_name);
                builder.multipart(reqwest::multipart::Form::new().part(part.field, file))
            }
        };

        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn request_inner(&self, req: ApiRequest) -> Result<Value, ClientError> {
        let bytes = self.send(req).await?.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn download_inner(&self, url: String, dest: PathBuf) -> Result<u64, ClientError> {
        let resp = self.send(ApiRequest::get(url)).await?;
        let mut file = tokio::fs::File::create(&dest).await?;
        let mut stream = resp.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}

impl Gateway for HttpGateway {
    fn request(&self, req: ApiRequest) -> BoxFuture<'_, Result<Value, ClientError>> {
        Box::pin(self.request_inner(req))
    }

    fn download(&self, url: String, dest: PathBuf) -> BoxFuture<'_, Result<u64, ClientError>> {
        Box::pin(self.download_inner(url, dest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::FilePart;
    use crate::token::StaticToken;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Starts a mock HTTP server that answers once and reports the raw request.
    async fn mock_server(
        status: u16,
        body: &str,
    ) -> (String, oneshot::Receiver<String>, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}");
        let body = body.to_string();
        let (tx, rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let request = read_request(&mut stream).await;
                let _ = tx.send(request);

                let resp = format!(
                    "HTTP/1.1 {status} Status\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (url, rx, handle)
    }

    /// Reads headers plus a `Content-Length` body.
    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = vec![0u8; 8192];
        loop {
            let n = stream.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&data);
            if let Some(end) = text.find("\r\n\r\n") {
                let len = text[..end]
                    .lines()
                    .find_map(|l| {
                        let l = l.to_ascii_lowercase();
                        l.strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                if data.len() >= end + 4 + len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&data).into_owned()
    }

    fn gateway(base: &str) -> HttpGateway {
        gateway_with_client(base, build_http_client().unwrap())
    }

    fn gateway_with_client(base: &str, http: reqwest::Client) -> HttpGateway {
        HttpGateway::with_endpoints(
            http,
            Endpoints {
                api_base: base.to_string(),
                token_url: format!("{base}/oauth/2.0/token"),
            },
            Arc::new(StaticToken::new("tok123")),
        )
    }

    #[tokio::test]
    async fn appends_access_token_and_joins_base() {
        let (url, rx, handle) = mock_server(200, r#"{"errno":0,"list":[]}"#).await;
        let gw = gateway(&url);

        let value = gw
            .request_json(ApiRequest::get("/rest/2.0/xpan/file").query("method", "list"))
            .await
            .unwrap();
        assert!(value["list"].is_array());

        let raw = rx.await.unwrap();
        let first = raw.lines().next().unwrap();
        assert!(first.starts_with("GET /rest/2.0/xpan/file?method=list&access_token=tok123"));
        assert!(raw.to_ascii_lowercase().contains("user-agent: pan.baidu.com"));

        handle.abort();
    }

    #[tokio::test]
    async fn posts_form_body() {
        let (url, rx, handle) = mock_server(200, r#"{"errno":0,"uploadid":"u1"}"#).await;
        let gw = gateway(&url);

        gw.request_json(
            ApiRequest::post("/rest/2.0/xpan/file")
                .query("method", "precreate")
                .form(vec![("path".into(), "/apps/a b".into()), ("isdir".into(), "0".into())]),
        )
        .await
        .unwrap();

        let raw = rx.await.unwrap();
        assert!(raw.starts_with("POST "));
        assert!(raw.contains("path=%2Fapps%2Fa+b&isdir=0"));

        handle.abort();
    }

    #[tokio::test]
    async fn posts_multipart_part() {
        let (url, rx, handle) = mock_server(200, r#"{"md5":"abc"}"#).await;
        let gw = gateway(&url);

        let value = gw
            .request(ApiRequest::post(format!("{url}/rest/2.0/pcs/superfile2")).part(FilePart {
                field: "file".into(),
                file_name: "part".into(),
                data: b"block-bytes".to_vec(),
            }))
            .await
            .unwrap();
        assert_eq!(value["md5"], "abc");

        let raw = rx.await.unwrap();
        assert!(raw.contains("name=\"file\"; filename=\"part\""));
        assert!(raw.contains("block-bytes"));

        handle.abort();
    }

    #[tokio::test]
    async fn nonzero_errno_is_remote_error() {
        let (url, _rx, handle) = mock_server(200, r#"{"errno":-9,"errmsg":"not found"}"#).await;
        let err = gateway(&url)
            .request_json(ApiRequest::get("/rest/2.0/xpan/file"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Remote { code: -9, .. }));
        handle.abort();
    }

    #[tokio::test]
    async fn raw_request_skips_envelope_check() {
        let (url, _rx, handle) = mock_server(200, r#"{"error_code":31299}"#).await;
        let value = gateway(&url)
            .request(ApiRequest::get("/x"))
            .await
            .unwrap();
        assert_eq!(value["error_code"], 31299);
        handle.abort();
    }

    #[tokio::test]
    async fn http_error_status() {
        let (url, _rx, handle) = mock_server(502, "bad gateway").await;
        let err = gateway(&url)
            .request_json(ApiRequest::get("/x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 502, .. }));
        handle.abort();
    }

    #[tokio::test]
    async fn download_streams_to_file() {
        let (url, rx, handle) = mock_server(200, "payload-bytes").await;
        let dir = tempfile::TempDir::new().unwrap();
        let dest = dir.path().join("out.bin");

        let n = gateway(&url)
            .download(format!("{url}/file/abc?fid=1"), dest.clone())
            .await
            .unwrap();
        assert_eq!(n, 13);
        assert_eq!(std::fs::read(&dest).unwrap(), b"payload-bytes");
        assert!(rx.await.unwrap().contains("fid=1&access_token=tok123"));

        handle.abort();
    }

    /// Sends a body one byte at a time, `gap` apart.
    async fn slow_server(body: &'static [u8], gap: Duration) -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());

        let handle = tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                read_request(&mut stream).await;
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes()).await;
                for byte in body {
                    tokio::time::sleep(gap).await;
                    let _ = stream.write_all(&[*byte]).await;
                    let _ = stream.flush().await;
                }
                let _ = stream.shutdown().await;
            }
        });

        (url, handle)
    }

    #[tokio::test]
    async fn slow_body_outlives_the_timeout() {
        // Whole transfer takes ~2.4 s against a 1 s timeout; no single gap exceeds it.
        let (url, handle) = slow_server(b"abcdef", Duration::from_millis(400)).await;
        let dir = tempfile::TempDir::new().unwrap();
        let dest = dir.path().join("slow.bin");
        let gw = gateway_with_client(&url, http_client_with_timeout(Duration::from_secs(1)).unwrap());

        let n = gw.download(format!("{url}/file/slow"), dest.clone()).await.unwrap();
        assert_eq!(n, 6);
        assert_eq!(std::fs::read(&dest).unwrap(), b"abcdef");

        handle.abort();
    }

    #[tokio::test]
    async fn stalled_body_times_out() {
        let (url, handle) = slow_server(b"ab", Duration::from_secs(3)).await;
        let dir = tempfile::TempDir::new().unwrap();
        let gw = gateway_with_client(&url, http_client_with_timeout(Duration::from_millis(500)).unwrap());

        let err = gw
            .download(format!("{url}/file/stall"), dir.path().join("stall.bin"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Http(_)));

        handle.abort();
    }
}
