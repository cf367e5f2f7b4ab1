use cloudpan_protocol::ApiStatus;

/// Errors from the gateway and the services built on it.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("remote error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<ApiStatus> for ClientError {
    fn from(s: ApiStatus) -> Self {
        Self::Remote {
            code: s.code,
            message: s.message,
        }
    }
}

impl From<cloudpan_transfer::TransferError> for ClientError {
    fn from(e: cloudpan_transfer::TransferError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}
