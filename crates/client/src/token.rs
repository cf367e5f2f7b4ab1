use chrono::{DateTime, TimeDelta, Utc};
use cloudpan_protocol::messages::TokenGrant;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ClientError;
use crate::gateway::{BoxFuture, check_envelope};

/// Tokens expiring within this window are refreshed before use.
const REFRESH_THRESHOLD_SECS: i64 = 60;

/// Supplies the access token attached to every request.
pub trait TokenSource: Send + Sync {
    fn access_token(&self) -> BoxFuture<'_, Result<String, ClientError>>;
}

/// A fixed token, never refreshed.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenSource for StaticToken {
    fn access_token(&self) -> BoxFuture<'_, Result<String, ClientError>> {
        Box::pin(async move {
            if self.0.is_empty() {
                return Err(ClientError::Auth("no access token configured".into()));
            }
            Ok(self.0.clone())
        })
    }
}

/// OAuth credentials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

impl Credentials {
    /// True when the token is missing or expires within the refresh threshold.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.is_empty() {
            return true;
        }
        match self.expires_at {
            Some(at) => at - now <= TimeDelta::seconds(REFRESH_THRESHOLD_SECS),
            None => false,
        }
    }

    pub fn can_refresh(&self) -> bool {
        !self.refresh_token.is_empty() && !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    fn apply(&mut self, grant: TokenGrant, now: DateTime<Utc>) {
        self.access_token = grant.access_token;
        self.refresh_token = grant.refresh_token;
        self.expires_at = Some(now + TimeDelta::seconds(grant.expires_in));
    }
}

/// Token source that renews through the `refresh_token` grant.
pub struct RefreshingToken {
    http: reqwest::Client,
    token_url: String,
    state: tokio::sync::Mutex<Credentials>,
}

impl RefreshingToken {
    pub fn new(http: reqwest::Client, token_url: impl Into<String>, creds: Credentials) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            state: tokio::sync::Mutex::new(creds),
        }
    }

    /// Current credentials, including any refreshed token.
    pub async fn credentials(&self) -> Credentials {
        self.state.lock().await.clone()
    }

    async fn refresh(&self, creds: &mut Credentials) -> Result<(), ClientError> {
        if !creds.can_refresh() {
            return Err(ClientError::Auth(
                "token expired and no refresh credentials configured".into(),
            ));
        }
        debug!(url = %self.token_url, "refreshing access token");

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", creds.refresh_token.as_str()),
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
        ];
        let resp = self.http.get(&self.token_url).query(&params).send().await?;
        let status = resp.status();
        let body: serde_json::Value = resp.json().await?;
        if !status.is_success() || body.get("error").is_some() {
            let msg = body
                .get("error_description")
                .or_else(|| body.get("error"))
                .and_then(|v| v.as_str())
                .unwrap_or("token refresh rejected");
            return Err(ClientError::Auth(msg.to_string()));
        }
        check_envelope(&body)?;

        let grant: TokenGrant = serde_json::from_value(body)?;
        creds.apply(grant, Utc::now());
        info!(expires_at = ?creds.expires_at, "access token refreshed");
        Ok(())
    }
}

impl TokenSource for RefreshingToken {
    fn access_token(&self) -> BoxFuture<'_, Result<String, ClientError>> {
        Box::pin(async move {
            // Held across the refresh so concurrent callers wait for one renewal.
            let mut creds = self.state.lock().await;
            if creds.needs_refresh(Utc::now()) {
                self.refresh(&mut creds).await?;
            }
            Ok(creds.access_token.clone())
        })
    }
}
