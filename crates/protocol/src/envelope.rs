use serde::{Deserialize, Serialize};

/// Non-zero status reported by the service in a response body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("errno {code}: {message}")]
pub struct ApiStatus {
    pub code: i64,
    pub message: String,
}

/// Status header present on JSON responses.
///
/// The file APIs report `errno`/`errmsg`, the PCS and OAuth endpoints use
/// `error_code`/`error_msg`. Both spellings are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errno: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errmsg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<serde_json::Value>,
}

impl Envelope {
    /// Extracts the header from a parsed body. Non-object bodies yield an
    /// empty header.
    pub fn from_value(value: &serde_json::Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    /// Returns the reported status code (0 when absent).
    pub fn code(&self) -> i64 {
        self.errno.or(self.error_code).unwrap_or(0)
    }

    /// Returns `Err` when the service reported a non-zero status.
    pub fn check(&self) -> Result<(), ApiStatus> {
        let code = self.code();
        if code == 0 {
            return Ok(());
        }
        let message = self
            .errmsg
            .clone()
            .or_else(|| self.error_msg.clone())
            .unwrap_or_else(|| "unknown error".into());
        Err(ApiStatus { code, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn zero_errno_passes() {
        let env = Envelope::from_value(&json!({"errno": 0, "request_id": 123, "list": []}));
        assert!(env.check().is_ok());
    }

    #[test]
    fn missing_status_passes() {
        let env = Envelope::from_value(&json!({"md5": "abc"}));
        assert_eq!(env.code(), 0);
        assert!(env.check().is_ok());
    }

    #[test]
    fn non_zero_errno_fails_with_message() {
        let env = Envelope::from_value(&json!({"errno": -7, "errmsg": "path invalid"}));
        let err = env.check().unwrap_err();
        assert_eq!(err.code, -7);
        assert_eq!(err.message, "path invalid");
    }

    #[test]
    fn error_code_spelling_is_recognized() {
        let env = Envelope::from_value(&json!({"error_code": 31064, "error_msg": "file is not authorized"}));
        let err = env.check().unwrap_err();
        assert_eq!(err.code, 31064);
        assert_eq!(err.message, "file is not authorized");
    }

    #[test]
    fn missing_message_gets_placeholder() {
        let env = Envelope::from_value(&json!({"errno": 2}));
        assert_eq!(env.check().unwrap_err().message, "unknown error");
    }

    #[test]
    fn non_object_body_is_empty_header() {
        let env = Envelope::from_value(&json!([1, 2, 3]));
        assert_eq!(env, Envelope::default());
    }
}
