// Errors surfaced by API calls.

use serde_json::Value;
use thiserror::Error;

/// `detail` value the server uses for accounts that still need e-mail
/// verification.
pub const ACCOUNT_INACTIVE: &str = "ACCOUNT_INACTIVE";

#[derive(Debug, Error, PartialEq)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Transport(String),

    /// Non-2xx response.
    #[error("server returned {status}{}", .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    Status { status: u16, detail: Option<String> },

    /// Login refused because the account is not yet verified.
    #[error("account is not activated; verify {}", .email.as_deref().unwrap_or("your e-mail"))]
    AccountInactive { email: Option<String> },

    /// A 2xx body that did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("failed to encode request: {0}")]
    Encode(String),
}

impl ApiError {
    /// Map a non-2xx response to an error.
    ///
    /// A 403 whose body carries `detail: "ACCOUNT_INACTIVE"` or
    /// `verify_required: true` becomes [`ApiError::AccountInactive`] with the
    /// e-mail from the body. Everything else becomes [`ApiError::Status`] with
    /// the server's `detail` message when one can be extracted.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let json: Option<Value> = serde_json::from_slice(body).ok();

        if status == 403 {
            if let Some(v) = &json {
                let inactive = v.get("detail").and_then(Value::as_str) == Some(ACCOUNT_INACTIVE)
                    || v.get("verify_required").and_then(Value::as_bool) == Some(true);
                if inactive {
                    return ApiError::AccountInactive {
                        email: v.get("email").and_then(Value::as_str).map(str::to_string),
                    };
                }
            }
        }

        let detail = match &json {
            Some(v) => extract_detail(v),
            None => {
                let text = String::from_utf8_lossy(body).trim().to_string();
                (!text.is_empty()).then_some(text)
            }
        };

        ApiError::Status { status, detail }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::AccountInactive { .. } => Some(403),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// FastAPI-style `detail`: a string, or a list of validation errors each
/// carrying a `msg`.
fn extract_detail(body: &Value) -> Option<String> {
    match body.get("detail")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(errors) => {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("msg").and_then(Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Errors from actions that also touch local storage.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("local storage error: {0}")]
    Storage(String),
}

impl AuthError {
    pub(crate) fn storage(err: anyhow::Error) -> Self {
        AuthError::Storage(format!("{err:#}"))
    }

    /// The underlying API error, if this came from the server.
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            AuthError::Api(e) => Some(e),
            AuthError::Storage(_) => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(v: Value) -> Vec<u8> {
        serde_json::to_vec(&v).unwrap()
    }

    #[test]
    fn account_inactive_detail_is_recognised() {
        let err = ApiError::from_response(
            403,
            &body(json!({"detail": "ACCOUNT_INACTIVE", "email": "a@b.c"})),
        );
        assert_eq!(
            err,
            ApiError::AccountInactive {
                email: Some("a@b.c".into())
            }
        );
    }

    #[test]
    fn verify_required_flag_is_recognised() {
        let err = ApiError::from_response(
            403,
            &body(json!({"verify_required": true, "email": "x@y.z"})),
        );
        assert_eq!(
            err,
            ApiError::AccountInactive {
                email: Some("x@y.z".into())
            }
        );
    }

    #[test]
    fn other_403_is_a_plain_status() {
        let err = ApiError::from_response(403, &body(json!({"detail": "Forbidden"})));
        assert_eq!(
            err,
            ApiError::Status {
                status: 403,
                detail: Some("Forbidden".into())
            }
        );
    }

    #[test]
    fn inactive_marker_on_other_status_is_ignored() {
        let err = ApiError::from_response(400, &body(json!({"detail": "ACCOUNT_INACTIVE"})));
        assert_eq!(err.status(), Some(400));
        assert!(!matches!(err, ApiError::AccountInactive { .. }));
    }

    #[test]
    fn validation_errors_are_joined() {
        let err = ApiError::from_response(
            422,
            &body(json!({"detail": [
                {"loc": ["body", "email"], "msg": "value is not a valid email address"},
                {"loc": ["body", "login"], "msg": "too short"}
            ]})),
        );
        assert_eq!(
            err,
            ApiError::Status {
                status: 422,
                detail: Some("value is not a valid email address; too short".into())
            }
        );
    }

    #[test]
    fn plain_text_body_becomes_detail() {
        let err = ApiError::from_response(502, b"Bad Gateway\n");
        assert_eq!(
            err,
            ApiError::Status {
                status: 502,
                detail: Some("Bad Gateway".into())
            }
        );
        assert_eq!(err.to_string(), "server returned 502: Bad Gateway");
    }

    #[test]
    fn empty_body_has_no_detail() {
        let err = ApiError::from_response(401, b"");
        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "server returned 401");
    }
}
