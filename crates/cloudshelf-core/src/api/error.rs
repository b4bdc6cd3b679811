use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use super::transport::TransportError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not logged in")]
    Unauthenticated,

    #[error("Session expired or invalid - please log in again")]
    SessionInvalid,

    #[error("{message}")]
    RequestFailed { status: u16, message: String },

    #[error("Service unavailable: {0}")]
    TransportUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Message the backend put in an error body, if any.
    ///
    /// Recognizes `{"detail": "..."}`, validation lists
    /// `{"detail": [{"msg": "..."}]}`, `{"Error": "..."}` and `{"message": "..."}`.
    pub fn backend_message(body: &[u8]) -> Option<String> {
        let json: Value = serde_json::from_slice(body).ok()?;
        let message = match json.get("detail") {
            Some(Value::String(detail)) => Some(detail.clone()),
            Some(Value::Array(items)) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .collect();
                (!msgs.is_empty()).then(|| msgs.join("; "))
            }
            _ => None,
        };
        message
            .or_else(|| json.get("Error").and_then(Value::as_str).map(str::to_string))
            .or_else(|| json.get("message").and_then(Value::as_str).map(str::to_string))
            .filter(|m| !m.trim().is_empty())
            .map(|m| Self::truncate_body(&m))
    }

    /// Classify a non-2xx response that is not a credential rejection.
    pub fn from_status(status: StatusCode, body: &[u8]) -> Self {
        let message = Self::backend_message(body)
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
        ApiError::RequestFailed {
            status: status.as_u16(),
            message,
        }
    }

    /// Body that was not the expected JSON shape.
    pub fn invalid_body(context: &str, body: &[u8], err: impl std::fmt::Display) -> Self {
        let text = String::from_utf8_lossy(body);
        ApiError::InvalidResponse(format!(
            "{}: {} (body: {})",
            context,
            err,
            Self::truncate_body(&text)
        ))
    }

    /// True when the user has to log in before retrying.
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::Unauthenticated | ApiError::SessionInvalid)
    }

    /// Text to show the user. Transport and decoding details are left to
    /// the `Display` form, which is what gets logged.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthenticated => "Not logged in. Please log in first.".to_string(),
            ApiError::SessionInvalid => "Your session has expired. Please log in again.".to_string(),
            ApiError::RequestFailed { message, .. } => message.clone(),
            ApiError::TransportUnavailable(_) => {
                "Unable to reach the storage service. Check your connection and try again.".to_string()
            }
            ApiError::InvalidResponse(_) => {
                "The storage service sent a response that could not be read.".to_string()
            }
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RequestFailed { status, .. } => Some(*status),
            ApiError::SessionInvalid => Some(401),
            _ => None,
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        ApiError::TransportUnavailable(err.0)
    }
}
