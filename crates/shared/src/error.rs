use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    NotFoundOrForbidden,
    Validation,
    Internal,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorCode::Unauthorized,
            403 | 404 => ErrorCode::NotFoundOrForbidden,
            400..=499 => ErrorCode::Validation,
            _ => ErrorCode::Internal,
        }
    }
}

/// Error envelope returned by the backend on any non-success response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
        }
    }

    /// Parses a raw response body, tolerating non-JSON payloads.
    pub fn message_from(raw: &str) -> Option<String> {
        serde_json::from_str::<ApiErrorBody>(raw)
            .ok()
            .and_then(|body| body.error)
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty())
    }
}
