use shared::error::{ApiErrorBody, ErrorCode};
use thiserror::Error;

pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong!";
pub const UPLOAD_BUSY_MESSAGE: &str = "An upload is already in progress. Please wait.";
pub const TRANSFER_FAILED_MESSAGE: &str = "File not uploaded";

pub type DriveResult<T> = std::result::Result<T, DriveError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DriveError {
    #[error("session is not authenticated")]
    Unauthorized,
    #[error("{0}")]
    NotFoundOrForbidden(String),
    #[error("server rejected request ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("transfer failed: {0}")]
    Transfer(String),
    #[error("an upload is already in progress")]
    UploadBusy,
    #[error("upload cancelled")]
    UserCancelled,
    #[error("invalid response from server: {0}")]
    InvalidResponse(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DriveError {
    /// Maps a non-success HTTP status and its raw body onto the error taxonomy.
    pub fn from_status(status: u16, raw_body: &str) -> Self {
        let message = ApiErrorBody::message_from(raw_body);
        match ErrorCode::from_status(status) {
            ErrorCode::Unauthorized => DriveError::Unauthorized,
            ErrorCode::NotFoundOrForbidden => DriveError::NotFoundOrForbidden(
                message.unwrap_or_else(|| "Directory not found or you do not have access to it!".into()),
            ),
            ErrorCode::Validation | ErrorCode::Internal => DriveError::Server {
                status,
                message: message.unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.into()),
            },
        }
    }

    /// Text surfaced to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            DriveError::Unauthorized => "Please sign in again.".into(),
            DriveError::NotFoundOrForbidden(message) => message.clone(),
            DriveError::Server { message, .. } => message.clone(),
            DriveError::Transport(_) | DriveError::InvalidResponse(_) => {
                GENERIC_FAILURE_MESSAGE.into()
            }
            DriveError::Transfer(_) => TRANSFER_FAILED_MESSAGE.into(),
            DriveError::UploadBusy => UPLOAD_BUSY_MESSAGE.into(),
            DriveError::UserCancelled => String::new(),
            DriveError::Config(message) => message.clone(),
        }
    }

    pub fn is_silent(&self) -> bool {
        matches!(self, DriveError::UserCancelled)
    }

    pub fn requires_reauth(&self) -> bool {
        matches!(self, DriveError::Unauthorized)
    }
}

impl From<reqwest::Error> for DriveError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            DriveError::InvalidResponse(value.to_string())
        } else {
            DriveError::Transport(value.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_statuses_with_server_message_or_fallback() {
        assert_eq!(DriveError::from_status(401, ""), DriveError::Unauthorized);
        assert_eq!(
            DriveError::from_status(409, r#"{"error":"Name already taken"}"#).user_message(),
            "Name already taken"
        );
        assert_eq!(
            DriveError::from_status(500, "oops").user_message(),
            GENERIC_FAILURE_MESSAGE
        );
        assert!(matches!(
            DriveError::from_status(404, ""),
            DriveError::NotFoundOrForbidden(_)
        ));
    }

    #[test]
    fn cancellation_is_silent() {
        assert!(DriveError::UserCancelled.is_silent());
        assert!(!DriveError::UploadBusy.is_silent());
        assert!(DriveError::Unauthorized.requires_reauth());
    }
}
