use crate::storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// No response reached us: connection refused, reset, or timed out.
    #[error("Network error: {0}")]
    Network(String),
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
    /// The session was invalidated after a 401. Never retried.
    #[error("Session expired")]
    AuthExpired,
    /// 401 on a request that carried no session, e.g. bad login credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error ({status}): {message}")]
    Validation { status: u16, message: String },
    /// `success: false` inside a 2xx envelope.
    #[error("API error: {0}")]
    Application(String),
    #[error("Invalid response: {0}")]
    Decode(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Server { .. })
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, ApiError::AuthExpired)
    }

    /// Text suitable for showing to the account holder.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            ApiError::Server { .. } => {
                "The server is having problems. Please try again later.".to_string()
            }
            ApiError::AuthExpired => "Your session has expired, please sign in again.".to_string(),
            ApiError::Unauthorized(message)
            | ApiError::Forbidden(message)
            | ApiError::NotFound(message)
            | ApiError::Validation { message, .. }
            | ApiError::Application(message)
            | ApiError::InvalidInput(message) => message.clone(),
            ApiError::Decode(_) => "Unexpected response from the server.".to_string(),
            ApiError::Storage(_) => "Could not access local storage.".to_string(),
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}
