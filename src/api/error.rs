//! Error type for calls to the application backend.
//!
//! [`ApiError`] separates authentication failures, non-success HTTP replies,
//! transport failures and bodies that do not decode. Callers map these onto
//! [`WizardError`](crate::error::WizardError) at the boundary where the call
//! is made.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP 401. The credential is missing, expired or invalid.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Any other non-success HTTP status. `message` is the FastAPI `detail`
    /// text when the body carries one, otherwise the raw body.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// DNS, connection refused, timeout and other transport failures.
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The server answered 2xx with a body of the wrong shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

impl ApiError {
    /// Build the error for a non-success reply from its status and body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = detail_message(body);
        if status == 401 {
            ApiError::Unauthorized { message }
        } else {
            ApiError::ApiError { status, message }
        }
    }

    /// Whether the backend looked at the request and declined it, as opposed
    /// to being unreachable or broken.
    pub fn is_rejection(&self) -> bool {
        match self {
            ApiError::Unauthorized { .. } => true,
            ApiError::ApiError { status, .. } => (400..500).contains(status),
            ApiError::NetworkError(_) | ApiError::Decode(_) => false,
        }
    }

    /// The human-readable part of the error, without the status prefix.
    pub fn message(&self) -> String {
        match self {
            ApiError::Unauthorized { message } | ApiError::ApiError { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}

fn detail_message(body: &str) -> String {
    let trimmed = body.trim();
    match serde_json::from_str::<ErrorBody>(trimmed) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(s),
        }) => s,
        // FastAPI validation errors carry a list of objects.
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if trimmed.is_empty() => "no response body".to_string(),
        Err(_) => trimmed.to_string(),
    }
}
