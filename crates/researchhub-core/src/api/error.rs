use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::auth::validation::ValidationError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// FastAPI error envelope: `{"detail": "..."}` or a list of validation items.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Message(String),
    Items(Vec<ErrorItem>),
}

#[derive(Debug, Deserialize)]
struct ErrorItem {
    #[serde(default)]
    msg: String,
}

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

    /// Pull the human-readable message out of an error body, falling back to
    /// the (truncated) raw body.
    fn extract_message(body: &str) -> String {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody {
                detail: ErrorDetail::Message(msg),
            }) => Self::truncate_body(&msg),
            Ok(ErrorBody {
                detail: ErrorDetail::Items(items),
            }) => {
                let joined = items
                    .into_iter()
                    .map(|item| item.msg)
                    .filter(|msg| !msg.is_empty())
                    .collect::<Vec<_>>()
                    .join("; ");
                Self::truncate_body(&joined)
            }
            Err(_) => Self::truncate_body(body.trim()),
        }
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = Self::extract_message(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized(message),
            403 => ApiError::AccessDenied(message),
            404 => ApiError::NotFound(message),
            409 => ApiError::Conflict(message),
            429 => ApiError::RateLimited,
            code @ 500..=599 => ApiError::ServerError {
                status: code,
                message,
            },
            code => ApiError::Rejected {
                status: code,
                message,
            },
        }
    }

    /// HTTP status reported by the server, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::AccessDenied(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::Conflict(_) => Some(409),
            ApiError::RateLimited => Some(429),
            ApiError::Rejected { status, .. } | ApiError::ServerError { status, .. } => {
                Some(*status)
            }
            ApiError::NetworkError(e) => e.status().map(|s| s.as_u16()),
            ApiError::InvalidResponse(_) | ApiError::Validation(_) => None,
        }
    }

    /// Server-provided message, when there is a non-empty one.
    pub fn detail(&self) -> Option<&str> {
        let message = match self {
            ApiError::Unauthorized(m)
            | ApiError::AccessDenied(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m) => m.as_str(),
            ApiError::Rejected { message, .. } | ApiError::ServerError { message, .. } => {
                message.as_str()
            }
            _ => return None,
        };
        if message.is_empty() {
            None
        } else {
            Some(message)
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict(_))
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::NetworkError(_))
    }
}
