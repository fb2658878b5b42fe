use serde::{Deserialize, Serialize};
use sutta_ox_common::CommonRequestError;
use thiserror::Error;

/// Categorizes errors for retry logic and handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection, read failure, timeout or non-success HTTP status
    Transport,
    /// Malformed `data:` payload
    Decode,
    /// `error` event sent by the API inside the stream
    Protocol,
    /// Client misconfiguration detected before any request was sent
    Configuration,
}

/// Error body carried by `error` stream events and error responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorInfo {
    pub r#type: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ErrorInfo,
}

#[derive(Debug, Error)]
pub enum StreamError {
    /// Errors from the HTTP client, including timeouts and body read failures
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status, reported before any frame is decoded
    #[error("HTTP status {status}: {message}")]
    Status {
        status: u16,
        error_type: Option<String>,
        message: String,
    },

    /// Malformed frame payload; the raw payload is kept for diagnostics
    #[error("decode error: {message}")]
    Decode {
        message: String,
        payload: Option<String>,
    },

    /// Error event emitted by the API mid-stream
    #[error("{message}")]
    Protocol { error_type: String, message: String },

    /// No API key configured
    #[error("Authentication missing: no API key provided")]
    AuthenticationMissing,
}

impl StreamError {
    /// Returns the error kind for categorizing errors in retry logic
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) | Self::Status { .. } => ErrorKind::Transport,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::AuthenticationMissing => ErrorKind::Configuration,
        }
    }

    /// Returns true if resending the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Protocol { error_type, .. } => matches!(
                error_type.as_str(),
                "overloaded_error" | "rate_limit_error" | "api_error"
            ),
            Self::Decode { .. } | Self::AuthenticationMissing => false,
        }
    }

    /// The offending payload of a decode error, if any
    pub fn payload(&self) -> Option<&str> {
        match self {
            Self::Decode { payload, .. } => payload.as_deref(),
            _ => None,
        }
    }
}

impl From<ErrorInfo> for StreamError {
    fn from(error: ErrorInfo) -> Self {
        StreamError::Protocol {
            error_type: error.r#type,
            message: error.message,
        }
    }
}

impl From<CommonRequestError> for StreamError {
    fn from(error: CommonRequestError) -> Self {
        match error {
            CommonRequestError::Http(e) => StreamError::Transport(e),
            CommonRequestError::MalformedPayload { source, payload } => StreamError::Decode {
                message: source.to_string(),
                payload: Some(payload),
            },
            CommonRequestError::Utf8Error(e) => StreamError::Decode {
                message: format!("UTF-8 decode error: {e}"),
                payload: None,
            },
        }
    }
}

/// Parse an error response from the API.
/// This function handles both JSON format errors and plain text errors.
pub fn parse_error_response(status: reqwest::StatusCode, bytes: &bytes::Bytes) -> StreamError {
    if let Ok(payload) = serde_json::from_slice::<ApiErrorResponse>(bytes) {
        return StreamError::Status {
            status: status.as_u16(),
            error_type: Some(payload.error.r#type),
            message: payload.error.message,
        };
    }

    let error_text = String::from_utf8_lossy(bytes).trim().to_string();
    let message = if error_text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string()
    } else {
        error_text
    };

    StreamError::Status {
        status: status.as_u16(),
        error_type: None,
        message,
    }
}
