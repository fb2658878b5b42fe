use thiserror::Error;

/// Common errors that can occur while reading a streamed response body
#[derive(Error, Debug)]
pub enum CommonRequestError {
    /// HTTP request or body read failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A `data:` payload that is not valid JSON for the expected event type
    #[error("decode error: {source} (payload: {payload})")]
    MalformedPayload {
        source: serde_json::Error,
        payload: String,
    },

    /// UTF-8 conversion error
    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),
}

