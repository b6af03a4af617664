//! Error types for the portal transport.

/// Errors that can occur while talking to the portal.
///
/// A response with a non-success status is not an error at this layer;
/// callers inspect [`HttpResponse::status`](crate::HttpResponse) themselves.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request did not complete within its per-call timeout.
    #[error("Request timed out")]
    Timeout,
    /// The connection could not be established.
    #[error("Connection failed: {0}")]
    Connect(String),
    /// Any other failure while sending the request.
    #[error("Request failed: {0}")]
    Request(String),
    /// The response body could not be read.
    #[error("Failed to read response body: {0}")]
    Body(String),
    /// An endpoint URL could not be constructed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            Self::Body(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidUrl(e.to_string())
    }
}
