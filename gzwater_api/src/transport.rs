//! The seam between the acquisition chain and the network.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::{Error, Session};

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// The `Content-Type` header, or `"unknown"` when the portal sent none.
    pub fn content_type_or_unknown(&self) -> &str {
        self.content_type.as_deref().unwrap_or("unknown")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the body as arbitrary JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// The body cut down to a loggable length.
    pub fn snippet(&self) -> String {
        truncate_body(&self.body)
    }
}

/// Issues requests against the portal.
///
/// Implementations must not treat non-success statuses as errors; only
/// failures to obtain a response at all are reported through [`Error`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url`, attaching the session headers when one is given.
    async fn get(
        &self,
        url: &Url,
        session: Option<&Session>,
        timeout: Duration,
    ) -> Result<HttpResponse, Error>;

    /// POST a JSON body to `url`.
    async fn post_json(
        &self,
        url: &Url,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<HttpResponse, Error>;
}

/// Opens a fresh [`Transport`] for each retrieval run.
///
/// Cookies a transport picks up (from a login, or any `Set-Cookie` on the
/// way) live only as long as that transport, so one run never sees
/// another run's session.
pub trait Connector: Send + Sync {
    fn connect(&self) -> Result<Arc<dyn Transport>, Error>;
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 500;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...[truncated]", &body[..end])
}
