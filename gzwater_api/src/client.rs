//! `reqwest`-backed transport for the service portal.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::session::DEFAULT_USER_AGENT;
use crate::transport::truncate_body;
use crate::{Connector, Error, HttpResponse, Session, Transport};

/// HTTP transport with a cookie store.
///
/// Cookies set by the login response are kept in the store and replayed on
/// later requests from the same transport. Requests made with an explicit
/// [`Session`] send that session's cookie instead.
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, Error> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .cookie_store(true)
            .gzip(true)
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                Error::from(e)
            })?;
        Ok(Self { http })
    }

    async fn read(resp: reqwest::Response) -> Result<HttpResponse, Error> {
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let body = resp.text().await.map_err(|e| {
            tracing::error!("Failed to read response body: {}", e);
            Error::from(e)
        })?;
        tracing::debug!(status, body = %truncate_body(&body), "portal response");
        let resp = HttpResponse::new(status, body);
        Ok(match content_type {
            Some(content_type) => resp.with_content_type(content_type),
            None => resp,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        url: &Url,
        session: Option<&Session>,
        timeout: Duration,
    ) -> Result<HttpResponse, Error> {
        let mut req = self.http.get(url.clone()).timeout(timeout);
        if let Some(session) = session {
            for (name, value) in session.headers() {
                req = req.header(name, value);
            }
        }
        let resp = req.send().await.map_err(|e| {
            tracing::warn!("GET {} failed: {}", url.path(), e);
            Error::from(e)
        })?;
        Self::read(resp).await
    }

    async fn post_json(
        &self,
        url: &Url,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<HttpResponse, Error> {
        let resp = self
            .http
            .post(url.clone())
            .timeout(timeout)
            .header("accept", "application/json, text/plain, */*")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("POST {} failed: {}", url.path(), e);
                Error::from(e)
            })?;
        Self::read(resp).await
    }
}

/// Builds a new [`HttpTransport`], with an empty cookie store, per run.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    user_agent: String,
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }
}

impl HttpConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_agent(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }
}

impl Connector for HttpConnector {
    fn connect(&self) -> Result<Arc<dyn Transport>, Error> {
        Ok(Arc::new(HttpTransport::with_user_agent(&self.user_agent)?))
    }
}
