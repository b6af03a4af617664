//! In-process transport double for driving the chain without a network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gzwater_api::{Connector, Error, HttpResponse, Session, Transport};
use url::Url;

#[derive(Clone)]
pub(crate) enum Reply {
    Status(u16, String),
    Fail,
    Hang,
    Panic,
}

/// Clones share routes and the call log, so every transport handed out by
/// [`Connector::connect`] records into the same place.
#[derive(Clone)]
pub(crate) struct FakeTransport {
    routes: Arc<Mutex<HashMap<String, Reply>>>,
    fallback: Reply,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeTransport {
    /// Every unrouted request fails with a connection error.
    pub(crate) fn new() -> Self {
        Self::with_default(Reply::Fail)
    }

    pub(crate) fn with_default(fallback: Reply) -> Self {
        Self {
            routes: Arc::new(Mutex::new(HashMap::new())),
            fallback,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn route(self, path: &str, reply: Reply) -> Self {
        self.routes.lock().unwrap().insert(path.to_string(), reply);
        self
    }

    pub(crate) fn json(self, path: &str, status: u16, body: serde_json::Value) -> Self {
        self.route(path, Reply::Status(status, body.to_string()))
    }

    /// Requests seen so far, as `"GET /path"`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn respond(&self, method: &str, url: &Url) -> Result<HttpResponse, Error> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", method, url.path()));
        let reply = self
            .routes
            .lock()
            .unwrap()
            .get(url.path())
            .cloned()
            .unwrap_or_else(|| self.fallback.clone());
        match reply {
            Reply::Status(status, body) => Ok(HttpResponse::new(status, body)),
            Reply::Fail => Err(Error::Connect("connection refused".to_string())),
            Reply::Panic => panic!("transport blew up"),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                Err(Error::Timeout)
            }
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(
        &self,
        url: &Url,
        _session: Option<&Session>,
        _timeout: Duration,
    ) -> Result<HttpResponse, Error> {
        self.respond("GET", url).await
    }

    async fn post_json(
        &self,
        url: &Url,
        _body: &serde_json::Value,
        _timeout: Duration,
    ) -> Result<HttpResponse, Error> {
        self.respond("POST", url).await
    }
}

impl Connector for FakeTransport {
    fn connect(&self) -> Result<Arc<dyn Transport>, Error> {
        Ok(Arc::new(self.clone()))
    }
}
