//! The ordered retrieval strategy chain.
//!
//! The chain is a small state machine. Each [`Stage`] either produces an
//! [`Acquisition`] or fails with a [`StrategyError`], and [`Stage::next`]
//! decides where to go from there. Transitions only ever move forward and
//! no stage is retried, so a run visits at most four stages and always
//! ends with a record.

use gzwater_api::{HttpResponse, Transport};

use crate::context::RetrievalContext;
use crate::error::StrategyError;
use crate::extract::{html, json};
use crate::fallback;
use crate::normalize;
use crate::record::{Acquisition, BillingRecord, RecordSource};

/// A state of the retrieval chain, in the order they are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// GET the primary endpoint with the cached session cookie.
    DirectSession,
    /// Try each alternate endpoint with the same session.
    AlternateEndpoints,
    /// Log in with the account credentials and query the bill.
    LoginFlow,
    /// Produce a synthetic record. Terminal.
    Fallback,
}

impl Stage {
    /// Where the chain goes after this stage fails with `err`.
    ///
    /// The direct session moves on to the alternate endpoints only when the
    /// portal answered but the body was unusable; a rejected session, an
    /// unexpected status or a network failure goes straight to login.
    pub fn next(self, err: &StrategyError) -> Stage {
        match (self, err) {
            (
                Stage::DirectSession,
                StrategyError::MalformedResponse(_) | StrategyError::NoUsableData,
            ) => Stage::AlternateEndpoints,
            (Stage::DirectSession, _) => Stage::LoginFlow,
            (Stage::AlternateEndpoints | Stage::LoginFlow | Stage::Fallback, _) => Stage::Fallback,
        }
    }
}

fn status_error(status: u16) -> StrategyError {
    if status == 403 {
        StrategyError::AuthExpired
    } else {
        StrategyError::UnexpectedStatus(status)
    }
}

/// Runs the strategies against one [`RetrievalContext`].
pub struct StrategyChain<'a, T: Transport + ?Sized> {
    transport: &'a T,
    ctx: &'a RetrievalContext,
}

impl<'a, T: Transport + ?Sized> StrategyChain<'a, T> {
    pub fn new(transport: &'a T, ctx: &'a RetrievalContext) -> Self {
        Self { transport, ctx }
    }

    /// Walks the chain from [`Stage::DirectSession`] until a stage yields a record.
    ///
    /// Never fails: strategy errors become transitions and the last stage
    /// is the synthetic fallback.
    pub async fn run(&self) -> Acquisition {
        let mut stage = Stage::DirectSession;
        loop {
            match self.run_stage(stage).await {
                Ok(acquisition) => return acquisition,
                Err(err) => {
                    let next = stage.next(&err);
                    match &err {
                        StrategyError::AuthExpired | StrategyError::TransientNetwork(_) => {
                            tracing::error!(?stage, ?next, "Strategy failed: {}", err)
                        }
                        _ => tracing::warn!(?stage, ?next, "Strategy failed: {}", err),
                    }
                    stage = next;
                }
            }
        }
    }

    /// Runs a single stage.
    pub async fn run_stage(&self, stage: Stage) -> Result<Acquisition, StrategyError> {
        match stage {
            Stage::DirectSession => self.direct_session().await,
            Stage::AlternateEndpoints => self.alternate_endpoints().await,
            Stage::LoginFlow => self.login_flow().await,
            Stage::Fallback => Ok(Acquisition::new(
                fallback::generate(self.ctx.today),
                RecordSource::Synthetic,
            )),
        }
    }

    async fn direct_session(&self) -> Result<Acquisition, StrategyError> {
        if !self.ctx.session.has_cookie() {
            tracing::info!("No cached session cookie configured");
            return Err(StrategyError::AuthExpired);
        }

        tracing::debug!("Querying primary endpoint with cached session");
        let url = self.ctx.endpoints.primary()?;
        let resp = self
            .transport
            .get(&url, Some(&self.ctx.session), self.ctx.timeouts.primary)
            .await?;
        if !resp.is_success() {
            return Err(status_error(resp.status));
        }

        let value = resp.json().map_err(|e| {
            StrategyError::MalformedResponse(format!(
                "primary response is not JSON (content-type {}): {}",
                resp.content_type_or_unknown(),
                e
            ))
        })?;
        self.record_from_json(&value)
            .map(|record| Acquisition::new(record, RecordSource::DirectSession))
            .ok_or_else(|| {
                StrategyError::MalformedResponse(format!(
                    "no bill fields in primary response: {}",
                    resp.snippet()
                ))
            })
    }

    async fn alternate_endpoints(&self) -> Result<Acquisition, StrategyError> {
        let urls = self.ctx.endpoints.alternates(&self.ctx.credentials.account_id)?;
        for url in urls {
            tracing::info!(endpoint = url.path(), "Trying alternate endpoint");
            let resp = match self
                .transport
                .get(&url, Some(&self.ctx.session), self.ctx.timeouts.alternate)
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::warn!(endpoint = url.path(), "Alternate endpoint unreachable: {}", e);
                    continue;
                }
            };
            if !resp.is_success() {
                tracing::debug!(endpoint = url.path(), status = resp.status, "Alternate endpoint refused");
                continue;
            }
            if let Some(record) = self.record_from_body(&resp) {
                return Ok(Acquisition::new(
                    record,
                    RecordSource::AlternateEndpoint {
                        url: url.to_string(),
                    },
                ));
            }
        }
        tracing::warn!("All alternate endpoints exhausted");
        Err(StrategyError::NoUsableData)
    }

    async fn login_flow(&self) -> Result<Acquisition, StrategyError> {
        tracing::info!("Logging in with account credentials");
        let login_url = self.ctx.endpoints.login()?;
        let login = self
            .transport
            .post_json(
                &login_url,
                &self.ctx.credentials.login_payload(),
                self.ctx.timeouts.alternate,
            )
            .await?;
        if !login.is_success() {
            return Err(status_error(login.status));
        }

        let bill_url = self.ctx.endpoints.authenticated_bill()?;
        let resp = self
            .transport
            .get(&bill_url, None, self.ctx.timeouts.primary)
            .await?;
        if !resp.is_success() {
            return Err(status_error(resp.status));
        }

        self.record_from_body(&resp)
            .map(|record| Acquisition::new(record, RecordSource::Login))
            .ok_or(StrategyError::NoUsableData)
    }

    fn record_from_json(&self, value: &serde_json::Value) -> Option<BillingRecord> {
        let (total_amount, usage) = json::extract(value);
        let date = json::extract_bill_date(value);
        normalize::record(total_amount, usage, date.as_deref(), self.ctx.today)
    }

    /// JSON extraction when the body parses as JSON, page scanning otherwise.
    fn record_from_body(&self, resp: &HttpResponse) -> Option<BillingRecord> {
        match resp.json() {
            Ok(value) => self.record_from_json(&value),
            Err(_) => html::extract(&resp.body, self.ctx.today),
        }
    }
}
