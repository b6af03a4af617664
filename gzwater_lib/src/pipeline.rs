//! Entry point: one acquisition cycle under an overall time budget.

use std::sync::Arc;
use std::time::Duration;

use gzwater_api::{Connector, Endpoints, HttpConnector, Session};
use tokio::task::JoinHandle;

use crate::chain::StrategyChain;
use crate::config::Config;
use crate::context::{Credentials, RetrievalContext, Timeouts};
use crate::error::PipelineError;
use crate::record::Acquisition;

const DEFAULT_OVERALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Aborts the wrapped task when dropped, so a cancelled or timed-out cycle
/// does not keep running detached.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Runs the strategy chain for a set of credentials.
///
/// Cheap to clone. Each invocation opens its own transport through the
/// connector, so cookies never carry over from one cycle to the next.
#[derive(Clone)]
pub struct Pipeline {
    connector: Arc<dyn Connector>,
    endpoints: Endpoints,
    session: Session,
    timeouts: Timeouts,
    overall_timeout: Duration,
}

impl Pipeline {
    pub fn new(connector: Arc<dyn Connector>, endpoints: Endpoints, session: Session) -> Self {
        Self {
            connector,
            endpoints,
            session,
            timeouts: Timeouts::default(),
            overall_timeout: DEFAULT_OVERALL_TIMEOUT,
        }
    }

    /// Builds a pipeline over the real HTTP transport from host configuration.
    pub fn from_config(config: &Config) -> Self {
        let session = config.session();
        let connector = HttpConnector::with_user_agent(session.user_agent());
        Self::new(Arc::new(connector), config.endpoints(), session)
            .with_timeouts(config.timeouts())
            .with_overall_timeout(config.overall_timeout())
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_overall_timeout(mut self, overall_timeout: Duration) -> Self {
        self.overall_timeout = overall_timeout;
        self
    }

    /// Fetches one billing record for `credentials`.
    ///
    /// Returns a synthetic record (flagged through its source) when every
    /// strategy comes up empty, and [`PipelineError::Timeout`] when the chain
    /// runs past the overall budget.
    pub async fn fetch_billing_record(
        &self,
        credentials: &Credentials,
    ) -> Result<Acquisition, PipelineError> {
        let ctx = RetrievalContext::new(
            credentials.clone(),
            self.session.clone(),
            self.endpoints.clone(),
        )
        .with_timeouts(self.timeouts);
        self.fetch_with_context(&ctx).await
    }

    /// Runs the chain against a prepared context.
    ///
    /// The chain runs on its own task: a panic inside it comes back as
    /// [`PipelineError::Failure`], and dropping this future aborts it.
    pub async fn fetch_with_context(
        &self,
        ctx: &RetrievalContext,
    ) -> Result<Acquisition, PipelineError> {
        let transport = self.connector.connect().map_err(|e| {
            tracing::error!("Failed to open portal transport: {}", e);
            PipelineError::Failure(format!("could not open transport: {}", e))
        })?;
        let ctx = ctx.clone();
        let mut task = AbortOnDrop(tokio::spawn(async move {
            StrategyChain::new(transport.as_ref(), &ctx).run().await
        }));

        let joined = tokio::time::timeout(self.overall_timeout, &mut task.0)
            .await
            .map_err(|_| {
                tracing::error!(
                    "Billing retrieval did not finish within {:?}",
                    self.overall_timeout
                );
                PipelineError::Timeout(self.overall_timeout)
            })?;
        let acquisition = joined.map_err(|e| {
            tracing::error!("Billing task aborted: {}", e);
            PipelineError::Failure(format!("billing task aborted: {}", e))
        })?;

        if acquisition.is_synthetic() {
            tracing::warn!(
                bill_date = %acquisition.record.bill_date,
                "Billing cycle completed with synthetic data"
            );
        } else {
            tracing::info!(
                source = ?acquisition.source,
                total_amount = acquisition.record.total_amount,
                usage = acquisition.record.usage,
                bill_date = %acquisition.record.bill_date,
                "Fetched billing record"
            );
        }
        Ok(acquisition)
    }
}
