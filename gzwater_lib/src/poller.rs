//! Fixed-cadence polling host for the acquisition pipeline.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::context::Credentials;
use crate::error::PipelineError;
use crate::metrics::MetricStore;
use crate::pipeline::Pipeline;
use crate::record::Acquisition;

/// Runs one acquisition immediately and then once per interval, publishing
/// each successful record to a shared [`MetricStore`].
pub struct Poller {
    pipeline: Pipeline,
    credentials: Credentials,
    interval: Duration,
    store: Arc<MetricStore>,
}

impl Poller {
    pub fn new(pipeline: Pipeline, credentials: Credentials, interval: Duration) -> Self {
        Self {
            pipeline,
            credentials,
            interval,
            store: Arc::new(MetricStore::new()),
        }
    }

    /// Handle to the published readings.
    pub fn store(&self) -> Arc<MetricStore> {
        Arc::clone(&self.store)
    }

    /// Runs a single cycle and publishes its outcome.
    ///
    /// Dropping the returned future aborts the in-flight cycle.
    pub async fn refresh(&self) -> Result<Acquisition, PipelineError> {
        let result = self.pipeline.fetch_billing_record(&self.credentials).await;

        match &result {
            Ok(acquisition) => self.store.publish(acquisition),
            Err(e) => {
                tracing::error!("Billing update failed: {}", e);
                self.store.record_failure(e);
            }
        }
        result
    }

    /// Polls until `cancel` fires. The first cycle starts immediately.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_secs = self.interval.as_secs(), "Billing poller started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::warn!("Billing cycle cancelled before completion; nothing published");
                    self.store.record_failure(PipelineError::Cancelled);
                    break;
                }
                _ = self.refresh() => {}
            }
        }
        tracing::info!("Billing poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{MetricKind, MetricValue};
    use crate::testing::{FakeTransport, Reply};
    use gzwater_api::{Endpoints, Session};
    use serde_json::json;

    const PRIMARY: &str = "/api/gsxmcp/rg/um/v1.0/user/bindPage";

    fn poller(transport: Arc<FakeTransport>, interval: Duration) -> Poller {
        let pipeline = Pipeline::new(
            transport,
            Endpoints::with_base_url("http://portal.test"),
            Session::new(Some("caf_web_session=abc".to_string())),
        );
        Poller::new(pipeline, Credentials::new("1001", "pw"), interval)
    }

    #[tokio::test]
    async fn refresh_publishes_record() {
        let transport = Arc::new(FakeTransport::new().json(
            PRIMARY,
            200,
            json!({"total_amount": 88.8, "usage": 20.1}),
        ));
        let poller = poller(transport, Duration::from_secs(86_400));

        let acquisition = poller.refresh().await.unwrap();
        assert!(!acquisition.is_synthetic());
        let store = poller.store();
        assert_eq!(
            store.get(MetricKind::TotalAmount).unwrap().value,
            MetricValue::Number(88.8)
        );
        assert!(store.last_error().is_none());
    }

    #[tokio::test]
    async fn panicking_cycle_is_a_pipeline_failure() {
        let transport = Arc::new(FakeTransport::with_default(Reply::Panic));
        let poller = poller(transport, Duration::from_secs(86_400));

        let result = poller.refresh().await;
        assert!(matches!(result, Err(PipelineError::Failure(_))));
        assert!(poller.store().get(MetricKind::Usage).is_none());
        assert!(poller.store().last_error().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn polls_immediately_then_on_interval() {
        let transport = Arc::new(FakeTransport::new().json(
            PRIMARY,
            200,
            json!({"total_amount": 10.0, "usage": 1.0}),
        ));
        let poller = Arc::new(poller(Arc::clone(&transport), Duration::from_secs(60)));
        let cancel = CancellationToken::new();

        let handle = {
            let poller = Arc::clone(&poller);
            let cancel = cancel.clone();
            tokio::spawn(async move { poller.run(cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(150)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(transport.calls().len(), 3);
        assert!(poller.store().get(MetricKind::BillDate).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_mid_cycle_publishes_nothing() {
        let transport = Arc::new(FakeTransport::with_default(Reply::Hang));
        let poller = Arc::new(poller(Arc::clone(&transport), Duration::from_secs(60)));
        let cancel = CancellationToken::new();

        let handle = {
            let poller = Arc::clone(&poller);
            let cancel = cancel.clone();
            tokio::spawn(async move { poller.run(cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(5)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(transport.calls().len(), 1);
        assert!(poller.store().snapshot().is_empty());
        assert_eq!(
            poller.store().last_error().as_deref(),
            Some("Retrieval cancelled")
        );
    }
}
