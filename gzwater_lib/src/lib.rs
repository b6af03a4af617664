//! Billing acquisition for the Guangzhou water supply portal.
//!
//! Runs an ordered chain of retrieval strategies (cached session, alternate
//! endpoints, credential login) against the portal, extracts the billing
//! figures from whatever comes back, and falls back to a flagged synthetic
//! record when nothing usable is found. Host-side plumbing (configuration,
//! metric descriptors, the polling loop) lives alongside.

pub mod chain;
pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod poller;
pub mod record;
#[cfg(test)]
pub(crate) mod testing;

pub use gzwater_api;
pub use gzwater_api::{Connector, Endpoints, HttpConnector, HttpResponse, HttpTransport, Session, Transport};

pub use chain::{Stage, StrategyChain};
pub use config::{Config, ConfigError};
pub use context::{Credentials, RetrievalContext, Timeouts};
pub use error::{PipelineError, StrategyError};
pub use metrics::{DeviceInfo, MetricKind, MetricReading, MetricStore, MetricValue, DEVICE};
pub use pipeline::Pipeline;
pub use poller::Poller;
pub use record::{Acquisition, BillingRecord, RecordSource};
