//! The billing record produced by each acquisition cycle.

use serde::{Deserialize, Serialize};

/// One billing reading: amount due, usage volume, bill date.
///
/// Only built through [`crate::normalize::record`] or the synthetic
/// generator, so all three fields are always populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingRecord {
    /// Amount due, in yuan.
    pub total_amount: f64,
    /// Water consumed, in cubic metres.
    pub usage: f64,
    /// `YYYY-MM-DD`.
    pub bill_date: String,
}

/// Which stage of the chain produced a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordSource {
    DirectSession,
    AlternateEndpoint { url: String },
    Login,
    Synthetic,
}

/// A record together with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acquisition {
    pub record: BillingRecord,
    pub source: RecordSource,
}

impl Acquisition {
    pub fn new(record: BillingRecord, source: RecordSource) -> Self {
        Self { record, source }
    }

    /// True when the portal yielded nothing and the record is placeholder data.
    pub fn is_synthetic(&self) -> bool {
        self.source == RecordSource::Synthetic
    }
}
