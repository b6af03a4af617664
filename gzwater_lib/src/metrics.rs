//! Metric descriptors and the last-known-value store exposed to the host.

use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::record::{Acquisition, BillingRecord};

const DOMAIN: &str = "gzwater";
const NAME_PREFIX: &str = "广州自来水";

/// The three readings published per billing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    TotalAmount,
    Usage,
    BillDate,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [MetricKind::TotalAmount, MetricKind::Usage, MetricKind::BillDate];

    /// Key matching the record field.
    pub fn key(self) -> &'static str {
        match self {
            Self::TotalAmount => "total_amount",
            Self::Usage => "usage",
            Self::BillDate => "bill_date",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::TotalAmount => "水费总额",
            Self::Usage => "用水量",
            Self::BillDate => "账单日期",
        }
    }

    /// Display name of the entity, e.g. `广州自来水 水费总额`.
    pub fn display_name(self) -> String {
        format!("{} {}", NAME_PREFIX, self.label())
    }

    pub fn unit(self) -> &'static str {
        match self {
            Self::TotalAmount => "元",
            Self::Usage => "m³",
            Self::BillDate => "",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::TotalAmount => "mdi:water",
            Self::Usage => "mdi:water-outline",
            Self::BillDate => "mdi:calendar",
        }
    }

    pub fn unique_id(self) -> String {
        format!("{}_{}", DOMAIN, self.key())
    }

    pub fn value_of(self, record: &BillingRecord) -> MetricValue {
        match self {
            Self::TotalAmount => MetricValue::Number(record.total_amount),
            Self::Usage => MetricValue::Number(record.usage),
            Self::BillDate => MetricValue::Date(record.bill_date.clone()),
        }
    }
}

/// The device all three metrics are grouped under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifier: &'static str,
    pub name: &'static str,
    pub manufacturer: &'static str,
}

pub const DEVICE: DeviceInfo = DeviceInfo {
    identifier: "gzwater_device",
    name: "广州市自来水",
    manufacturer: "广州市自来水公司",
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Date(String),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Date(d) => f.write_str(d),
        }
    }
}

/// A published metric value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricReading {
    pub value: MetricValue,
    /// Set when the cycle fell back to placeholder data.
    pub synthetic: bool,
    pub updated_at: DateTime<Local>,
}

/// The values of one successful cycle, published together.
struct Published {
    record: BillingRecord,
    synthetic: bool,
    updated_at: DateTime<Local>,
}

impl Published {
    fn reading(&self, kind: MetricKind) -> MetricReading {
        MetricReading {
            value: kind.value_of(&self.record),
            synthetic: self.synthetic,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Default)]
struct StoreState {
    published: Option<Published>,
    last_error: Option<String>,
}

/// Last successful value per metric, readable concurrently by the host.
///
/// A cycle's three values are swapped in under one lock, so readers never
/// mix values from different cycles. Failed cycles leave the previous values
/// in place and only set the last error.
#[derive(Default)]
pub struct MetricStore {
    state: RwLock<StoreState>,
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Replaces all three readings with the values of `acquisition`.
    pub fn publish(&self, acquisition: &Acquisition) {
        let published = Published {
            record: acquisition.record.clone(),
            synthetic: acquisition.is_synthetic(),
            updated_at: Local::now(),
        };
        let mut state = self.write();
        state.published = Some(published);
        state.last_error = None;
    }

    /// Marks the latest cycle as failed without touching published values.
    pub fn record_failure(&self, error: impl fmt::Display) {
        self.write().last_error = Some(error.to_string());
    }

    pub fn get(&self, kind: MetricKind) -> Option<MetricReading> {
        self.read().published.as_ref().map(|p| p.reading(kind))
    }

    /// Error of the latest cycle, if it failed.
    pub fn last_error(&self) -> Option<String> {
        self.read().last_error.clone()
    }

    /// All published readings in metric order, all from the same cycle.
    pub fn snapshot(&self) -> Vec<(MetricKind, MetricReading)> {
        match &self.read().published {
            Some(published) => MetricKind::ALL
                .into_iter()
                .map(|kind| (kind, published.reading(kind)))
                .collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordSource;

    fn acquisition(source: RecordSource) -> Acquisition {
        Acquisition::new(
            BillingRecord {
                total_amount: 45.6,
                usage: 5.3,
                bill_date: "2024-05-01".to_string(),
            },
            source,
        )
    }

    #[test]
    fn descriptors() {
        assert_eq!(MetricKind::TotalAmount.display_name(), "广州自来水 水费总额");
        assert_eq!(MetricKind::Usage.unit(), "m³");
        assert_eq!(MetricKind::BillDate.unit(), "");
        assert_eq!(MetricKind::BillDate.icon(), "mdi:calendar");
        assert_eq!(MetricKind::Usage.unique_id(), "gzwater_usage");
    }

    #[test]
    fn publish_and_read() {
        let store = MetricStore::new();
        assert!(store.get(MetricKind::TotalAmount).is_none());

        store.publish(&acquisition(RecordSource::DirectSession));
        let amount = store.get(MetricKind::TotalAmount).unwrap();
        assert_eq!(amount.value, MetricValue::Number(45.6));
        assert!(!amount.synthetic);
        assert_eq!(
            store.get(MetricKind::BillDate).unwrap().value.to_string(),
            "2024-05-01"
        );
        assert_eq!(store.snapshot().len(), 3);
    }

    #[test]
    fn synthetic_flag_is_published() {
        let store = MetricStore::new();
        store.publish(&acquisition(RecordSource::Synthetic));
        assert!(store.get(MetricKind::Usage).unwrap().synthetic);
    }

    #[test]
    fn failure_keeps_last_values() {
        let store = MetricStore::new();
        store.publish(&acquisition(RecordSource::Login));
        store.record_failure("Retrieval timed out");
        assert_eq!(store.last_error().as_deref(), Some("Retrieval timed out"));
        assert_eq!(
            store.get(MetricKind::Usage).unwrap().value,
            MetricValue::Number(5.3)
        );

        store.publish(&acquisition(RecordSource::Login));
        assert!(store.last_error().is_none());
    }

    #[test]
    fn concurrent_readers_never_mix_cycles() {
        use std::sync::Arc;

        let store = Arc::new(MetricStore::new());
        let cycle = |n: f64| {
            Acquisition::new(
                BillingRecord {
                    total_amount: n,
                    usage: n,
                    bill_date: format!("2024-05-{:02}", n as u32),
                },
                RecordSource::DirectSession,
            )
        };
        store.publish(&cycle(1.0));

        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..2_000 {
                    store.publish(&cycle(if i % 2 == 0 { 2.0 } else { 1.0 }));
                }
            })
        };

        for _ in 0..2_000 {
            let snapshot = store.snapshot();
            assert_eq!(snapshot.len(), 3);
            let amount = snapshot[0].1.value.to_string();
            assert_eq!(snapshot[1].1.value.to_string(), amount);
            assert_eq!(snapshot[2].1.value.to_string(), format!("2024-05-0{}", amount));
            assert_eq!(snapshot[0].1.updated_at, snapshot[2].1.updated_at);
        }
        writer.join().unwrap();
    }
}
