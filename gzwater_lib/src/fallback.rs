//! Placeholder readings for when the portal yields nothing.

use std::ops::RangeInclusive;

use chrono::NaiveDate;
use rand::Rng;

use crate::record::BillingRecord;

/// Range of synthetic amounts, in yuan.
pub const AMOUNT_RANGE: RangeInclusive<f64> = 30.0..=100.0;
/// Range of synthetic usage, in cubic metres.
pub const USAGE_RANGE: RangeInclusive<f64> = 10.0..=30.0;

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Samples a fresh synthetic record dated `today`.
///
/// Always succeeds. Callers flag the result as synthetic through
/// [`RecordSource::Synthetic`](crate::RecordSource::Synthetic); the record
/// itself looks like a real one.
pub fn generate(today: NaiveDate) -> BillingRecord {
    let mut rng = rand::thread_rng();
    let record = BillingRecord {
        total_amount: round_to(rng.gen_range(AMOUNT_RANGE), 2),
        usage: round_to(rng.gen_range(USAGE_RANGE), 1),
        bill_date: today.format("%Y-%m-%d").to_string(),
    };
    tracing::warn!(
        total_amount = record.total_amount,
        usage = record.usage,
        "Using synthetic billing data; no real data could be retrieved"
    );
    record
}
