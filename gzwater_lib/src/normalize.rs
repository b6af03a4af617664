//! Turns loosely typed extracted values into a [`BillingRecord`].

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;

use crate::record::BillingRecord;

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-?\d+(?:,\d{3})*(?:\.\d+)?").expect("number pattern compiles")
});

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d", "%Y年%m月%d日"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"];

/// Reads a billing quantity out of a JSON value.
///
/// Numbers are taken as-is; strings may carry a currency sign, thousands
/// separators or a unit. Anything else is absent.
pub fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().and_then(accept),
        Value::String(s) => number_in_text(s),
        _ => None,
    }
}

/// First number found in free text, e.g. `"¥1,045.60"` or `"5.3吨"`.
pub fn number_in_text(text: &str) -> Option<f64> {
    let m = NUMBER_RE.find(text)?;
    let cleaned = m.as_str().replace(',', "");
    cleaned.parse::<f64>().ok().and_then(accept)
}

fn accept(n: f64) -> Option<f64> {
    (n.is_finite() && n >= 0.0).then_some(n)
}

/// Parses the date formats the portal has been seen to use.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive())
}

/// Formats `raw` as `YYYY-MM-DD`, defaulting to `today` when it is missing or unreadable.
pub fn bill_date(raw: Option<&str>, today: NaiveDate) -> String {
    let date = match raw.and_then(parse_date) {
        Some(date) => date,
        None => {
            if let Some(raw) = raw {
                tracing::debug!("Unrecognised bill date {:?}, using acquisition date", raw);
            }
            today
        }
    };
    date.format("%Y-%m-%d").to_string()
}

/// Builds a record when both figures are present; a lone figure is no match.
pub fn record(
    total_amount: Option<f64>,
    usage: Option<f64>,
    date: Option<&str>,
    today: NaiveDate,
) -> Option<BillingRecord> {
    let total_amount = total_amount.and_then(accept)?;
    let usage = usage.and_then(accept)?;
    Some(BillingRecord {
        total_amount,
        usage,
        bill_date: bill_date(date, today),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn numbers_from_json_values() {
        assert_eq!(number(&json!(12.5)), Some(12.5));
        assert_eq!(number(&json!(20)), Some(20.0));
        assert_eq!(number(&json!("45.60")), Some(45.6));
        assert_eq!(number(&json!("¥1,045.60")), Some(1045.6));
        assert_eq!(number(&json!("5.3吨")), Some(5.3));
        assert_eq!(number(&json!(true)), None);
        assert_eq!(number(&json!(null)), None);
        assert_eq!(number(&json!([1.0])), None);
        assert_eq!(number(&json!({"v": 1.0})), None);
        assert_eq!(number(&json!("n/a")), None);
    }

    #[test]
    fn negative_values_are_rejected() {
        assert_eq!(number(&json!(-3.0)), None);
        assert_eq!(number(&json!("-3.0")), None);
    }

    #[test]
    fn dates_in_known_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 1);
        assert_eq!(parse_date("2024-05-01"), expected);
        assert_eq!(parse_date("2024/05/01"), expected);
        assert_eq!(parse_date("20240501"), expected);
        assert_eq!(parse_date("2024年05月01日"), expected);
        assert_eq!(parse_date("2024-05-01 08:30:00"), expected);
        assert_eq!(parse_date("2024-05-01T08:30:00+08:00"), expected);
        assert_eq!(parse_date("May 1st"), None);
    }

    #[test]
    fn bill_date_defaults_to_today() {
        assert_eq!(bill_date(None, today()), "2024-06-15");
        assert_eq!(bill_date(Some("garbage"), today()), "2024-06-15");
        assert_eq!(bill_date(Some("2024/05/01"), today()), "2024-05-01");
    }

    #[test]
    fn record_requires_both_figures() {
        assert!(record(Some(1.0), None, None, today()).is_none());
        assert!(record(None, Some(1.0), None, today()).is_none());
        assert!(record(Some(f64::NAN), Some(1.0), None, today()).is_none());
        let rec = record(Some(88.8), Some(20.1), None, today()).unwrap();
        assert_eq!(rec.total_amount, 88.8);
        assert_eq!(rec.usage, 20.1);
        assert_eq!(rec.bill_date, "2024-06-15");
    }
}
