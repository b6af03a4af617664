//! Field search over JSON bill responses of unknown shape.

use serde_json::{Map, Value};

use crate::normalize;

const AMOUNT_KEY: &str = "total_amount";
const USAGE_KEY: &str = "usage";
const LIST_KEYS: &[&str] = &["bills", "list", "items", "records"];
const AMOUNT_KEYS: &[&str] = &["total_amount", "amount", "total", "cost", "price"];
const USAGE_KEYS: &[&str] = &["usage", "water_usage", "consumption", "volume", "quantity"];
const DATE_KEYS: &[&str] = &["bill_date", "billDate", "date"];

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Figures {
    total_amount: Option<f64>,
    usage: Option<f64>,
}

impl Figures {
    fn is_complete(&self) -> bool {
        self.total_amount.is_some() && self.usage.is_some()
    }

    /// Fills whichever figure is still missing; earlier finds are kept.
    fn fill(&mut self, obj: &Map<String, Value>, amount_keys: &[&str], usage_keys: &[&str]) {
        if self.total_amount.is_none() {
            self.total_amount = lookup(obj, amount_keys);
        }
        if self.usage.is_none() {
            self.usage = lookup(obj, usage_keys);
        }
    }

    fn into_pair(self) -> (Option<f64>, Option<f64>) {
        (self.total_amount, self.usage)
    }
}

fn lookup(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|key| obj.get(*key).and_then(normalize::number))
}

fn data_object(value: &Value) -> Option<&Map<String, Value>> {
    value.get("data").and_then(Value::as_object)
}

/// First entries of the list-valued keys under `data`, in search order.
fn first_entries(data: &Map<String, Value>) -> impl Iterator<Item = &Map<String, Value>> {
    LIST_KEYS.iter().filter_map(|key| {
        data.get(*key)
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .and_then(Value::as_object)
    })
}

/// Searches a bill response for `(total_amount, usage)`.
///
/// Looks at the top level, then `data`, then the first entry of
/// `data.bills`/`list`/`items`/`records` (where amount and usage synonyms
/// are also accepted). The first value found for each figure wins.
pub fn extract(value: &Value) -> (Option<f64>, Option<f64>) {
    let mut figures = Figures::default();
    let Some(root) = value.as_object() else {
        return figures.into_pair();
    };

    figures.fill(root, &[AMOUNT_KEY], &[USAGE_KEY]);
    if figures.is_complete() {
        return figures.into_pair();
    }

    if let Some(data) = data_object(value) {
        figures.fill(data, &[AMOUNT_KEY], &[USAGE_KEY]);
        for entry in first_entries(data) {
            if figures.is_complete() {
                break;
            }
            figures.fill(entry, AMOUNT_KEYS, USAGE_KEYS);
        }
    }

    tracing::debug!(
        total_amount = ?figures.total_amount,
        usage = ?figures.usage,
        "JSON extraction result"
    );
    figures.into_pair()
}

/// Figures from a flat object, accepting every known key spelling.
///
/// Used for bill objects embedded in page scripts.
pub fn extract_flat(obj: &Map<String, Value>) -> (Option<f64>, Option<f64>) {
    let mut figures = Figures::default();
    figures.fill(obj, AMOUNT_KEYS, USAGE_KEYS);
    figures.into_pair()
}

/// The bill date, if the response carries one, from the same places [`extract`] searches.
pub fn extract_bill_date(value: &Value) -> Option<String> {
    let root = value.as_object()?;
    let date_in = |obj: &Map<String, Value>| {
        DATE_KEYS
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_str))
            .map(str::to_string)
    };

    if let Some(date) = date_in(root) {
        return Some(date);
    }
    let data = data_object(value)?;
    if let Some(date) = date_in(data) {
        return Some(date);
    }
    first_entries(data).find_map(date_in)
}
