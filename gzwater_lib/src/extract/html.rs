//! Label/value scanning over bill pages.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::json;
use crate::normalize;
use crate::record::BillingRecord;

static AMOUNT_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"水费|金额|合计|费用|应缴").expect("amount label pattern compiles"));
static USAGE_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"用水量|水量|吨数|用量").expect("usage label pattern compiles"));
static AMOUNT_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:,\d{3})*\.\d+").expect("amount value pattern compiles"));
static USAGE_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*(?:吨|m³|m3|立方米)?").expect("usage value pattern compiles")
});
static BILL_VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\b(?:var|let|const)\s+|\bwindow\.)(?:billData|bill_data|waterBill|billInfo)\s*=\s*")
        .expect("bill variable pattern compiles")
});
static LABEL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div, span, p, td, th, li, label, dt, dd").expect("label selector parses")
});
static SCRIPT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("script selector parses"));

/// How many ancestor levels to climb when a label has no sibling of its own.
const MAX_CLIMB: usize = 2;

/// Scans a bill page for the amount and usage figures.
///
/// First pairs text labels with the element that follows them; when that
/// does not yield both figures, looks for a bill object assigned in an
/// inline script. Returns `None` when neither pass finds both.
pub fn extract(markup: &str, today: NaiveDate) -> Option<BillingRecord> {
    let document = Html::parse_document(markup);

    let total_amount = labelled_value(&document, &AMOUNT_LABEL_RE, amount_value);
    let usage = labelled_value(&document, &USAGE_LABEL_RE, usage_value);
    if let Some(record) = normalize::record(total_amount, usage, None, today) {
        tracing::info!(
            total_amount = record.total_amount,
            usage = record.usage,
            "Parsed bill figures from page labels"
        );
        return Some(record);
    }

    let record = script_bill(&document, today);
    if record.is_none() {
        tracing::debug!("No bill figures found in page");
    }
    record
}

fn amount_value(text: &str) -> Option<f64> {
    AMOUNT_VALUE_RE
        .find(text)
        .and_then(|m| normalize::number_in_text(m.as_str()))
}

fn usage_value(text: &str) -> Option<f64> {
    USAGE_VALUE_RE
        .captures(text)
        .and_then(|cap| cap.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Text directly inside `el`, ignoring nested elements.
fn own_text(el: &ElementRef<'_>) -> String {
    el.children()
        .filter_map(|node| node.value().as_text())
        .map(|t| &**t)
        .collect::<String>()
        .trim()
        .to_string()
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

/// The nearest element following `label`: its next sibling element, or the
/// next sibling of a close ancestor when the label sits alone in a wrapper.
fn following_element<'a>(label: ElementRef<'a>) -> Option<ElementRef<'a>> {
    let mut current = label;
    for _ in 0..=MAX_CLIMB {
        if let Some(next) = current.next_siblings().find_map(ElementRef::wrap) {
            return Some(next);
        }
        current = current.parent().and_then(ElementRef::wrap)?;
    }
    None
}

fn labelled_value(
    document: &Html,
    label_re: &Regex,
    parse: fn(&str) -> Option<f64>,
) -> Option<f64> {
    document
        .select(&LABEL_SELECTOR)
        .filter(|el| {
            let text = own_text(el);
            !text.is_empty() && label_re.is_match(&text)
        })
        .find_map(|label| following_element(label).and_then(|next| parse(&element_text(&next))))
}

fn script_bill(document: &Html, today: NaiveDate) -> Option<BillingRecord> {
    document.select(&SCRIPT_SELECTOR).find_map(|script| {
        let source = element_text(&script);
        let assignment = BILL_VAR_RE.find(&source)?;
        let start = assignment.end();
        if !source[start..].starts_with('{') {
            return None;
        }
        let literal = extract_json_object(&source, start)?;
        let value: serde_json::Value = match serde_json::from_str(&literal) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("Embedded bill object is not JSON: {}", e);
                return None;
            }
        };
        let obj = value.as_object()?;
        let (total_amount, usage) = json::extract_flat(obj);
        let date = json::extract_bill_date(&value);
        let record = normalize::record(total_amount, usage, date.as_deref(), today)?;
        tracing::info!(
            total_amount = record.total_amount,
            usage = record.usage,
            "Parsed bill figures from embedded script"
        );
        Some(record)
    })
}

/// Cuts the balanced `{...}` starting at `start`, skipping braces inside strings.
fn extract_json_object(source: &str, start: usize) -> Option<String> {
    let mut depth = 0;
    let mut in_str = false;
    let mut escape = false;
    for (offset, ch) in source[start..].char_indices() {
        if in_str {
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_str = false;
            }
            continue;
        }
        match ch {
            '"' => in_str = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + 1;
                    return Some(source[start..end].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn sibling_labels() {
        let html = r#"
            <html><body>
              <div class="row"><span>水费合计</span><span>¥45.60</span></div>
              <div class="row"><span>用水量</span><span>5.3吨</span></div>
            </body></html>
        "#;
        let record = extract(html, today()).unwrap();
        assert_eq!(record.total_amount, 45.60);
        assert_eq!(record.usage, 5.3);
        assert_eq!(record.bill_date, "2024-06-15");
    }

    #[test]
    fn table_cells_and_integer_usage() {
        let html = r#"
            <table>
              <tr><td>本期金额</td><td>1,203.50 元</td></tr>
              <tr><td>用水量</td><td>12 m³</td></tr>
            </table>
        "#;
        let record = extract(html, today()).unwrap();
        assert_eq!(record.total_amount, 1203.5);
        assert_eq!(record.usage, 12.0);
    }

    #[test]
    fn label_wrapped_in_its_own_container() {
        let html = r#"
            <div class="cell"><div><p>水费</p></div><div>¥30.20</div></div>
            <div class="cell"><div><p>吨数</p></div><div>7.5</div></div>
        "#;
        let record = extract(html, today()).unwrap();
        assert_eq!(record.total_amount, 30.2);
        assert_eq!(record.usage, 7.5);
    }

    #[test]
    fn amount_requires_decimal() {
        let html = r#"
            <div><span>水费合计</span><span>45元</span></div>
            <div><span>用水量</span><span>5.3吨</span></div>
        "#;
        assert!(extract(html, today()).is_none());
    }

    #[test]
    fn container_text_does_not_count_as_label() {
        let html = r#"
            <div><span>水费合计</span><b>pending</b></div>
            <div>¥45.60</div>
            <div><span>用水量</span><span>5.3吨</span></div>
        "#;
        assert!(extract(html, today()).is_none());
    }

    #[test]
    fn one_figure_only_is_no_match() {
        let html = r#"<div><span>用水量</span><span>5.3吨</span></div>"#;
        assert!(extract(html, today()).is_none());
    }

    #[test]
    fn script_assignment_fallback() {
        let html = r#"
            <html><head><script>
              var billData = {"total_amount": "66.40", "usage": 14.2, "bill_date": "2024-05-31", "note": "{x}"};
              render(billData);
            </script></head><body><div>加载中</div></body></html>
        "#;
        let record = extract(html, today()).unwrap();
        assert_eq!(record.total_amount, 66.4);
        assert_eq!(record.usage, 14.2);
        assert_eq!(record.bill_date, "2024-05-31");
    }

    #[test]
    fn script_assignment_with_nested_object_and_synonyms() {
        let html = r#"
            <script>window.billInfo = {"amount": 21.0, "volume": 4, "meta": {"page": 1}};</script>
        "#;
        let record = extract(html, today()).unwrap();
        assert_eq!(record.total_amount, 21.0);
        assert_eq!(record.usage, 4.0);
        assert_eq!(record.bill_date, "2024-06-15");
    }

    #[test]
    fn script_object_missing_usage_is_no_match() {
        let html = r#"<script>var billData = {"total_amount": 10.5};</script>"#;
        assert!(extract(html, today()).is_none());
    }

    #[test]
    fn unquoted_script_object_is_no_match() {
        let html = r#"<script>var billData = {total_amount: 10.5, usage: 2};</script>"#;
        assert!(extract(html, today()).is_none());
    }

    #[test]
    fn empty_and_garbage_markup() {
        assert!(extract("", today()).is_none());
        assert!(extract("<<<not html", today()).is_none());
    }

    #[test]
    fn balanced_object_skips_braces_in_strings() {
        let src = r#"x = {"a": "}", "b": {"c": 1}} trailing"#;
        let start = src.find('{').unwrap();
        assert_eq!(
            extract_json_object(src, start).unwrap(),
            r#"{"a": "}", "b": {"c": 1}}"#
        );
    }
}
