use anyhow::Result;
use gzwater_lib::{Acquisition, MetricKind, MetricReading, DEVICE};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Clone, Debug)]
pub enum OutputFormat {
    Table,
    Json,
    Markdown,
}

#[derive(Tabled, Serialize)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    #[serde(rename = "Metric")]
    name: String,
    #[tabled(rename = "Value")]
    #[serde(rename = "Value")]
    value: String,
    #[tabled(rename = "Unit")]
    #[serde(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Synthetic")]
    #[serde(rename = "Synthetic")]
    synthetic: bool,
}

#[derive(Tabled, Serialize)]
struct SensorRow {
    #[tabled(rename = "Key")]
    #[serde(rename = "Key")]
    key: String,
    #[tabled(rename = "Name")]
    #[serde(rename = "Name")]
    name: String,
    #[tabled(rename = "Unit")]
    #[serde(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Icon")]
    #[serde(rename = "Icon")]
    icon: String,
    #[tabled(rename = "Unique ID")]
    #[serde(rename = "Unique ID")]
    unique_id: String,
}

// -- Row builders --

fn build_acquisition_rows(acquisition: &Acquisition) -> Vec<MetricRow> {
    MetricKind::ALL
        .into_iter()
        .map(|kind| MetricRow {
            name: kind.display_name(),
            value: kind.value_of(&acquisition.record).to_string(),
            unit: kind.unit().to_string(),
            synthetic: acquisition.is_synthetic(),
        })
        .collect()
}

fn build_reading_rows(readings: &[(MetricKind, MetricReading)]) -> Vec<MetricRow> {
    readings
        .iter()
        .map(|(kind, reading)| MetricRow {
            name: kind.display_name(),
            value: reading.value.to_string(),
            unit: kind.unit().to_string(),
            synthetic: reading.synthetic,
        })
        .collect()
}

fn build_sensor_rows() -> Vec<SensorRow> {
    MetricKind::ALL
        .into_iter()
        .map(|kind| SensorRow {
            key: kind.key().to_string(),
            name: kind.display_name(),
            unit: kind.unit().to_string(),
            icon: kind.icon().to_string(),
            unique_id: kind.unique_id(),
        })
        .collect()
}

fn render_rows<T: Tabled>(rows: &[T], format: &OutputFormat) -> String {
    let mut table = Table::new(rows);
    if let OutputFormat::Markdown = format {
        table.with(Style::markdown());
    }
    table.to_string()
}

// -- Printers --

pub fn print_acquisition(acquisition: &Acquisition, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(acquisition)?),
        _ => {
            println!("{}", render_rows(&build_acquisition_rows(acquisition), format));
            if acquisition.is_synthetic() {
                eprintln!("warning: portal returned no usable data; values above are synthetic");
            }
        }
    }
    Ok(())
}

pub fn print_readings(
    readings: &[(MetricKind, MetricReading)],
    last_error: Option<&str>,
    format: &OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "readings": readings
                    .iter()
                    .map(|(kind, reading)| (kind.key(), reading))
                    .collect::<std::collections::BTreeMap<_, _>>(),
                "last_error": last_error,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        _ => {
            if readings.is_empty() {
                println!("No billing data published yet.");
            } else {
                println!("{}", render_rows(&build_reading_rows(readings), format));
            }
            if let Some(err) = last_error {
                eprintln!("last update failed: {}", err);
            }
        }
    }
    Ok(())
}

pub fn print_sensors(format: &OutputFormat) -> Result<()> {
    let rows = build_sensor_rows();
    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "device": DEVICE,
                "sensors": rows,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        _ => {
            println!("{} ({})", DEVICE.name, DEVICE.manufacturer);
            println!("{}", render_rows(&rows, format));
        }
    }
    Ok(())
}
