//! InfluxDB line protocol formatter for cycle summaries.

use crate::output::SummaryFormatter;
use crate::window::Summary;
use std::collections::BTreeMap;
use std::fmt;

/// Field values supported by the line protocol.
#[derive(Debug, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Float(num) => write!(f, "{num}"),
            FieldValue::Integer(num) => write!(f, "{num}i"),
        }
    }
}

/// One data point in line protocol form.
///
/// No timestamp is attached: summaries are per-cycle values and the
/// receiver stamps them on arrival.
#[derive(Debug)]
pub struct DataPoint {
    pub measurement: String,
    pub tag_set: BTreeMap<String, String>,
    pub field_set: BTreeMap<String, FieldValue>,
}

impl fmt::Display for DataPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.measurement)?;
        for (key, value) in &self.tag_set {
            write!(f, ",{key}={value}")?;
        }
        let mut separator = ' ';
        for (key, value) in &self.field_set {
            write!(f, "{separator}{key}={value}")?;
            separator = ',';
        }
        Ok(())
    }
}

/// Tag values may not contain unescaped commas, equals signs or spaces.
fn escape_tag(value: &str) -> String {
    value
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

/// Formats summaries as InfluxDB line protocol, one line per device.
///
/// Measurement fields that were `None` for the cycle are omitted; the
/// `samples` field is always present, so an all-quiet cycle still produces
/// a syntactically valid line.
pub struct InfluxDbFormatter {
    measurement_name: String,
}

impl InfluxDbFormatter {
    pub fn new(measurement_name: String) -> Self {
        Self { measurement_name }
    }

    fn to_data_point(&self, summary: &Summary) -> DataPoint {
        let mut tag_set = BTreeMap::new();
        tag_set.insert("mac".to_string(), summary.address.to_string());
        tag_set.insert("name".to_string(), escape_tag(&summary.name));

        let mut field_set = BTreeMap::new();
        if let Some(temperature) = summary.temperature {
            field_set.insert("temperature".to_string(), FieldValue::Float(temperature));
        }
        if let Some(humidity) = summary.humidity {
            field_set.insert("humidity".to_string(), FieldValue::Float(humidity));
        }
        if let Some(battery) = summary.battery {
            field_set.insert("battery".to_string(), FieldValue::Integer(i64::from(battery)));
        }
        if let Some(rssi) = summary.rssi {
            field_set.insert("rssi".to_string(), FieldValue::Integer(i64::from(rssi)));
        }
        field_set.insert(
            "samples".to_string(),
            FieldValue::Integer(summary.sample_count as i64),
        );

        DataPoint {
            measurement: self.measurement_name.clone(),
            tag_set,
            field_set,
        }
    }
}

impl SummaryFormatter for InfluxDbFormatter {
    fn format(&self, summary: &Summary) -> String {
        self.to_data_point(summary).to_string()
    }
}
