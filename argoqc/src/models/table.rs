//! Flat tables and their CSV form
//!
//! CSV output is written without quoting: cells must not contain commas or
//! line breaks. Image names produced by acquisition software satisfy this.

use argoqc_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Header row plus string cells
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Summary table: `Image ID,Label,<metric headers>` then one row per entry
    pub fn summary(metric_headers: &[String], rows: &[SummaryRow]) -> Self {
        let mut headers = vec!["Image ID".to_string(), "Label".to_string()];
        headers.extend(metric_headers.iter().cloned());
        let mut table = Self::new(headers);
        table.extend_summary(rows);
        table
    }

    pub fn extend_summary(&mut self, rows: &[SummaryRow]) {
        self.rows.extend(rows.iter().map(SummaryRow::to_cells));
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// CSV text: header row then one line per row, no quoting
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Never)
            .flexible(true)
            .from_writer(Vec::new());
        writer.write_record(&self.headers).map_err(csv_error)?;
        for row in &self.rows {
            writer.write_record(row).map_err(csv_error)?;
        }
        let bytes = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| Error::Parse(format!("CSV output is not UTF-8: {}", e)))
    }

    /// Parse CSV text written by `to_csv`; the first record is the header row
    pub fn from_csv(text: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .quoting(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        let mut records = reader.records();
        let headers = records
            .next()
            .ok_or_else(|| Error::Parse("CSV table has no header row".to_string()))?
            .map_err(csv_error)?;
        let headers = headers.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in records {
            let record = record.map_err(csv_error)?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self { headers, rows })
    }
}

fn csv_error(err: csv::Error) -> Error {
    Error::Parse(format!("CSV error: {}", err))
}

/// One metric group (one channel) of one processed image
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub image_id: String,
    pub label: String,
    pub values: Vec<f64>,
}

impl SummaryRow {
    pub fn to_cells(&self) -> Vec<String> {
        let mut cells = Vec::with_capacity(self.values.len() + 2);
        cells.push(self.image_id.clone());
        cells.push(self.label.clone());
        cells.extend(self.values.iter().map(|v| format_number(*v)));
        cells
    }
}

/// Default decimal form; NaN stays `NaN`
pub fn format_number(value: f64) -> String {
    value.to_string()
}
