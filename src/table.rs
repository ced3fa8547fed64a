use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::FeatureResult;
use crate::features::FeatureValue;

pub const LABEL_COLUMN: &str = "is_fraud";

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    // Ingestion position of the source record.
    pub position: usize,
    pub account: String,
    // One value per table column, in schema order.
    pub values: Vec<FeatureValue>,
    pub label: Option<bool>,
}

// Output of a pipeline run. Rows follow the timeline order; the label is
// always the last column written.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureTable {
    columns: Vec<String>,
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, row: FeatureRow) {
        debug_assert_eq!(row.values.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&FeatureValue> {
        let index = self.column_index(column)?;
        self.rows.get(row).map(|r| &r.values[index])
    }

    // Rows belonging to `account`, in table order.
    pub fn account_rows<'a>(&'a self, account: &'a str) -> impl Iterator<Item = &'a FeatureRow> + 'a {
        self.rows.iter().filter(move |r| r.account == account)
    }

    pub fn header(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(LABEL_COLUMN))
            .collect()
    }

    pub fn write_csv(&self, path: &Path) -> FeatureResult<()> {
        self.write_to(File::create(path)?)?;
        log::info!("Feature table saved to {}", path.display());
        Ok(())
    }

    pub fn write_to<W: Write>(&self, writer: W) -> FeatureResult<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(self.header())?;
        for row in &self.rows {
            let label = match row.label {
                Some(true) => "1",
                Some(false) => "0",
                None => "",
            };
            wtr.write_record(
                row.values
                    .iter()
                    .map(|v| v.to_string())
                    .chain(std::iter::once(label.to_string())),
            )?;
        }
        wtr.flush()?;
        Ok(())
    }
}
