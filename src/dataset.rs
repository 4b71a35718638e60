//! Tabular record sources.
//!
//! A [`Record`] is one row of named fields in column order. The
//! [`DatasetReader`] trait is the seam between the pipelines and wherever rows
//! come from; [`CsvDataset`] reads them from a CSV file with a header row.

use std::path::Path;

use crate::error::{RagError, Result};

/// One dataset row: field names paired with values, in column order.
/// `None` marks a missing value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, Option<String>)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field. Order of insertion is the record's field order.
    pub fn push(&mut self, name: impl Into<String>, value: Option<String>) {
        self.fields.push((name.into(), value));
    }

    /// Builder-style [`push`](Self::push) for a present value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, Some(value.into()));
        self
    }

    /// Builder-style [`push`](Self::push) for a missing value.
    pub fn with_missing(mut self, name: impl Into<String>) -> Self {
        self.push(name, None);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Reads an ordered sequence of records from a dataset location.
pub trait DatasetReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Vec<Record>>;
}

/// CSV reader: the header row names the fields, an empty cell is a missing value.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvDataset;

impl DatasetReader for CsvDataset {
    fn read(&self, path: &Path) -> Result<Vec<Record>> {
        let dataset_err = |reason: String| RagError::Dataset {
            path: path.to_path_buf(),
            reason,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| dataset_err(e.to_string()))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| dataset_err(e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut records = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let raw = result.map_err(|e| dataset_err(format!("row {row}: {e}")))?;
            let mut record = Record::new();
            for (i, name) in headers.iter().enumerate() {
                // Short rows are padded with missing values.
                let value = raw.get(i).filter(|v| !v.is_empty()).map(str::to_string);
                record.push(name.clone(), value);
            }
            records.push(record);
        }

        tracing::debug!(path = %path.display(), rows = records.len(), "dataset loaded");
        Ok(records)
    }
}
