// ============================================================
// Layer 4 - Dataset Loader
// ============================================================
// Reads the email corpus from a CSV file with a header row.
//
// Expected layout (column names are configurable):
//
//   text,label
//   "Dear customer, verify your account...",1
//   "Minutes from Tuesday's meeting...",0
//
// Several text columns (e.g. subject + body) can be joined into
// one raw text. A sender column is optional.
//
// Reference: csv crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::email::{EmailRecord, Label};
use crate::domain::error::DataFormatError;
use crate::domain::traits::EmailSource;

/// Which CSV columns hold the text, the label and the sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub text:   Vec<String>,
    pub label:  String,
    pub sender: Option<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            text:   vec!["text".to_string()],
            label:  "label".to_string(),
            sender: None,
        }
    }
}

/// Loads labelled emails from one CSV file.
pub struct CsvEmailLoader {
    path:    PathBuf,
    columns: ColumnMapping,
}

impl CsvEmailLoader {
    pub fn new(path: impl Into<PathBuf>, columns: ColumnMapping) -> Self {
        Self { path: path.into(), columns }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EmailSource for CsvEmailLoader {
    fn load_all(&self) -> Result<Vec<EmailRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_path(&self.path)
            .with_context(|| format!("Cannot open dataset '{}'", self.path.display()))?;

        let headers = reader
            .headers()
            .with_context(|| format!("Cannot read header row of '{}'", self.path.display()))?
            .clone();

        let path_str = self.path.display().to_string();
        let find = |name: &str| -> Result<usize, DataFormatError> {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| DataFormatError::MissingColumn {
                    path:   path_str.clone(),
                    column: name.to_string(),
                })
        };

        let text_idx: Vec<usize> = self
            .columns
            .text
            .iter()
            .map(|c| find(c))
            .collect::<Result<_, _>>()?;
        let label_idx  = find(&self.columns.label)?;
        let sender_idx = match &self.columns.sender {
            Some(c) => Some(find(c)?),
            None => None,
        };

        let mut records = Vec::new();
        for (i, row) in reader.records().enumerate() {
            // +2: one for the header, one for 1-based row numbers
            let row_no = i + 2;
            let row = row.map_err(|e| DataFormatError::MalformedRow {
                row:     row_no,
                message: e.to_string(),
            })?;

            let raw_label = row.get(label_idx).unwrap_or_default();
            let label = Label::parse(raw_label).ok_or_else(|| DataFormatError::UnrecognisedLabel {
                row:   row_no,
                value: raw_label.to_string(),
            })?;

            // Empty cells are legitimate: an email may have no subject or body.
            let text = text_idx
                .iter()
                .filter_map(|&idx| row.get(idx))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n");

            let mut record = EmailRecord::new(text, label);
            if let Some(idx) = sender_idx {
                if let Some(sender) = row.get(idx) {
                    record = record.with_sender(sender);
                }
            }
            records.push(record);
        }

        tracing::info!("Loaded {} records from '{}'", records.len(), self.path.display());
        Ok(records)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
