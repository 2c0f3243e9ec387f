//! Uploaded CSV datasets
//!
//! The dashboard accepts plain comma-separated text: the first line is the
//! header, fields are split on every comma (no escaping) and surrounding
//! quotes are stripped. Parsing never fails; ragged rows are padded or
//! truncated to the header width.

use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// Parsed tabular data, rows aligned to `columns`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Parse CSV text
    pub fn parse(text: &str) -> Self {
        let text = text.trim_start_matches('\u{feff}');
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let mut columns: Option<Vec<String>> = None;
        let mut rows = Vec::new();
        let mut ragged = 0usize;

        for (index, record) in reader.records().enumerate() {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    warn!(record = index + 1, error = %e, "Skipping unreadable CSV record");
                    continue;
                }
            };

            let fields: Vec<String> = record.iter().map(clean_field).collect();
            // whitespace-only line; `,` and friends are rows of missing values
            if fields.len() == 1 && fields[0].is_empty() {
                continue;
            }

            match &columns {
                None => columns = Some(unique_headers(fields)),
                Some(header) => {
                    if fields.len() != header.len() {
                        ragged += 1;
                    }
                    let mut row = fields;
                    row.resize(header.len(), String::new());
                    rows.push(row);
                }
            }
        }

        let columns = columns.unwrap_or_default();
        if ragged > 0 {
            debug!(ragged, "Aligned rows with the wrong column count");
        }

        Self { columns, rows }
    }

    /// Read and parse a CSV file
    pub fn from_path<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column, in row order
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(index).map(String::as_str).unwrap_or(""))
    }

    /// Value of `column` in `row`, empty when either is out of range
    pub fn value(&self, row: usize, column: &str) -> &str {
        self.column_index(column)
            .and_then(|c| self.rows.get(row).and_then(|r| r.get(c)))
            .map(String::as_str)
            .unwrap_or("")
    }
}

fn clean_field(raw: &str) -> String {
    raw.replace('"', "").trim().to_string()
}

/// Keep header names unique by suffixing repeats (`amount`, `amount_2`, ...)
fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    headers
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let base = if name.is_empty() {
                format!("column_{}", i + 1)
            } else {
                name
            };
            let mut candidate = base.clone();
            let mut n = 2;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{}_{}", base, n);
                n += 1;
            }
            candidate
        })
        .collect()
}
