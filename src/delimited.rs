use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

// Commas show up inside AWIN prices and copy.
pub const DEFAULT_DELIMITER: u8 = b'|';

pub type Row = HashMap<String, String>;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unable to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed delimited content: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Default)]
pub struct FeedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl FeedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn read_file(path: &Path, delimiter: u8) -> Result<FeedTable, FeedError> {
    let content = std::fs::read_to_string(path).map_err(|source| FeedError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse(&content, delimiter)
}

/// Parses header-led delimited text into rows keyed by header name. An
/// unterminated quote swallows the rest of the input into its cell.
pub fn parse(content: &str, delimiter: u8) -> Result<FeedTable, FeedError> {
    let content = content.trim_start_matches('\u{FEFF}');
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .double_quote(true)
        .from_reader(content.as_bytes());

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        if is_blank(&record) {
            continue;
        }
        match &headers {
            None => {
                headers = Some(record.iter().map(|h| h.trim().to_string()).collect());
            }
            Some(names) => rows.push(to_row(names, &record)),
        }
    }

    Ok(FeedTable {
        headers: headers.unwrap_or_default(),
        rows,
    })
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|cell| cell.trim().is_empty())
}

fn to_row(headers: &[String], record: &StringRecord) -> Row {
    let mut row = Row::with_capacity(headers.len());
    for (idx, name) in headers.iter().enumerate() {
        let value = record.get(idx).map(str::trim).unwrap_or_default();
        row.entry(name.clone()).or_insert_with(|| value.to_string());
    }
    row
}
