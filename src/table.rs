use std::path::Path;
use tracing::{debug, info};

use crate::error::InputError;

/// Tried in order; the first one that decodes and parses wins.
pub const ENCODINGS: [&str; 3] = ["utf-8", "iso-8859-1", "cp1252"];

/// An input CSV held as strings: a header row plus data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub encoding: &'static str,
}

fn decode(bytes: &[u8], encoding: &str) -> Option<String> {
    match encoding {
        "utf-8" => {
            let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
            std::str::from_utf8(bytes).ok().map(str::to_string)
        }
        "iso-8859-1" => Some(encoding_rs::mem::decode_latin1(bytes).into_owned()),
        "cp1252" => encoding_rs::WINDOWS_1252
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|s| s.into_owned()),
        _ => None,
    }
}

/// Short rows are kept (missing cells read as empty); rows wider than the header are rejected.
fn parse_csv(text: &str) -> Result<(Vec<String>, Vec<Vec<String>>), String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| e.to_string())?;
        if record.len() > headers.len() {
            return Err(format!(
                "row {} has {} fields, but the header has {}",
                i,
                record.len(),
                headers.len()
            ));
        }
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok((headers, rows))
}

impl Table {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InputError> {
        let mut last_parse_error = None;
        for encoding in ENCODINGS {
            let Some(text) = decode(bytes, encoding) else {
                debug!("Input is not valid {}", encoding);
                continue;
            };
            match parse_csv(&text) {
                Ok((headers, rows)) => {
                    if headers.iter().all(|h| h.is_empty()) {
                        return Err(InputError::Malformed("missing header row".into()));
                    }
                    debug!("Table decoded - encoding={}, rows={}", encoding, rows.len());
                    return Ok(Self { headers, rows, encoding });
                }
                Err(e) => {
                    debug!("CSV parse failed under {} - {}", encoding, e);
                    last_parse_error = Some(e);
                }
            }
        }
        match last_parse_error {
            Some(msg) => Err(InputError::Malformed(msg)),
            None => Err(InputError::Encoding {
                tried: ENCODINGS.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }

    pub fn load(path: &Path) -> Result<Self, InputError> {
        let bytes = std::fs::read(path).map_err(|source| InputError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::from_bytes(&bytes)?;
        info!(
            "Table loaded - path={}, rows={}, columns={}, encoding={}",
            path.display(),
            table.rows.len(),
            table.headers.len(),
            table.encoding
        );
        Ok(table)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Result<usize, InputError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| InputError::MissingColumn {
                column: name.to_string(),
                available: self.headers.clone(),
            })
    }

    /// Values of `column` for rows in `[start, end)`, in table order.
    pub fn column_slice(&self, column: &str, range: RowRange) -> Result<Vec<String>, InputError> {
        let idx = self.column_index(column)?;
        Ok(self.rows[range.start..range.end]
            .iter()
            .map(|r| r.get(idx).cloned().unwrap_or_default())
            .collect())
    }
}

/// Validated `[start, end)` with `start <= end <= row_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
}

impl RowRange {
    /// `end` past the table is clamped; `start > end` is rejected.
    pub fn resolve(start: Option<usize>, end: Option<usize>, row_count: usize) -> Result<Self, InputError> {
        let start = start.unwrap_or(0);
        let requested_end = end.unwrap_or(row_count);
        let end = requested_end.min(row_count);
        if end < requested_end {
            debug!("end_row {} clamped to row count {}", requested_end, row_count);
        }
        if start > end {
            return Err(InputError::RowRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}
