//! Header and row decoding.
//!
//! Pipeline:
//!   line
//!     └─ strip CR          → &str
//!          └─ split on TAB     → cells
//!               └─ decode_cell()   → null | integer | text
//!                    └─ zip with header → Document

use std::{
  collections::HashSet,
  io::{BufRead, Lines},
};

use reel_core::document::Document;
use serde_json::Value;

use crate::{
  NULL_MARKER, TsvOptions,
  error::{Error, Result},
};

// ─── Header ──────────────────────────────────────────────────────────────────

/// Column names of a file plus the per-column decoding decisions.
#[derive(Debug, Clone)]
pub struct Header {
  columns: Vec<String>,
  integer: Vec<bool>,
}

impl Header {
  /// Parse the first line of a file.
  pub fn parse(line: &str, options: &TsvOptions) -> Result<Self> {
    let line = trim_line_end(line.strip_prefix('\u{feff}').unwrap_or(line));
    if line.is_empty() {
      return Err(Error::MissingHeader);
    }

    let mut seen = HashSet::new();
    let columns: Vec<String> = line.split('\t').map(str::to_owned).collect();
    for column in &columns {
      if !seen.insert(column.as_str()) {
        return Err(Error::DuplicateColumn(column.clone()));
      }
    }

    let integer = columns
      .iter()
      .map(|c| options.integer_columns.iter().any(|i| i == c))
      .collect();

    Ok(Self { columns, integer })
  }

  pub fn columns(&self) -> &[String] { &self.columns }

  /// Decode one data line. `line_no` is 1-based and only used in errors.
  pub fn decode_row(&self, line_no: usize, line: &str) -> Result<Document> {
    let cells: Vec<&str> = trim_line_end(line).split('\t').collect();
    if cells.len() != self.columns.len() {
      return Err(Error::FieldCount {
        line:     line_no,
        expected: self.columns.len(),
        found:    cells.len(),
      });
    }

    Ok(
      self
        .columns
        .iter()
        .zip(&self.integer)
        .zip(cells)
        .map(|((column, integer), cell)| (column.clone(), decode_cell(cell, *integer)))
        .collect(),
    )
  }
}

fn trim_line_end(line: &str) -> &str {
  let line = line.strip_suffix('\n').unwrap_or(line);
  line.strip_suffix('\r').unwrap_or(line)
}

/// Whether `line` holds nothing but a line ending. Such lines carry no row
/// and are skipped by every reader.
pub fn is_blank_line(line: &str) -> bool { trim_line_end(line).is_empty() }

fn decode_cell(cell: &str, integer: bool) -> Value {
  if cell == NULL_MARKER {
    return Value::Null;
  }
  if integer && let Ok(n) = cell.parse::<i64>() {
    return Value::from(n);
  }
  Value::String(cell.to_owned())
}

// ─── Reader ──────────────────────────────────────────────────────────────────

/// Iterator over the documents of a buffered TSV source. Blank lines are
/// skipped.
pub struct Reader<R> {
  lines:   Lines<R>,
  header:  Header,
  line_no: usize,
}

impl<R: BufRead> Reader<R> {
  /// Read the header line and prepare to decode rows.
  pub fn new(input: R, options: TsvOptions) -> Result<Self> {
    let mut lines = input.lines();
    let first = lines.next().transpose()?.ok_or(Error::MissingHeader)?;
    let header = Header::parse(&first, &options)?;
    Ok(Self { lines, header, line_no: 1 })
  }

  pub fn header(&self) -> &Header { &self.header }
}

impl<R: BufRead> Iterator for Reader<R> {
  type Item = Result<Document>;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      let line = match self.lines.next()? {
        Ok(line) => line,
        Err(e) => return Some(Err(e.into())),
      };
      self.line_no += 1;
      if is_blank_line(&line) {
        continue;
      }
      return Some(self.header.decode_row(self.line_no, &line));
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
