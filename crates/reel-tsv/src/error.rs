//! Error types for the reel-tsv codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("input has no header row")]
  MissingHeader,

  #[error("header repeats column {0:?}")]
  DuplicateColumn(String),

  #[error("line {line}: expected {expected} fields, found {found}")]
  FieldCount {
    line:     usize,
    expected: usize,
    found:    usize,
  },

  #[error("read error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
