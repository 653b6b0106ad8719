//! Error type for dataset ingestion.

use std::path::PathBuf;

use thiserror::Error;

/// Why loading one file failed. The collection keeps its previous contents.
#[derive(Debug, Error)]
pub enum IngestError {
  #[error("cannot read {path:?}: {source}")]
  Io {
    path:   PathBuf,
    source: std::io::Error,
  },

  #[error("malformed data in {path:?}: {source}")]
  Tsv {
    path:   PathBuf,
    source: reel_tsv::Error,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IngestError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
