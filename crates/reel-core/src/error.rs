//! Error types for `reel-core`.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown query type: {0:?}")]
  UnknownQuery(String),

  #[error("query {query} requires a parameter ({expected})")]
  MissingParameter {
    query:    &'static str,
    expected: &'static str,
  },

  #[error("invalid parameter for {query}: {reason}")]
  InvalidParameter {
    query:  &'static str,
    reason: String,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("query timed out after {0:?}")]
  Timeout(Duration),

  #[error("query task failed: {0}")]
  TaskFailed(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Box a backend error raised while a query was reading the store.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
