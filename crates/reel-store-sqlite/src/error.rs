//! Error type for `reel-store-sqlite`.

use reel_core::model::Collection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A staged batch repeated a unique key; the batch was not written.
  #[error("duplicate key in {collection}: {detail}")]
  DuplicateKey {
    collection: Collection,
    detail:     String,
  },

  /// Every read connection was lost; only possible if a lease was leaked.
  #[error("no read connection available")]
  NoReader,

  /// A filter named a field that cannot be embedded in a JSON path.
  #[error("invalid field name: {0:?}")]
  InvalidField(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
