//! Server and loader wiring for Reel.
//!
//! Holds the runtime configuration and the TSV ingestion loader; the `reel`
//! binary in `main.rs` ties them to the SQLite store and the web API.

pub mod error;
pub mod ingest;

pub use error::IngestError;

use std::{path::PathBuf, time::Duration};

use reel_core::{
  dispatch::{DEFAULT_QUERY_TIMEOUT, UnknownQueryPolicy},
  model::Collection,
  store::DEFAULT_BATCH_SIZE,
};
use reel_store_sqlite::DEFAULT_READERS;
use reel_tsv::{DEFAULT_INTEGER_COLUMNS, TsvOptions};
use serde::Deserialize;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `config.toml` and `REEL_*`
/// environment variables. Every field has a default.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  /// Read connections serving queries in parallel.
  pub read_connections:   usize,
  pub batch_size:         usize,
  pub query_timeout_secs: u64,
  pub unknown_query:      UnknownQueryPolicy,
  pub data:               DataFiles,
  pub integer_columns:    Vec<String>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:               "127.0.0.1".to_owned(),
      port:               5000,
      store_path:         PathBuf::from("reel.db"),
      read_connections:   DEFAULT_READERS,
      batch_size:         DEFAULT_BATCH_SIZE,
      query_timeout_secs: DEFAULT_QUERY_TIMEOUT.as_secs(),
      unknown_query:      UnknownQueryPolicy::default(),
      data:               DataFiles::default(),
      integer_columns:    DEFAULT_INTEGER_COLUMNS.iter().map(|c| (*c).to_owned()).collect(),
    }
  }
}

impl ServerConfig {
  pub fn query_timeout(&self) -> Duration { Duration::from_secs(self.query_timeout_secs) }

  pub fn tsv_options(&self) -> TsvOptions {
    TsvOptions { integer_columns: self.integer_columns.clone() }
  }
}

/// Locations of the three dataset dumps.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DataFiles {
  pub movies:  PathBuf,
  pub people:  PathBuf,
  pub credits: PathBuf,
}

impl Default for DataFiles {
  fn default() -> Self {
    Self {
      movies:  PathBuf::from("imdb_assets/title.basics.tsv"),
      people:  PathBuf::from("imdb_assets/name.basics.tsv"),
      credits: PathBuf::from("imdb_assets/title.principals.tsv"),
    }
  }
}

impl DataFiles {
  /// The file feeding each collection, in load order.
  pub fn sources(&self) -> [(Collection, &PathBuf); 3] {
    [
      (Collection::Movies, &self.movies),
      (Collection::People, &self.people),
      (Collection::Credits, &self.credits),
    ]
  }
}
