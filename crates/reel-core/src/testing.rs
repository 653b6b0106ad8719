//! In-memory [`CatalogStore`] used by this crate's unit tests.

use std::{
  collections::HashMap,
  sync::{Mutex, PoisonError},
  time::Duration,
};

use chrono::Utc;
use serde_json::Value;

use crate::{
  document::Document,
  filter::Filter,
  model::Collection,
  store::{CatalogStore, CollectionStats},
};

#[derive(Debug, thiserror::Error)]
#[error("memory store fault: {0}")]
pub struct Fault(pub String);

/// Collections held in plain vectors. Every `find` is recorded so tests can
/// assert what the engine asked for.
#[derive(Default)]
pub struct MemoryStore {
  live:    Mutex<HashMap<Collection, Vec<Document>>>,
  staged:  Mutex<HashMap<Collection, Vec<Document>>>,
  finds:   Mutex<Vec<(Collection, Filter)>>,
  /// When set, every read fails with this message.
  pub fail_reads:  Option<String>,
  /// When set, every `find` panics with this message.
  pub panic_reads: Option<String>,
  /// Sleep this long before answering a `find`.
  pub read_delay:  Option<Duration>,
}

impl MemoryStore {
  pub fn failing(message: &str) -> Self {
    Self { fail_reads: Some(message.to_owned()), ..Self::default() }
  }

  pub fn panicking(message: &str) -> Self {
    Self { panic_reads: Some(message.to_owned()), ..Self::default() }
  }

  pub fn with_read_delay(mut self, delay: Duration) -> Self {
    self.read_delay = Some(delay);
    self
  }

  pub async fn load(&self, collection: Collection, docs: Vec<Document>) {
    self.bulk_replace(collection, docs).await.expect("memory load");
  }

  pub fn finds(&self) -> Vec<(Collection, Filter)> {
    self.finds.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  fn check(&self) -> Result<(), Fault> {
    match &self.fail_reads {
      Some(message) => Err(Fault(message.clone())),
      None => Ok(()),
    }
  }
}

/// Turn a JSON array literal into documents.
pub fn docs(value: Value) -> Vec<Document> {
  value
    .as_array()
    .expect("array literal")
    .iter()
    .map(|v| v.as_object().cloned().expect("object literal"))
    .collect()
}

impl CatalogStore for MemoryStore {
  type Error = Fault;

  async fn stage_batch(&self, collection: Collection, batch: Vec<Document>) -> Result<usize, Fault> {
    let n = batch.len();
    let mut staged = self.staged.lock().unwrap_or_else(PoisonError::into_inner);
    staged.entry(collection).or_default().extend(batch);
    Ok(n)
  }

  async fn commit_staged(&self, collection: Collection) -> Result<u64, Fault> {
    let docs = self
      .staged
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(&collection)
      .unwrap_or_default();
    let n = docs.len() as u64;
    self.live.lock().unwrap_or_else(PoisonError::into_inner).insert(collection, docs);
    Ok(n)
  }

  async fn discard_staged(&self, collection: Collection) -> Result<(), Fault> {
    self.staged.lock().unwrap_or_else(PoisonError::into_inner).remove(&collection);
    Ok(())
  }

  async fn ensure_indexes(&self) -> Result<(), Fault> { Ok(()) }

  async fn count(&self, collection: Collection) -> Result<u64, Fault> {
    self.check()?;
    let live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(live.get(&collection).map_or(0, Vec::len) as u64)
  }

  async fn find<'a>(&'a self, collection: Collection, filter: &'a Filter) -> Result<Vec<Document>, Fault> {
    self.check()?;
    if let Some(message) = &self.panic_reads {
      panic!("{message}");
    }
    if let Some(delay) = self.read_delay {
      tokio::time::sleep(delay).await;
    }
    self
      .finds
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push((collection, filter.clone()));
    let live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(
      live
        .get(&collection)
        .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
        .unwrap_or_default(),
    )
  }

  async fn collection_stats(&self) -> Result<Vec<CollectionStats>, Fault> {
    let mut stats = Vec::new();
    for collection in Collection::ALL {
      stats.push(CollectionStats {
        collection,
        documents: self.count(collection).await?,
        loaded_at: Some(Utc::now()),
      });
    }
    Ok(stats)
  }
}
