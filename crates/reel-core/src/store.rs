//! The `CatalogStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `reel-store-sqlite`).
//! Pipelines, the resolver, and the dispatcher depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{document::Document, filter::Filter, model::Collection};

/// Number of documents written per staged batch unless a backend is
/// configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Size and freshness of one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
  pub collection: Collection,
  pub documents:  u64,
  /// When the current contents were committed; `None` if never loaded.
  pub loaded_at:  Option<DateTime<Utc>>,
}

/// Abstraction over a document store holding the three catalog collections.
///
/// Writes happen only through full replacement: batches are staged next to
/// the live collection and swapped in by [`CatalogStore::commit_staged`], so
/// readers observe either the previous or the new contents in full.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CatalogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// How many documents [`CatalogStore::bulk_replace`] writes per batch.
  fn batch_size(&self) -> usize { DEFAULT_BATCH_SIZE }

  // ── Staged replacement ────────────────────────────────────────────────

  /// Append `batch` to the staging area of `collection`. A duplicate
  /// unique key fails the whole batch.
  fn stage_batch(
    &self,
    collection: Collection,
    batch: Vec<Document>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Replace the live contents of `collection` with everything staged, in
  /// one atomic step. Returns the new document count.
  fn commit_staged(
    &self,
    collection: Collection,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Drop anything staged for `collection` without touching live data.
  fn discard_staged(
    &self,
    collection: Collection,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Clear `collection` and load `records` in its place, writing
  /// [`CatalogStore::batch_size`] documents at a time.
  ///
  /// On failure the staged documents are discarded and the previous
  /// contents stay live.
  fn bulk_replace(
    &self,
    collection: Collection,
    records: Vec<Document>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_ {
    async move {
      self.discard_staged(collection).await?;

      let batch_size = self.batch_size().max(1);
      let mut records = records.into_iter();
      loop {
        let batch: Vec<Document> = records.by_ref().take(batch_size).collect();
        if batch.is_empty() {
          break;
        }
        if let Err(e) = self.stage_batch(collection, batch).await {
          if let Err(discard) = self.discard_staged(collection).await {
            tracing::warn!(%collection, error = %discard, "failed to discard staged batch");
          }
          return Err(e);
        }
      }

      self.commit_staged(collection).await
    }
  }

  // ── Schema ────────────────────────────────────────────────────────────

  /// Declare the unique and lookup indexes. Idempotent.
  fn ensure_indexes(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Number of live documents in `collection`.
  fn count(
    &self,
    collection: Collection,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// All live documents of `collection` matching `filter`, in load order.
  fn find<'a>(
    &'a self,
    collection: Collection,
    filter: &'a Filter,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + 'a;

  /// Count and last load time of every collection.
  fn collection_stats(
    &self,
  ) -> impl Future<Output = Result<Vec<CollectionStats>, Self::Error>> + Send + '_;
}
