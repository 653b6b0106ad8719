//! Dataset loader: streams the TSV dumps into the catalog store.
//!
//! Each file is read line by line, decoded, staged in batches of
//! [`CatalogStore::batch_size`] documents and committed in one swap. Any
//! failure discards what was staged, so the collection keeps its previous
//! contents.

use std::{
  path::Path,
  time::{Duration, Instant},
};

use reel_core::{document::Document, model::Collection, store::CatalogStore};
use reel_tsv::{Header, TsvOptions, is_blank_line};
use tokio::{
  fs::File,
  io::{AsyncBufReadExt as _, BufReader},
};

use crate::{
  DataFiles,
  error::{IngestError, Result},
};

/// Outcome of loading one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
  pub collection: Collection,
  pub documents:  u64,
  pub elapsed:    Duration,
}

/// Replace every collection from its dump, then declare indexes and log the
/// final counts.
pub async fn ingest_all<S>(
  store: &S,
  files: &DataFiles,
  options: &TsvOptions,
) -> Result<Vec<IngestReport>>
where
  S: CatalogStore,
{
  let mut reports = Vec::with_capacity(3);
  for (collection, path) in files.sources() {
    reports.push(load_file(store, collection, path, options).await?);
  }

  store.ensure_indexes().await.map_err(IngestError::store)?;

  for collection in Collection::ALL {
    let documents = store.count(collection).await.map_err(IngestError::store)?;
    tracing::info!(%collection, documents, "collection ready");
  }
  Ok(reports)
}

/// Replace `collection` with the contents of the TSV file at `path`.
pub async fn load_file<S>(
  store: &S,
  collection: Collection,
  path: &Path,
  options: &TsvOptions,
) -> Result<IngestReport>
where
  S: CatalogStore,
{
  let started = Instant::now();
  tracing::info!(%collection, path = %path.display(), "loading");

  store.discard_staged(collection).await.map_err(IngestError::store)?;
  if let Err(e) = stage_file(store, collection, path, options).await {
    if let Err(discard) = store.discard_staged(collection).await {
      tracing::warn!(%collection, error = %discard, "failed to discard staged documents");
    }
    return Err(e);
  }
  let documents = store
    .commit_staged(collection)
    .await
    .map_err(IngestError::store)?;

  let elapsed = started.elapsed();
  tracing::info!(
    %collection,
    documents,
    elapsed_ms = elapsed.as_millis() as u64,
    "loaded"
  );
  Ok(IngestReport { collection, documents, elapsed })
}

async fn stage_file<S>(
  store: &S,
  collection: Collection,
  path: &Path,
  options: &TsvOptions,
) -> Result<u64>
where
  S: CatalogStore,
{
  let io = |source| IngestError::Io { path: path.to_owned(), source };
  let tsv = |source| IngestError::Tsv { path: path.to_owned(), source };

  let file = File::open(path).await.map_err(io)?;
  let mut lines = BufReader::new(file).lines();

  let first = lines
    .next_line()
    .await
    .map_err(io)?
    .ok_or_else(|| tsv(reel_tsv::Error::MissingHeader))?;
  let header = Header::parse(&first, options).map_err(tsv)?;

  let batch_size = store.batch_size().max(1);
  let mut batch = Vec::with_capacity(batch_size);
  let mut line_no = 1;
  let mut staged = 0_u64;

  while let Some(line) = lines.next_line().await.map_err(io)? {
    line_no += 1;
    if is_blank_line(&line) {
      continue;
    }
    batch.push(header.decode_row(line_no, &line).map_err(tsv)?);

    if batch.len() >= batch_size {
      staged += flush(store, collection, &mut batch).await?;
      tracing::info!(%collection, staged, "batch staged");
    }
  }
  if !batch.is_empty() {
    staged += flush(store, collection, &mut batch).await?;
    tracing::info!(%collection, staged, "batch staged");
  }
  Ok(staged)
}

async fn flush<S>(store: &S, collection: Collection, batch: &mut Vec<Document>) -> Result<u64>
where
  S: CatalogStore,
{
  let documents = std::mem::take(batch);
  let n = store
    .stage_batch(collection, documents)
    .await
    .map_err(IngestError::store)?;
  Ok(n as u64)
}
