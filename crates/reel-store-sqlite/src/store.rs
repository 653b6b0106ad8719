//! [`SqliteStore`], the SQLite implementation of [`CatalogStore`].

use std::{
  path::{Path, PathBuf},
  sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
  },
  time::Duration,
};

use chrono::Utc;
use rusqlite::{ErrorCode, OptionalExtension as _};

use reel_core::{
  document::Document,
  filter::Filter,
  model::Collection,
  store::{CatalogStore, CollectionStats, DEFAULT_BATCH_SIZE},
};

use crate::{
  Error, Result,
  encode::{decode_doc, decode_dt, encode_doc, encode_dt, encode_filter, live_table, staging_table},
  readers::{DEFAULT_READERS, ReaderPool},
  schema::{INDEXES, SCHEMA},
};

/// How long a statement waits on a locked database before failing.
pub(crate) const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

static NEXT_MEMORY_DB: AtomicU64 = AtomicU64::new(0);

/// A fresh shared-cache in-memory database name, so the writer and every
/// reader of one store see the same data.
pub(crate) fn memory_location() -> PathBuf {
  let n = NEXT_MEMORY_DB.fetch_add(1, Ordering::Relaxed);
  PathBuf::from(format!("file:reel-memory-{n}?mode=memory&cache=shared"))
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Reel catalog backed by a single SQLite file.
///
/// Writes go through one connection; reads lease one of a pool of
/// query-only connections. Cloning is cheap, and clones share both.
#[derive(Clone)]
pub struct SqliteStore {
  writer:     tokio_rusqlite::Connection,
  readers:    Arc<ReaderPool>,
  batch_size: usize,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with_readers(path, DEFAULT_READERS).await
  }

  /// Like [`open`](Self::open), with `readers` read connections.
  pub async fn open_with_readers(path: impl AsRef<Path>, readers: usize) -> Result<Self> {
    Self::connect(path.as_ref(), readers).await
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    Self::connect(&memory_location(), DEFAULT_READERS).await
  }

  /// Write `batch_size` documents per staged batch (at least one).
  pub fn with_batch_size(mut self, batch_size: usize) -> Self {
    self.batch_size = batch_size.max(1);
    self
  }

  async fn connect(location: &Path, readers: usize) -> Result<Self> {
    let writer = tokio_rusqlite::Connection::open(location).await?;
    writer
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        conn.execute_batch(INDEXES)?;
        Ok(())
      })
      .await?;

    // Readers open after the schema exists.
    let readers = ReaderPool::open(location, readers).await?;
    Ok(Self {
      writer,
      readers: Arc::new(readers),
      batch_size: DEFAULT_BATCH_SIZE,
    })
  }
}

/// Turn a unique-index violation into [`Error::DuplicateKey`].
fn classify(collection: Collection, err: tokio_rusqlite::Error) -> Error {
  match err {
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(failure, detail))
      if failure.code == ErrorCode::ConstraintViolation =>
    {
      Error::DuplicateKey {
        collection,
        detail: detail.unwrap_or_else(|| failure.to_string()),
      }
    }
    other => Error::Database(other),
  }
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  type Error = Error;

  fn batch_size(&self) -> usize { self.batch_size }

  // ── Staged replacement ────────────────────────────────────────────────────

  async fn stage_batch(&self, collection: Collection, batch: Vec<Document>) -> Result<usize> {
    let rows = batch.iter().map(encode_doc).collect::<Result<Vec<String>>>()?;
    let insert = format!("INSERT INTO {} (doc) VALUES (?1)", staging_table(collection));

    self
      .writer
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(&insert)?;
          for row in &rows {
            stmt.execute(rusqlite::params![row])?;
          }
        }
        tx.commit()?;
        Ok(rows.len())
      })
      .await
      .map_err(|e| classify(collection, e))
  }

  async fn commit_staged(&self, collection: Collection) -> Result<u64> {
    let live = live_table(collection);
    let staging = staging_table(collection);
    let loaded_at = encode_dt(Utc::now());

    let documents = self
      .writer
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(&format!("DELETE FROM {live}"), [])?;
        let documents = tx.execute(
          &format!("INSERT INTO {live} (doc) SELECT doc FROM {staging} ORDER BY rowid"),
          [],
        )?;
        tx.execute(&format!("DELETE FROM {staging}"), [])?;
        tx.execute(
          "INSERT INTO collection_meta (collection, documents, loaded_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT (collection) DO UPDATE
             SET documents = excluded.documents,
                 loaded_at = excluded.loaded_at",
          rusqlite::params![live, documents as i64, loaded_at],
        )?;
        tx.commit()?;
        Ok(documents as u64)
      })
      .await
      .map_err(|e| classify(collection, e))?;

    tracing::info!(%collection, documents, "committed staged documents");
    Ok(documents)
  }

  async fn discard_staged(&self, collection: Collection) -> Result<()> {
    let staging = staging_table(collection);
    self
      .writer
      .call(move |conn| {
        conn.execute(&format!("DELETE FROM {staging}"), [])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Schema ────────────────────────────────────────────────────────────────

  async fn ensure_indexes(&self) -> Result<()> {
    self
      .writer
      .call(|conn| {
        conn.execute_batch(INDEXES)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn count(&self, collection: Collection) -> Result<u64> {
    let live = live_table(collection);
    let n: i64 = self
      .readers
      .read(move |conn| {
        Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {live}"), [], |r| r.get(0))?)
      })
      .await?;
    Ok(n.max(0) as u64)
  }

  async fn find<'a>(&'a self, collection: Collection, filter: &'a Filter) -> Result<Vec<Document>> {
    let sql = encode_filter(filter)?;
    let query = format!(
      "SELECT doc FROM {} WHERE {} ORDER BY rowid",
      live_table(collection),
      sql.clause
    );
    let params = sql.params;

    let rows: Vec<String> = self
      .readers
      .read(move |conn| {
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    let mut docs = rows
      .iter()
      .map(|row| decode_doc(row))
      .collect::<Result<Vec<_>>>()?;
    docs.retain(|doc| filter.matches(doc));

    tracing::debug!(%collection, scanned = rows.len(), matched = docs.len(), "find");
    Ok(docs)
  }

  async fn collection_stats(&self) -> Result<Vec<CollectionStats>> {
    let raws: Vec<(i64, Option<String>)> = self
      .readers
      .read(|conn| {
        let mut raws = Vec::with_capacity(Collection::ALL.len());
        for collection in Collection::ALL {
          let live = live_table(collection);
          let documents: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {live}"), [], |r| r.get(0))?;
          let loaded_at: Option<String> = conn
            .query_row(
              "SELECT loaded_at FROM collection_meta WHERE collection = ?1",
              rusqlite::params![live],
              |r| r.get(0),
            )
            .optional()?;
          raws.push((documents, loaded_at));
        }
        Ok(raws)
      })
      .await?;

    Collection::ALL
      .into_iter()
      .zip(raws)
      .map(|(collection, (documents, loaded_at))| {
        Ok(CollectionStats {
          collection,
          documents: documents.max(0) as u64,
          loaded_at: loaded_at.as_deref().map(decode_dt).transpose()?,
        })
      })
      .collect()
  }
}
