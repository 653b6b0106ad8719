//! Pool of read connections.
//!
//! Every read leases one connection for its whole duration, so concurrent
//! queries run side by side and never queue behind ingestion on the writer.
//! A lease dropped before its read completes (the caller timed out or was
//! aborted) interrupts the statement still running on that connection, and
//! the connection goes back to the pool.

use std::{
  path::Path,
  sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
  },
};

use rusqlite::InterruptHandle;
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::{Error, Result, store::BUSY_TIMEOUT};

/// Read connections opened per store unless configured otherwise.
pub const DEFAULT_READERS: usize = 4;

struct Reader {
  conn:      tokio_rusqlite::Connection,
  interrupt: InterruptHandle,
}

pub(crate) struct ReaderPool {
  idle:    Mutex<Vec<Arc<Reader>>>,
  permits: Semaphore,
}

impl ReaderPool {
  /// Open `size` query-only connections (at least one) to `location`.
  pub(crate) async fn open(location: &Path, size: usize) -> Result<Self> {
    let size = size.max(1);
    let mut idle = Vec::with_capacity(size);
    for _ in 0..size {
      let conn = tokio_rusqlite::Connection::open(location).await?;
      let interrupt = conn
        .call(|conn| {
          conn.busy_timeout(BUSY_TIMEOUT)?;
          conn.execute_batch("PRAGMA query_only = ON;")?;
          Ok(conn.get_interrupt_handle())
        })
        .await?;
      idle.push(Arc::new(Reader { conn, interrupt }));
    }
    Ok(Self { idle: Mutex::new(idle), permits: Semaphore::new(size) })
  }

  /// Run `function` on a leased read connection.
  pub(crate) async fn read<F, R>(&self, function: F) -> Result<R>
  where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, tokio_rusqlite::Error> + Send + 'static,
    R: Send + 'static,
  {
    let mut lease = self.checkout().await?;
    let cancelled = Arc::clone(&lease.cancelled);
    let result = lease
      .reader
      .conn
      .call(move |conn| {
        // Dropped while queued: skip the work entirely.
        if cancelled.load(Ordering::Acquire) {
          return Err(interrupted());
        }
        function(conn)
      })
      .await;
    lease.completed = true;
    Ok(result?)
  }

  async fn checkout(&self) -> Result<Lease<'_>> {
    let permit = self.permits.acquire().await.map_err(|_| Error::NoReader)?;
    let reader = self
      .idle
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .pop()
      .ok_or(Error::NoReader)?;
    Ok(Lease {
      pool: self,
      reader,
      cancelled: Arc::new(AtomicBool::new(false)),
      completed: false,
      _permit: permit,
    })
  }
}

fn interrupted() -> tokio_rusqlite::Error {
  rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_INTERRUPT), None)
    .into()
}

// ─── Lease ───────────────────────────────────────────────────────────────────

struct Lease<'a> {
  pool:      &'a ReaderPool,
  reader:    Arc<Reader>,
  cancelled: Arc<AtomicBool>,
  completed: bool,
  // Released after the reader is back in `idle`.
  _permit:   SemaphorePermit<'a>,
}

impl Drop for Lease<'_> {
  fn drop(&mut self) {
    if !self.completed {
      self.cancelled.store(true, Ordering::Release);
      self.reader.interrupt.interrupt();
      tracing::debug!("interrupted abandoned read");
    }
    self
      .pool
      .idle
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(Arc::clone(&self.reader));
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use crate::store::memory_location;

  /// Counts to ten billion; only an interrupt ends it in reasonable time.
  const SPIN: &str = "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 10000000000)
                      SELECT count(*) FROM n";

  fn spin(conn: &mut rusqlite::Connection) -> Result<i64, tokio_rusqlite::Error> {
    Ok(conn.query_row(SPIN, [], |r| r.get(0))?)
  }

  fn one(conn: &mut rusqlite::Connection) -> Result<i64, tokio_rusqlite::Error> {
    Ok(conn.query_row("SELECT 1", [], |r| r.get(0))?)
  }

  #[tokio::test]
  async fn abandoned_reads_are_interrupted() {
    let pool = ReaderPool::open(&memory_location(), 1).await.unwrap();

    let abandoned = tokio::time::timeout(Duration::from_millis(100), pool.read(spin)).await;
    assert!(abandoned.is_err());

    // The single connection is free again once the spin is interrupted.
    let next = tokio::time::timeout(Duration::from_secs(5), pool.read(one))
      .await
      .expect("read queued behind an abandoned statement");
    assert_eq!(next.unwrap(), 1);
  }

  #[tokio::test]
  async fn reads_run_side_by_side() {
    let pool = ReaderPool::open(&memory_location(), 2).await.unwrap();

    let raced = tokio::time::timeout(Duration::from_secs(5), async {
      tokio::select! {
        _ = pool.read(spin) => panic!("spin finished first"),
        quick = pool.read(one) => quick,
      }
    })
    .await
    .expect("quick read waited for the busy connection");
    assert_eq!(raced.unwrap(), 1);

    // Both connections are back in the pool.
    let (a, b) = tokio::join!(pool.read(one), pool.read(one));
    assert_eq!((a.unwrap(), b.unwrap()), (1, 1));
  }

  #[tokio::test]
  async fn readers_refuse_writes() {
    let pool = ReaderPool::open(&memory_location(), 1).await.unwrap();
    let err = pool
      .read(|conn| Ok(conn.execute_batch("CREATE TABLE t (x INTEGER);")?))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Database(_)));
  }
}
