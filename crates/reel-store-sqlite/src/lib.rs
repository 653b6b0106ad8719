//! SQLite backend for the Reel catalog.
//!
//! Each collection is a table of JSON documents; key fields are indexed
//! through `json_extract` expressions. Wraps [`tokio_rusqlite`] so all
//! database access runs on dedicated threads without blocking the async
//! runtime: one writer connection plus a pool of read connections.

mod encode;
mod readers;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use readers::DEFAULT_READERS;
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
