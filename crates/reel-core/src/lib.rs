//! Core types and trait definitions for the Reel movie catalog.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! holds the document model, the stage-based pipeline engine, the six
//! analytic queries built on top of it, and the dispatcher that turns a
//! query tag into a uniform response envelope.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod dispatch;
pub mod document;
pub mod error;
pub mod filter;
pub mod model;
pub mod pipeline;
pub mod queries;
pub mod resolve;
pub mod store;

pub use error::{Error, Result};

#[cfg(test)]
mod testing;
