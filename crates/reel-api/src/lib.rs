//! JSON web API for Reel.
//!
//! Exposes an axum [`Router`] that hands query requests to a
//! [`reel_core::dispatch::Dispatcher`] over any
//! [`reel_core::store::CatalogStore`]. TLS and auth are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let dispatcher = Arc::new(Dispatcher::new(store));
//! axum::serve(listener, reel_api::api_router(dispatcher)).await?;
//! ```

pub mod collections;
pub mod error;
pub mod query;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use reel_core::{dispatch::Dispatcher, store::CatalogStore};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Build a fully-materialised API router around `dispatcher`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(dispatcher: Arc<Dispatcher<S>>) -> Router<()>
where
  S: CatalogStore + 'static,
{
  Router::new()
    .route("/run_query", post(query::run::<S>))
    .route("/queries", get(query::catalog))
    .route("/collections", get(collections::list::<S>))
    .with_state(dispatcher)
    .layer(TraceLayer::new_for_http())
}
