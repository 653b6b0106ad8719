//! Handler for `GET /collections`: document counts and last load time per
//! collection.

use std::sync::Arc;

use axum::{Json, extract::State};
use reel_core::{
  dispatch::Dispatcher,
  store::{CatalogStore, CollectionStats},
};

use crate::error::ApiError;

/// `GET /collections`
pub async fn list<S>(
  State(dispatcher): State<Arc<Dispatcher<S>>>,
) -> Result<Json<Vec<CollectionStats>>, ApiError>
where
  S: CatalogStore + 'static,
{
  let stats = dispatcher
    .store()
    .collection_stats()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(stats))
}
