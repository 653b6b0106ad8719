//! Handlers for query endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/run_query` | Body: `{"query_type":"movies_by_person","parameter":"Fred Astaire"}` |
//! | `GET`  | `/queries` | Recognised tags and their parameter format |

use std::sync::Arc;

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
};
use reel_core::{
  dispatch::{Dispatcher, Envelope, Query, QueryInfo},
  store::CatalogStore,
};
use serde::Deserialize;

use crate::error::ApiError;

// ─── Run ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RunQueryBody {
  /// A missing tag is treated like an unknown one.
  #[serde(default, alias = "queryType")]
  pub query_type: String,
  #[serde(default)]
  pub parameter:  Option<String>,
}

/// `POST /run_query`
///
/// Always `200 OK` once the body parses; the envelope's `success` flag
/// carries the outcome.
pub async fn run<S>(
  State(dispatcher): State<Arc<Dispatcher<S>>>,
  body: Result<Json<RunQueryBody>, JsonRejection>,
) -> Result<Json<Envelope>, ApiError>
where
  S: CatalogStore + 'static,
{
  let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let envelope = dispatcher
    .dispatch(&body.query_type, body.parameter.as_deref())
    .await;
  Ok(Json(envelope))
}

// ─── Catalog ──────────────────────────────────────────────────────────────────

/// `GET /queries`
pub async fn catalog() -> Json<Vec<QueryInfo>> { Json(Query::CATALOG.to_vec()) }
