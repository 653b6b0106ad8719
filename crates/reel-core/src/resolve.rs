//! Name → identifier resolution for people.
//!
//! Display names are not unique. Matching is exact and case-sensitive; when
//! several people share a name the lowest identifier is the canonical one.

use crate::{
  Error, Result,
  filter::Filter,
  model::{Collection, Person, PersonId, fields},
  store::CatalogStore,
};

/// Every person whose display name is exactly `name`, by ascending
/// identifier.
pub async fn resolve_all_by_name<S>(store: &S, name: &str) -> Result<Vec<PersonId>>
where
  S: CatalogStore,
{
  let docs = store
    .find(Collection::People, &Filter::eq(fields::PERSON_NAME, name))
    .await
    .map_err(Error::store)?;

  let mut ids = docs
    .into_iter()
    .map(|doc| serde_json::from_value::<Person>(doc.into()).map(|p| p.nconst))
    .collect::<Result<Vec<_>, _>>()?;
  ids.sort();
  ids.dedup();
  Ok(ids)
}

/// The canonical identifier for `name`, or `None` when nobody has it.
pub async fn resolve_by_name<S>(store: &S, name: &str) -> Result<Option<PersonId>>
where
  S: CatalogStore,
{
  let ids = resolve_all_by_name(store, name).await?;
  if ids.len() > 1 {
    tracing::debug!(name, matches = ids.len(), "ambiguous name, using lowest identifier");
  }
  Ok(ids.into_iter().next())
}
