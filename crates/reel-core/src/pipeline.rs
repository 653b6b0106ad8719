//! A small aggregation engine over catalog documents.
//!
//! A [`Pipeline`] reads one source collection and threads the documents
//! through an ordered list of [`Stage`]s:
//!
//! ```text
//!   source ──Match──Lookup──Unwind──Match──Group──Sort──Limit──Project──▶ rows
//! ```
//!
//! A leading `Match` is handed to [`CatalogStore::find`] so the backend can
//! use its indexes. `Lookup` is the join: it gathers every local key and
//! fetches the matching foreign documents with a single `In` filter. Keys
//! that have no foreign match produce an empty array, which a following
//! `Unwind` drops; dangling references therefore vanish instead of failing.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use crate::{
  document::{Document, compare_values, get_path, key_of, value_at},
  filter::Filter,
  model::Collection,
  store::CatalogStore,
};

// ─── Stages ──────────────────────────────────────────────────────────────────

/// Field of a grouped document holding the group key.
pub const GROUP_KEY: &str = "_id";

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
  /// Keep documents matching the filter.
  Match(Filter),
  /// Attach `from` documents whose `foreign_field` equals this document's
  /// `local_field`, as an array stored under `into`.
  Lookup {
    from:          Collection,
    local_field:   String,
    foreign_field: String,
    into:          String,
  },
  /// Emit one document per element of the top-level array field, with the
  /// field replaced by the element. Missing, null, and empty-array fields
  /// drop the document.
  Unwind(String),
  /// Split a text field on `delimiter` into an array stored under `into`.
  /// Empty pieces are dropped; non-text fields leave `into` unset.
  Split {
    field:     String,
    delimiter: String,
    into:      String,
  },
  /// Collapse documents sharing a key into one document per key. The key is
  /// stored under [`GROUP_KEY`].
  Group {
    key:          GroupKey,
    accumulators: Vec<(String, Accumulator)>,
  },
  /// Stable sort by the given keys. Nulls sort last in both directions.
  Sort(Vec<SortKey>),
  /// Keep the first `n` documents.
  Limit(usize),
  /// Replace every document with `{ output: value_at(source) }` pairs.
  /// Missing sources become explicit nulls.
  Project(Vec<(String, String)>),
}

impl Stage {
  pub fn name(&self) -> &'static str {
    match self {
      Self::Match(_) => "match",
      Self::Lookup { .. } => "lookup",
      Self::Unwind(_) => "unwind",
      Self::Split { .. } => "split",
      Self::Group { .. } => "group",
      Self::Sort(_) => "sort",
      Self::Limit(_) => "limit",
      Self::Project(_) => "project",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GroupKey {
  /// The value at one path.
  Field(String),
  /// An object of `{ name: value_at(path) }`, for composite keys.
  Fields(Vec<(String, String)>),
}

impl GroupKey {
  fn extract(&self, doc: &Document) -> Value {
    match self {
      Self::Field(path) => value_at(doc, path),
      Self::Fields(parts) => Value::Object(
        parts
          .iter()
          .map(|(name, path)| (name.clone(), value_at(doc, path)))
          .collect(),
      ),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
  /// Number of documents in the group.
  Count,
  /// Value at the path in the group's first document.
  First(String),
  /// Array of `{ name: value_at(path) }` objects, one per document.
  Push(Vec<(String, String)>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  Ascending,
  Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
  pub path:      String,
  pub direction: Direction,
}

impl SortKey {
  pub fn asc(path: impl Into<String>) -> Self {
    Self { path: path.into(), direction: Direction::Ascending }
  }

  pub fn desc(path: impl Into<String>) -> Self {
    Self { path: path.into(), direction: Direction::Descending }
  }
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// An ordered list of stages applied to one source collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
  pub source: Collection,
  pub stages: Vec<Stage>,
}

impl Pipeline {
  pub fn new(source: Collection) -> Self { Self { source, stages: Vec::new() } }

  pub fn stage(mut self, stage: Stage) -> Self {
    self.stages.push(stage);
    self
  }

  pub fn matching(self, filter: Filter) -> Self { self.stage(Stage::Match(filter)) }

  pub fn lookup(
    self,
    from: Collection,
    local_field: &str,
    foreign_field: &str,
    into: &str,
  ) -> Self {
    self.stage(Stage::Lookup {
      from,
      local_field: local_field.to_owned(),
      foreign_field: foreign_field.to_owned(),
      into: into.to_owned(),
    })
  }

  pub fn unwind(self, field: &str) -> Self { self.stage(Stage::Unwind(field.to_owned())) }

  pub fn sort(self, keys: Vec<SortKey>) -> Self { self.stage(Stage::Sort(keys)) }

  pub fn limit(self, n: usize) -> Self { self.stage(Stage::Limit(n)) }

  pub fn project(self, fields: &[(&str, &str)]) -> Self {
    self.stage(Stage::Project(owned_pairs(fields)))
  }

  /// Execute against `store` and return the resulting documents.
  pub async fn run<S>(&self, store: &S) -> Result<Vec<Document>, S::Error>
  where
    S: CatalogStore,
  {
    let (initial, rest) = match self.stages.split_first() {
      Some((Stage::Match(filter), rest)) => (filter.clone(), rest),
      _ => (Filter::All, self.stages.as_slice()),
    };

    let mut docs = store.find(self.source, &initial).await?;
    tracing::debug!(
      source = %self.source,
      documents = docs.len(),
      "pipeline source read"
    );

    for stage in rest {
      docs = apply(store, stage, docs).await?;
      tracing::debug!(stage = stage.name(), documents = docs.len(), "pipeline stage");
    }

    Ok(docs)
  }
}

/// Convert borrowed `(name, path)` pairs into the owned form stages store.
pub fn owned_pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
  pairs
    .iter()
    .map(|(name, path)| ((*name).to_owned(), (*path).to_owned()))
    .collect()
}

// ─── Stage evaluation ────────────────────────────────────────────────────────

async fn apply<S>(
  store: &S,
  stage: &Stage,
  docs: Vec<Document>,
) -> Result<Vec<Document>, S::Error>
where
  S: CatalogStore,
{
  let out = match stage {
    Stage::Match(filter) => docs.into_iter().filter(|d| filter.matches(d)).collect(),
    Stage::Lookup { from, local_field, foreign_field, into } => {
      lookup(store, *from, local_field, foreign_field, into, docs).await?
    }
    Stage::Unwind(field) => unwind(field, docs),
    Stage::Split { field, delimiter, into } => split(field, delimiter, into, docs),
    Stage::Group { key, accumulators } => group(key, accumulators, docs),
    Stage::Sort(keys) => sort(keys, docs),
    Stage::Limit(n) => docs.into_iter().take(*n).collect(),
    Stage::Project(fields) => docs.iter().map(|d| project(fields, d)).collect(),
  };
  Ok(out)
}

async fn lookup<S>(
  store: &S,
  from: Collection,
  local_field: &str,
  foreign_field: &str,
  into: &str,
  mut docs: Vec<Document>,
) -> Result<Vec<Document>, S::Error>
where
  S: CatalogStore,
{
  let mut seen = HashSet::new();
  let keys: Vec<Value> = docs
    .iter()
    .filter_map(|d| get_path(d, local_field))
    .filter(|v| !v.is_null() && seen.insert(key_of(v)))
    .cloned()
    .collect();

  let foreign = if keys.is_empty() {
    Vec::new()
  } else {
    store.find(from, &Filter::In { field: foreign_field.to_owned(), values: keys }).await?
  };

  let mut by_key: HashMap<String, Vec<Value>> = HashMap::new();
  for doc in foreign {
    if let Some(k) = get_path(&doc, foreign_field).map(key_of) {
      by_key.entry(k).or_default().push(Value::Object(doc));
    }
  }

  for doc in &mut docs {
    let joined = get_path(doc, local_field)
      .and_then(|v| by_key.get(&key_of(v)))
      .cloned()
      .unwrap_or_default();
    doc.insert(into.to_owned(), Value::Array(joined));
  }

  Ok(docs)
}

fn unwind(field: &str, docs: Vec<Document>) -> Vec<Document> {
  let mut out = Vec::with_capacity(docs.len());
  for mut doc in docs {
    match doc.remove(field) {
      None | Some(Value::Null) => {}
      Some(Value::Array(items)) => {
        for item in items {
          let mut copy = doc.clone();
          copy.insert(field.to_owned(), item);
          out.push(copy);
        }
      }
      Some(scalar) => {
        doc.insert(field.to_owned(), scalar);
        out.push(doc);
      }
    }
  }
  out
}

fn split(field: &str, delimiter: &str, into: &str, docs: Vec<Document>) -> Vec<Document> {
  docs
    .into_iter()
    .map(|mut doc| {
      let parts = get_path(&doc, field).and_then(Value::as_str).map(|text| {
        text
          .split(delimiter)
          .map(str::trim)
          .filter(|p| !p.is_empty())
          .map(|p| Value::String(p.to_owned()))
          .collect::<Vec<_>>()
      });
      if let Some(parts) = parts {
        doc.insert(into.to_owned(), Value::Array(parts));
      }
      doc
    })
    .collect()
}

fn group(
  key: &GroupKey,
  accumulators: &[(String, Accumulator)],
  docs: Vec<Document>,
) -> Vec<Document> {
  // Groups are emitted in order of first appearance.
  let mut index: HashMap<String, usize> = HashMap::new();
  let mut groups: Vec<Document> = Vec::new();

  for doc in &docs {
    let key_value = key.extract(doc);
    let slot = *index.entry(key_of(&key_value)).or_insert_with(|| {
      let mut fresh = Map::new();
      fresh.insert(GROUP_KEY.to_owned(), key_value.clone());
      for (name, acc) in accumulators {
        let initial = match acc {
          Accumulator::Count => Value::from(0u64),
          Accumulator::First(path) => value_at(doc, path),
          Accumulator::Push(_) => Value::Array(Vec::new()),
        };
        fresh.insert(name.clone(), initial);
      }
      groups.push(fresh);
      groups.len() - 1
    });

    let group = &mut groups[slot];
    for (name, acc) in accumulators {
      match acc {
        Accumulator::Count => {
          let n = group.get(name).and_then(Value::as_u64).unwrap_or(0);
          group.insert(name.clone(), Value::from(n + 1));
        }
        Accumulator::First(_) => {}
        Accumulator::Push(fields) => {
          if let Some(Value::Array(items)) = group.get_mut(name) {
            items.push(project_value(fields, doc));
          }
        }
      }
    }
  }

  groups
}

fn sort(keys: &[SortKey], mut docs: Vec<Document>) -> Vec<Document> {
  docs.sort_by(|a, b| {
    for key in keys {
      let (l, r) = (value_at(a, &key.path), value_at(b, &key.path));
      let ord = match (l.is_null(), r.is_null()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => match key.direction {
          Direction::Ascending => compare_values(&l, &r),
          Direction::Descending => compare_values(&r, &l),
        },
      };
      if ord != std::cmp::Ordering::Equal {
        return ord;
      }
    }
    std::cmp::Ordering::Equal
  });
  docs
}

fn project(fields: &[(String, String)], doc: &Document) -> Document {
  fields
    .iter()
    .map(|(name, path)| (name.clone(), value_at(doc, path)))
    .collect()
}

fn project_value(fields: &[(String, String)], doc: &Document) -> Value {
  Value::Object(project(fields, doc))
}
