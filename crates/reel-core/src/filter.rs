//! Document predicates.
//!
//! A [`Filter`] is evaluated in memory by [`Filter::matches`] and may also be
//! translated by a storage backend into its native query language. Backends
//! are free to over-select; `matches` is the authoritative predicate.

use serde_json::Value;

use crate::document::{Document, as_integer, get_path};

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
  /// Matches every document.
  All,
  /// Field equals value. `Null` matches missing and null fields.
  Eq { field: String, value: Value },
  /// Field equals any of `values`.
  In { field: String, values: Vec<Value> },
  /// Field, read as an integer, lies in `min..=max`.
  Between { field: String, min: i64, max: i64 },
  /// Field is text containing `needle`, ignoring case.
  ContainsIgnoreCase { field: String, needle: String },
  /// Every inner filter matches.
  And(Vec<Filter>),
}

impl Filter {
  pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
    Self::Eq { field: field.into(), value: value.into() }
  }

  pub fn is_in<V>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self
  where
    V: Into<Value>,
  {
    Self::In {
      field:  field.into(),
      values: values.into_iter().map(Into::into).collect(),
    }
  }

  pub fn between(field: impl Into<String>, min: i64, max: i64) -> Self {
    Self::Between { field: field.into(), min, max }
  }

  pub fn contains_ignore_case(
    field: impl Into<String>,
    needle: impl Into<String>,
  ) -> Self {
    Self::ContainsIgnoreCase { field: field.into(), needle: needle.into() }
  }

  /// Conjunction of `self` and `other`, flattening nested `And`s.
  pub fn and(self, other: Filter) -> Self {
    match (self, other) {
      (Self::All, f) | (f, Self::All) => f,
      (Self::And(mut left), Self::And(right)) => {
        left.extend(right);
        Self::And(left)
      }
      (Self::And(mut left), f) => {
        left.push(f);
        Self::And(left)
      }
      (f, Self::And(mut right)) => {
        right.insert(0, f);
        Self::And(right)
      }
      (l, r) => Self::And(vec![l, r]),
    }
  }

  pub fn matches(&self, doc: &Document) -> bool {
    match self {
      Self::All => true,
      Self::Eq { field, value } => match get_path(doc, field) {
        Some(found) => found == value,
        None => value.is_null(),
      },
      Self::In { field, values } => {
        get_path(doc, field).is_some_and(|found| values.contains(found))
      }
      Self::Between { field, min, max } => get_path(doc, field)
        .and_then(as_integer)
        .is_some_and(|n| (*min..=*max).contains(&n)),
      Self::ContainsIgnoreCase { field, needle } => get_path(doc, field)
        .and_then(Value::as_str)
        .is_some_and(|text| {
          text.to_lowercase().contains(&needle.to_lowercase())
        }),
      Self::And(filters) => filters.iter().all(|f| f.matches(doc)),
    }
  }
}
