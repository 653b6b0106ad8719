//! Schemaless documents and the value helpers the pipeline engine needs.
//!
//! A document is a JSON object. Fields are addressed by dotted paths
//! (`movie.startYear`), which walk through nested objects only; arrays are
//! never indexed by a path.

use std::cmp::Ordering;

use serde_json::{Map, Value};

/// One record in a collection. Every source column is kept as a field.
pub type Document = Map<String, Value>;

/// Resolve a dotted `path` inside `doc`.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
  let mut parts = path.split('.');
  let mut current = doc.get(parts.next()?)?;
  for part in parts {
    current = current.as_object()?.get(part)?;
  }
  Some(current)
}

/// Like [`get_path`], but returns an owned value with `Null` for a missing
/// field.
pub fn value_at(doc: &Document, path: &str) -> Value {
  get_path(doc, path).cloned().unwrap_or(Value::Null)
}

/// Interpret a value as an integer: JSON integers directly, and text that
/// parses as one. Everything else is `None`.
pub fn as_integer(value: &Value) -> Option<i64> {
  match value {
    Value::Number(n) => n.as_i64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

/// A stable textual key for grouping and joining on arbitrary values.
///
/// `serde_json::Value` is not `Hash`; its compact JSON form is, and two
/// values with the same JSON form are equal.
pub fn key_of(value: &Value) -> String { value.to_string() }

/// Total order over non-null values used by sort stages.
///
/// Numbers compare numerically, strings lexically; values of different
/// kinds order by kind (`bool < number < string < array < object`). `Null`
/// sorts after everything; sort stages keep nulls last regardless of
/// direction by checking for them before calling this.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
  match (a, b) {
    (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
      (Some(x), Some(y)) => x.cmp(&y),
      _ => {
        let x = x.as_f64().unwrap_or(f64::NAN);
        let y = y.as_f64().unwrap_or(f64::NAN);
        x.partial_cmp(&y).unwrap_or(Ordering::Equal)
      }
    },
    (Value::String(x), Value::String(y)) => x.cmp(y),
    (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
    (Value::Array(x), Value::Array(y)) => {
      for (l, r) in x.iter().zip(y) {
        let ord = compare_values(l, r);
        if ord != Ordering::Equal {
          return ord;
        }
      }
      x.len().cmp(&y.len())
    }
    _ => kind_rank(a).cmp(&kind_rank(b)),
  }
}

fn kind_rank(value: &Value) -> u8 {
  match value {
    Value::Bool(_) => 0,
    Value::Number(_) => 1,
    Value::String(_) => 2,
    Value::Array(_) => 3,
    Value::Object(_) => 4,
    Value::Null => 5,
  }
}
