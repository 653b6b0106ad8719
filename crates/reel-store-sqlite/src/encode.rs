//! Translation between catalog types and their SQLite representations.
//!
//! Documents are stored as compact JSON text. Timestamps are RFC 3339
//! strings. Filters become a `WHERE` clause over `json_extract` expressions
//! plus positional parameters; the clause may select more rows than the
//! filter matches, never fewer.

use chrono::{DateTime, Utc};
use reel_core::{document::Document, filter::Filter, model::Collection};
use rusqlite::types::Value as SqlValue;
use serde_json::Value;

use crate::{Error, Result};

// ─── Tables ──────────────────────────────────────────────────────────────────

pub fn live_table(collection: Collection) -> &'static str { collection.name() }

pub fn staging_table(collection: Collection) -> &'static str {
  match collection {
    Collection::Movies => "movies_staging",
    Collection::People => "people_staging",
    Collection::Credits => "credits_staging",
  }
}

// ─── Documents ───────────────────────────────────────────────────────────────

pub fn encode_doc(doc: &Document) -> Result<String> { Ok(serde_json::to_string(doc)?) }

pub fn decode_doc(s: &str) -> Result<Document> { Ok(serde_json::from_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Filters ─────────────────────────────────────────────────────────────────

/// A `WHERE` clause and the parameters it binds, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFilter {
  pub clause: String,
  pub params: Vec<SqlValue>,
}

impl SqlFilter {
  fn any() -> Self { Self { clause: "1".to_owned(), params: Vec::new() } }

  fn with(clause: String, params: Vec<SqlValue>) -> Self { Self { clause, params } }
}

/// Build the SQL form of `filter`. Fields are inlined into the JSON path so
/// that expression indexes apply; anything outside `[A-Za-z0-9_.]` is
/// rejected.
pub fn encode_filter(filter: &Filter) -> Result<SqlFilter> {
  match filter {
    Filter::All => Ok(SqlFilter::any()),

    Filter::Eq { field, value } => {
      let expr = json_expr(field)?;
      if value.is_null() {
        return Ok(SqlFilter::with(format!("{expr} IS NULL"), Vec::new()));
      }
      Ok(match scalar(value) {
        Some(param) => SqlFilter::with(format!("{expr} = ?"), vec![param]),
        None => SqlFilter::any(),
      })
    }

    Filter::In { field, values } => {
      let expr = json_expr(field)?;
      let list = serde_json::to_string(values)?;
      Ok(SqlFilter::with(
        format!("{expr} IN (SELECT value FROM json_each(?))"),
        vec![SqlValue::Text(list)],
      ))
    }

    Filter::Between { field, min, max } => {
      let expr = json_expr(field)?;
      Ok(SqlFilter::with(
        format!("CAST({expr} AS INTEGER) BETWEEN ? AND ?"),
        vec![SqlValue::Integer(*min), SqlValue::Integer(*max)],
      ))
    }

    Filter::ContainsIgnoreCase { field, needle } => {
      let expr = json_expr(field)?;
      // LIKE only folds ASCII case.
      if !needle.is_ascii() {
        return Ok(SqlFilter::any());
      }
      Ok(SqlFilter::with(
        format!("{expr} LIKE ? ESCAPE '\\'"),
        vec![SqlValue::Text(format!("%{}%", escape_like(needle)))],
      ))
    }

    Filter::And(filters) => {
      let mut clauses = Vec::with_capacity(filters.len());
      let mut params = Vec::new();
      for inner in filters {
        let encoded = encode_filter(inner)?;
        clauses.push(format!("({})", encoded.clause));
        params.extend(encoded.params);
      }
      if clauses.is_empty() {
        return Ok(SqlFilter::any());
      }
      Ok(SqlFilter::with(clauses.join(" AND "), params))
    }
  }
}

fn json_expr(field: &str) -> Result<String> {
  let valid = !field.is_empty()
    && field.split('.').all(|part| {
      !part.is_empty()
        && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    });
  if !valid {
    return Err(Error::InvalidField(field.to_owned()));
  }
  Ok(format!("json_extract(doc, '$.{field}')"))
}

/// The SQL value `json_extract` yields for `value`, when there is one to
/// compare against.
fn scalar(value: &Value) -> Option<SqlValue> {
  match value {
    Value::Bool(b) => Some(SqlValue::Integer(i64::from(*b))),
    Value::Number(n) => n
      .as_i64()
      .map(SqlValue::Integer)
      .or_else(|| n.as_f64().map(SqlValue::Real)),
    Value::String(s) => Some(SqlValue::Text(s.clone())),
    Value::Null | Value::Array(_) | Value::Object(_) => None,
  }
}

fn escape_like(needle: &str) -> String {
  let mut out = String::with_capacity(needle.len());
  for c in needle.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn eq_binds_text_and_integers() {
    let f = encode_filter(&Filter::eq("primaryName", "Fred Astaire")).unwrap();
    assert_eq!(f.clause, "json_extract(doc, '$.primaryName') = ?");
    assert_eq!(f.params, vec![SqlValue::Text("Fred Astaire".into())]);

    let f = encode_filter(&Filter::eq("startYear", 1999)).unwrap();
    assert_eq!(f.params, vec![SqlValue::Integer(1999)]);
  }

  #[test]
  fn eq_null_is_null_check() {
    let f = encode_filter(&Filter::eq("deathYear", Value::Null)).unwrap();
    assert_eq!(f.clause, "json_extract(doc, '$.deathYear') IS NULL");
    assert!(f.params.is_empty());
  }

  #[test]
  fn in_binds_a_json_array() {
    let f = encode_filter(&Filter::is_in("nconst", ["nm1", "nm2"])).unwrap();
    assert_eq!(f.params, vec![SqlValue::Text(json!(["nm1", "nm2"]).to_string())]);
  }

  #[test]
  fn like_patterns_escape_wildcards() {
    let f = encode_filter(&Filter::contains_ignore_case("genres", "50%_off")).unwrap();
    assert_eq!(f.params, vec![SqlValue::Text("%50\\%\\_off%".into())]);
  }

  #[test]
  fn non_ascii_needles_fall_back_to_full_scan() {
    let f = encode_filter(&Filter::contains_ignore_case("genres", "Ação")).unwrap();
    assert_eq!(f.clause, "1");
  }

  #[test]
  fn and_joins_clauses_in_order() {
    let f = encode_filter(
      &Filter::eq("category", "director").and(Filter::between("deathYear", 1990, 2000)),
    )
    .unwrap();
    assert_eq!(
      f.clause,
      "(json_extract(doc, '$.category') = ?) AND \
       (CAST(json_extract(doc, '$.deathYear') AS INTEGER) BETWEEN ? AND ?)"
    );
    assert_eq!(f.params.len(), 3);
  }

  #[test]
  fn suspicious_fields_are_rejected() {
    for field in ["", "a..b", "x') OR 1=1 --", "movie.", "a b"] {
      assert!(
        matches!(encode_filter(&Filter::eq(field, 1)), Err(Error::InvalidField(_))),
        "{field:?} accepted"
      );
    }
  }

  #[test]
  fn timestamps_round_trip() {
    let now = Utc::now();
    assert_eq!(decode_dt(&encode_dt(now)).unwrap(), now);
  }
}
