//! Query dispatch: tag + parameter in, response envelope out.
//!
//! Tags parse into the exhaustive [`Query`] enum, so adding a query is a
//! compile-checked change. Every failure past parsing (store errors,
//! timeouts, panics inside a pipeline) is folded into an error
//! [`Envelope`]; nothing escapes [`Dispatcher::dispatch`].

use std::{any::Any, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
  Error, Result,
  queries::{self, CohortParams},
  store::CatalogStore,
};

/// Default wall-clock budget for one query.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

// ─── Queries ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
  TopActors,
  MoviesByPerson { name: String },
  MoviesByDirector { name: String },
  MostCommonGenre,
  SharedMovies { first: String, second: String },
  DeathCohort(CohortParams),
}

/// A recognised query tag and the shape of its parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueryInfo {
  pub query_type: &'static str,
  pub parameter:  Option<&'static str>,
}

const NAME: &str = "person name";
const NAME_PAIR: &str = "two names separated by '|'";
const COHORT: &str = "death-year range and genre, e.g. 1995-2000:Action";

impl Query {
  /// Every tag [`Query::parse`] accepts.
  pub const CATALOG: [QueryInfo; 6] = [
    QueryInfo { query_type: "top_actors", parameter: None },
    QueryInfo { query_type: "movies_by_person", parameter: Some(NAME) },
    QueryInfo { query_type: "movies_by_director", parameter: Some(NAME) },
    QueryInfo { query_type: "most_common_genre", parameter: None },
    QueryInfo { query_type: "shared_movies", parameter: Some(NAME_PAIR) },
    QueryInfo { query_type: "death_cohort", parameter: Some(COHORT) },
  ];

  pub fn tag(&self) -> &'static str {
    match self {
      Self::TopActors => "top_actors",
      Self::MoviesByPerson { .. } => "movies_by_person",
      Self::MoviesByDirector { .. } => "movies_by_director",
      Self::MostCommonGenre => "most_common_genre",
      Self::SharedMovies { .. } => "shared_movies",
      Self::DeathCohort(_) => "death_cohort",
    }
  }

  /// Parse a tag and its optional parameter. Parameters are ignored by the
  /// queries that take none.
  pub fn parse(tag: &str, parameter: Option<&str>) -> Result<Self> {
    let parameter = parameter.map(str::trim).filter(|p| !p.is_empty());
    match tag {
      "top_actors" => Ok(Self::TopActors),
      "most_common_genre" => Ok(Self::MostCommonGenre),
      "movies_by_person" => Ok(Self::MoviesByPerson {
        name: required("movies_by_person", NAME, parameter)?.to_owned(),
      }),
      "movies_by_director" => Ok(Self::MoviesByDirector {
        name: required("movies_by_director", NAME, parameter)?.to_owned(),
      }),
      "shared_movies" => {
        let (first, second) =
          parse_name_pair(required("shared_movies", NAME_PAIR, parameter)?)?;
        Ok(Self::SharedMovies { first, second })
      }
      "death_cohort" => Ok(Self::DeathCohort(parse_cohort(required(
        "death_cohort",
        COHORT,
        parameter,
      )?)?)),
      other => Err(Error::UnknownQuery(other.to_owned())),
    }
  }
}

fn required<'a>(
  query: &'static str,
  expected: &'static str,
  parameter: Option<&'a str>,
) -> Result<&'a str> {
  parameter.ok_or(Error::MissingParameter { query, expected })
}

/// `"A|B"`, or `"A,B"` when no `|` is present.
fn parse_name_pair(parameter: &str) -> Result<(String, String)> {
  let separator = if parameter.contains('|') { '|' } else { ',' };
  let names: Vec<&str> = parameter.split(separator).map(str::trim).collect();
  match names.as_slice() {
    [first, second] if !first.is_empty() && !second.is_empty() => {
      Ok(((*first).to_owned(), (*second).to_owned()))
    }
    _ => Err(Error::InvalidParameter {
      query:  "shared_movies",
      reason: format!("expected {NAME_PAIR}, got {parameter:?}"),
    }),
  }
}

/// `"START-END:GENRE"`.
fn parse_cohort(parameter: &str) -> Result<CohortParams> {
  let invalid = |reason: String| Error::InvalidParameter { query: "death_cohort", reason };

  let (range, genre) = parameter
    .split_once(':')
    .ok_or_else(|| invalid(format!("expected {COHORT}, got {parameter:?}")))?;
  let (start, end) = range
    .split_once('-')
    .ok_or_else(|| invalid(format!("expected a year range, got {range:?}")))?;

  let year = |s: &str| {
    s.trim()
      .parse::<i32>()
      .map_err(|_| invalid(format!("{s:?} is not a year")))
  };
  let (start, end) = (year(start)?, year(end)?);
  if start > end {
    return Err(invalid(format!("range {start}-{end} is reversed")));
  }

  let genre = genre.trim();
  if genre.is_empty() {
    return Err(invalid("genre is empty".to_owned()));
  }

  Ok(CohortParams { start, end, genre: genre.to_owned() })
}

// ─── Envelope ────────────────────────────────────────────────────────────────

/// The uniform response shape:
/// `{"success": true, "results": [...]}` or
/// `{"success": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
  pub success: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub results: Option<Vec<Value>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error:   Option<String>,
}

impl Envelope {
  pub fn ok(results: Vec<Value>) -> Self {
    Self { success: true, results: Some(results), error: None }
  }

  pub fn err(message: impl Into<String>) -> Self {
    Self { success: false, results: None, error: Some(message.into()) }
  }
}

/// What to do with a tag that names no query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownQueryPolicy {
  /// Succeed with no results.
  #[default]
  Empty,
  /// Report an error envelope.
  Reject,
}

// ─── Dispatcher ──────────────────────────────────────────────────────────────

/// Runs queries against a shared store, one tokio task per query.
pub struct Dispatcher<S> {
  store:   Arc<S>,
  timeout: Duration,
  unknown: UnknownQueryPolicy,
}

impl<S> Dispatcher<S>
where
  S: CatalogStore + 'static,
{
  pub fn new(store: Arc<S>) -> Self {
    Self {
      store,
      timeout: DEFAULT_QUERY_TIMEOUT,
      unknown: UnknownQueryPolicy::default(),
    }
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn with_unknown_query_policy(mut self, policy: UnknownQueryPolicy) -> Self {
    self.unknown = policy;
    self
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Parse and run a query, never failing: errors become an error envelope.
  pub async fn dispatch(&self, tag: &str, parameter: Option<&str>) -> Envelope {
    match self.try_dispatch(tag, parameter).await {
      Ok(results) => Envelope::ok(results),
      Err(e) => {
        tracing::warn!(query = tag, error = %e, "query failed");
        Envelope::err(e.to_string())
      }
    }
  }

  /// Parse and run a query, returning the rows as JSON values.
  pub async fn try_dispatch(&self, tag: &str, parameter: Option<&str>) -> Result<Vec<Value>> {
    let query = match Query::parse(tag, parameter) {
      Ok(query) => query,
      Err(Error::UnknownQuery(_)) if self.unknown == UnknownQueryPolicy::Empty => {
        return Ok(Vec::new());
      }
      Err(e) => return Err(e),
    };
    self.execute(query).await
  }

  /// Run `query` on its own task under the configured timeout.
  pub async fn execute(&self, query: Query) -> Result<Vec<Value>> {
    let tag = query.tag();
    let store = Arc::clone(&self.store);
    let mut task = tokio::spawn(async move { run_query(store.as_ref(), &query).await });

    let started = std::time::Instant::now();
    let outcome = match tokio::time::timeout(self.timeout, &mut task).await {
      Ok(Ok(result)) => result,
      Ok(Err(join)) => Err(Error::TaskFailed(if join.is_panic() {
        panic_message(join.into_panic())
      } else {
        join.to_string()
      })),
      Err(_) => {
        task.abort();
        Err(Error::Timeout(self.timeout))
      }
    };

    if let Ok(rows) = &outcome {
      tracing::info!(
        query = tag,
        rows = rows.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "query complete"
      );
    }
    outcome
  }
}

async fn run_query<S>(store: &S, query: &Query) -> Result<Vec<Value>>
where
  S: CatalogStore,
{
  match query {
    Query::TopActors => to_values(queries::top_credited_people(store).await?),
    Query::MoviesByPerson { name } => {
      to_values(queries::filmography_by_person(store, name).await?)
    }
    Query::MoviesByDirector { name } => {
      to_values(queries::filmography_by_director(store, name).await?)
    }
    Query::MostCommonGenre => {
      to_values(queries::most_common_genre(store).await?.into_iter().collect())
    }
    Query::SharedMovies { first, second } => {
      to_values(queries::shared_filmography(store, first, second).await?)
    }
    Query::DeathCohort(params) => to_values(queries::death_cohort(store, params).await?),
  }
}

fn to_values<T: Serialize>(records: Vec<T>) -> Result<Vec<Value>> {
  records
    .iter()
    .map(|r| serde_json::to_value(r).map_err(Error::from))
    .collect()
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    (*s).to_owned()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "query panicked".to_owned()
  }
}
