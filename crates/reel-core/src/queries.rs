//! The six analytic queries.
//!
//! Each query has a pure builder returning its [`Pipeline`] and an async
//! runner that resolves names, executes the pipeline, and decodes the rows
//! into typed records. Every ordering carries a secondary key so results are
//! reproducible. A name that resolves to nobody yields an empty result, not
//! an error.

use serde::de::DeserializeOwned;

use crate::{
  Error, Result,
  document::Document,
  filter::Filter,
  model::{
    ACTING_CATEGORIES, CohortMember, Collection, CreditCount, DIRECTOR_CATEGORY,
    GENRE_DELIMITER, GenreCount, MovieSummary, PersonId, fields,
  },
  pipeline::{Accumulator, GROUP_KEY, GroupKey, Pipeline, SortKey, Stage, owned_pairs},
  resolve::resolve_by_name,
  store::CatalogStore,
};

/// How many people [`top_credited_people`] returns.
pub const TOP_CREDITED_LIMIT: usize = 10;

/// Parameters of [`death_cohort`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortParams {
  /// First death year, inclusive.
  pub start: i32,
  /// Last death year, inclusive.
  pub end:   i32,
  /// Case-insensitive substring of the movie's genre field.
  pub genre: String,
}

// ─── Shared tails ────────────────────────────────────────────────────────────

const MOVIE: &str = "movie";

/// Join the `tconst` at `local_field` to its movie and reduce to
/// `{title, year}` ordered by year (nulls last), then title.
fn summarize_movies(pipeline: Pipeline, local_field: &str) -> Pipeline {
  pipeline
    .lookup(Collection::Movies, local_field, fields::MOVIE_ID, MOVIE)
    .unwind(MOVIE)
    .project(&[("title", "movie.originalTitle"), ("year", "movie.startYear")])
    .sort(vec![SortKey::asc("year"), SortKey::asc("title")])
}

// ─── 1. Top credited people ──────────────────────────────────────────────────

/// Acting credits grouped per person, top ten by count, joined to names.
pub fn top_credited_people_pipeline() -> Pipeline {
  Pipeline::new(Collection::Credits)
    .matching(Filter::is_in(fields::CATEGORY, ACTING_CATEGORIES))
    .stage(Stage::Group {
      key:          GroupKey::Field(fields::PERSON_ID.into()),
      accumulators: vec![("count".into(), Accumulator::Count)],
    })
    .sort(vec![SortKey::desc("count"), SortKey::asc(GROUP_KEY)])
    .limit(TOP_CREDITED_LIMIT)
    .lookup(Collection::People, GROUP_KEY, fields::PERSON_ID, "person")
    .unwind("person")
    .project(&[("name", "person.primaryName"), ("count", "count")])
}

pub async fn top_credited_people<S>(store: &S) -> Result<Vec<CreditCount>>
where
  S: CatalogStore,
{
  run(store, &top_credited_people_pipeline()).await
}

// ─── 2. Filmography by person ────────────────────────────────────────────────

pub fn filmography_pipeline(person: &PersonId) -> Pipeline {
  summarize_movies(
    Pipeline::new(Collection::Credits)
      .matching(Filter::eq(fields::PERSON_ID, person.as_str())),
    fields::MOVIE_ID,
  )
}

/// Every movie `name` is credited in, in any category, ordered by year.
pub async fn filmography_by_person<S>(store: &S, name: &str) -> Result<Vec<MovieSummary>>
where
  S: CatalogStore,
{
  match resolve_by_name(store, name).await? {
    Some(id) => run(store, &filmography_pipeline(&id)).await,
    None => Ok(Vec::new()),
  }
}

// ─── 3. Filmography by director ──────────────────────────────────────────────

pub fn directed_pipeline(person: &PersonId) -> Pipeline {
  summarize_movies(
    Pipeline::new(Collection::Credits).matching(
      Filter::eq(fields::PERSON_ID, person.as_str())
        .and(Filter::eq(fields::CATEGORY, DIRECTOR_CATEGORY)),
    ),
    fields::MOVIE_ID,
  )
}

/// Movies `name` is credited as director of, ordered by year.
pub async fn filmography_by_director<S>(store: &S, name: &str) -> Result<Vec<MovieSummary>>
where
  S: CatalogStore,
{
  match resolve_by_name(store, name).await? {
    Some(id) => run(store, &directed_pipeline(&id)).await,
    None => Ok(Vec::new()),
  }
}

// ─── 4. Most common genre ────────────────────────────────────────────────────

pub fn genre_counts_pipeline() -> Pipeline {
  Pipeline::new(Collection::Movies)
    .stage(Stage::Split {
      field:     fields::GENRES.into(),
      delimiter: GENRE_DELIMITER.into(),
      into:      "genre".into(),
    })
    .unwind("genre")
    .stage(Stage::Group {
      key:          GroupKey::Field("genre".into()),
      accumulators: vec![("count".into(), Accumulator::Count)],
    })
    .sort(vec![SortKey::desc("count"), SortKey::asc(GROUP_KEY)])
    .project(&[("genre", GROUP_KEY), ("count", "count")])
}

/// The genre tag carried by the most movies; ties go to the alphabetically
/// first tag. `None` for a store without genres.
pub async fn most_common_genre<S>(store: &S) -> Result<Option<GenreCount>>
where
  S: CatalogStore,
{
  let pipeline = genre_counts_pipeline().limit(1);
  Ok(run(store, &pipeline).await?.into_iter().next())
}

// ─── 5. Shared filmography ───────────────────────────────────────────────────

/// Movies credited to both people. Credits are first collapsed to distinct
/// (movie, person) pairs so several roles in one movie count once.
pub fn shared_pipeline(first: &PersonId, second: &PersonId) -> Pipeline {
  let pair = Pipeline::new(Collection::Credits)
    .matching(Filter::is_in(fields::PERSON_ID, [first.as_str(), second.as_str()]))
    .stage(Stage::Group {
      key:          GroupKey::Fields(owned_pairs(&[
        ("movie", fields::MOVIE_ID),
        ("person", fields::PERSON_ID),
      ])),
      accumulators: Vec::new(),
    })
    .stage(Stage::Group {
      key:          GroupKey::Field("_id.movie".into()),
      accumulators: vec![("people".into(), Accumulator::Count)],
    })
    .matching(Filter::eq("people", 2));
  summarize_movies(pair, GROUP_KEY)
}

pub async fn shared_filmography<S>(store: &S, first: &str, second: &str) -> Result<Vec<MovieSummary>>
where
  S: CatalogStore,
{
  let (Some(a), Some(b)) = (resolve_by_name(store, first).await?, resolve_by_name(store, second).await?)
  else {
    return Ok(Vec::new());
  };
  if a == b {
    return Ok(Vec::new());
  }
  run(store, &shared_pipeline(&a, &b)).await
}

// ─── 6. Death-window × genre cohort ──────────────────────────────────────────

/// People who died within the window, with the acting credits whose movie
/// genre contains the substring. People without such a movie are absent.
pub fn death_cohort_pipeline(params: &CohortParams) -> Pipeline {
  Pipeline::new(Collection::People)
    .matching(Filter::between(
      fields::DEATH_YEAR,
      i64::from(params.start),
      i64::from(params.end),
    ))
    .lookup(Collection::Credits, fields::PERSON_ID, fields::PERSON_ID, "credit")
    .unwind("credit")
    .matching(Filter::is_in("credit.category", ACTING_CATEGORIES))
    .lookup(Collection::Movies, "credit.tconst", fields::MOVIE_ID, MOVIE)
    .unwind(MOVIE)
    .matching(Filter::contains_ignore_case("movie.genres", params.genre.as_str()))
    .sort(vec![SortKey::asc("movie.startYear"), SortKey::asc("movie.originalTitle")])
    .stage(Stage::Group {
      key:          GroupKey::Field(fields::PERSON_ID.into()),
      accumulators: vec![
        ("name".into(), Accumulator::First(fields::PERSON_NAME.into())),
        ("deathYear".into(), Accumulator::First(fields::DEATH_YEAR.into())),
        (
          "movies".into(),
          Accumulator::Push(owned_pairs(&[
            ("title", "movie.originalTitle"),
            ("year", "movie.startYear"),
          ])),
        ),
      ],
    })
    .sort(vec![SortKey::asc("name"), SortKey::asc(GROUP_KEY)])
    .project(&[("name", "name"), ("deathYear", "deathYear"), ("movies", "movies")])
}

pub async fn death_cohort<S>(store: &S, params: &CohortParams) -> Result<Vec<CohortMember>>
where
  S: CatalogStore,
{
  run(store, &death_cohort_pipeline(params)).await
}

// ─── Execution ───────────────────────────────────────────────────────────────

async fn run<S, T>(store: &S, pipeline: &Pipeline) -> Result<Vec<T>>
where
  S: CatalogStore,
  T: DeserializeOwned,
{
  let rows = pipeline.run(store).await.map_err(Error::store)?;
  decode(rows)
}

fn decode<T: DeserializeOwned>(rows: Vec<Document>) -> Result<Vec<T>> {
  rows
    .into_iter()
    .map(|row| serde_json::from_value(row.into()).map_err(Error::from))
    .collect()
}
