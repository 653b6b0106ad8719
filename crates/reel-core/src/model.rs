//! Catalog entities, typed identifiers, and query result records.
//!
//! Documents keep every source column; the structs here are typed views
//! over the columns the queries rely on. Relationships between collections
//! are by identifier only and are never enforced: a [`Credit`] may point at
//! a movie or person that does not exist.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::document::as_integer;

// ─── Collections ─────────────────────────────────────────────────────────────

/// The three document collections in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
  Movies,
  People,
  Credits,
}

impl Collection {
  pub const ALL: [Collection; 3] =
    [Collection::Movies, Collection::People, Collection::Credits];

  pub fn name(self) -> &'static str {
    match self {
      Self::Movies => "movies",
      Self::People => "people",
      Self::Credits => "credits",
    }
  }

  /// The field carrying the collection's unique identifier, if it has one.
  /// Credits have no primary key.
  pub fn key_field(self) -> Option<&'static str> {
    match self {
      Self::Movies => Some(fields::MOVIE_ID),
      Self::People => Some(fields::PERSON_ID),
      Self::Credits => None,
    }
  }
}

impl fmt::Display for Collection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Source column names, as they appear in the IMDb dataset headers.
pub mod fields {
  pub const MOVIE_ID: &str = "tconst";
  pub const TITLE: &str = "originalTitle";
  pub const PRIMARY_TITLE: &str = "primaryTitle";
  pub const START_YEAR: &str = "startYear";
  pub const GENRES: &str = "genres";

  pub const PERSON_ID: &str = "nconst";
  pub const PERSON_NAME: &str = "primaryName";
  pub const BIRTH_YEAR: &str = "birthYear";
  pub const DEATH_YEAR: &str = "deathYear";

  pub const CATEGORY: &str = "category";
}

/// Role categories that count as acting credits.
pub const ACTING_CATEGORIES: [&str; 2] = ["actor", "actress"];

pub const DIRECTOR_CATEGORY: &str = "director";

/// Delimiter of the multi-valued `genres` field.
pub const GENRE_DELIMITER: &str = ",";

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// A movie identifier (`tconst`, e.g. `tt0111161`).
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MovieId(pub String);

/// A person identifier (`nconst`, e.g. `nm0000136`).
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PersonId(pub String);

impl MovieId {
  pub fn as_str(&self) -> &str { &self.0 }
}

impl PersonId {
  pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&str> for MovieId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<&str> for PersonId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl fmt::Display for MovieId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl fmt::Display for PersonId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── Years ───────────────────────────────────────────────────────────────────

/// A calendar year; `None` when the source has no value.
pub type Year = Option<i32>;

/// Lenient year decoding: integers, numeric text, and anything else as
/// `None`. Years are loaded as integers, but a store filled without integer
/// coercion still decodes.
pub fn deserialize_year<'de, D>(deserializer: D) -> Result<Year, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(
    value
      .as_ref()
      .and_then(as_integer)
      .and_then(|y| i32::try_from(y).ok()),
  )
}

// ─── Entities ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
  pub tconst:         MovieId,
  #[serde(rename = "originalTitle")]
  pub title:          Option<String>,
  #[serde(rename = "startYear", default, deserialize_with = "deserialize_year")]
  pub year:           Year,
  /// Comma-delimited genre tags, e.g. `"Action,Drama"`.
  pub genres:         Option<String>,
}

impl Movie {
  /// The individual genre tags.
  pub fn genre_list(&self) -> Vec<&str> {
    self
      .genres
      .as_deref()
      .map(split_genres)
      .unwrap_or_default()
  }
}

/// Split a delimited genre field into its tags, dropping empty entries.
pub fn split_genres(genres: &str) -> Vec<&str> {
  genres
    .split(GENRE_DELIMITER)
    .map(str::trim)
    .filter(|g| !g.is_empty())
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
  pub nconst:     PersonId,
  #[serde(rename = "primaryName")]
  pub name:       String,
  #[serde(rename = "birthYear", default, deserialize_with = "deserialize_year")]
  pub birth_year: Year,
  /// `None` means alive or unknown.
  #[serde(rename = "deathYear", default, deserialize_with = "deserialize_year")]
  pub death_year: Year,
}

/// One (person, movie, category) fact. A person holding two categories in
/// the same movie has two credits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credit {
  pub nconst:   PersonId,
  pub tconst:   MovieId,
  pub category: String,
}

impl Credit {
  pub fn is_acting(&self) -> bool {
    ACTING_CATEGORIES.contains(&self.category.as_str())
  }
}

// ─── Query results ───────────────────────────────────────────────────────────

/// A person and their number of acting credits. `name` is `None` when the
/// person's record has no primary name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCount {
  pub name:  Option<String>,
  pub count: u64,
}

/// A movie reduced to its title and release year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieSummary {
  pub title: Option<String>,
  #[serde(default, deserialize_with = "deserialize_year")]
  pub year:  Year,
}

/// A genre tag and the number of movies carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreCount {
  pub genre: String,
  pub count: u64,
}

/// A person from a death-window cohort with their matching movies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortMember {
  pub name:       Option<String>,
  #[serde(default, deserialize_with = "deserialize_year")]
  pub death_year: Year,
  pub movies:     Vec<MovieSummary>,
}
