//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::BTreeMap;

use reel_core::{
  document::Document,
  filter::Filter,
  model::{Collection, Credit, CreditCount, MovieSummary, Person},
  queries::{
    CohortParams, death_cohort, filmography_by_director, filmography_by_person,
    most_common_genre, shared_filmography, top_credited_people,
  },
  resolve::{resolve_all_by_name, resolve_by_name},
  store::CatalogStore,
};
use serde_json::{Value, json};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn docs(value: Value) -> Vec<Document> {
  serde_json::from_value(value).expect("array of objects")
}

fn movies() -> Vec<Document> {
  docs(json!([
    { "tconst": "tt1", "titleType": "movie", "originalTitle": "Harbor",  "startYear": 1990, "genres": "Action,Drama" },
    { "tconst": "tt2", "titleType": "movie", "originalTitle": "Meadow",  "startYear": 1985, "genres": "Comedy" },
    { "tconst": "tt3", "titleType": "movie", "originalTitle": "Undated", "startYear": null, "genres": "Action" },
    { "tconst": "tt4", "titleType": "movie", "originalTitle": "Skyline", "startYear": 1995, "genres": "action,Thriller" },
  ]))
}

fn people() -> Vec<Document> {
  docs(json!([
    { "nconst": "nm1", "primaryName": "Ava Stone",  "birthYear": 1930, "deathYear": 1998 },
    { "nconst": "nm2", "primaryName": "Ben Hale",   "birthYear": 1941, "deathYear": 2001 },
    { "nconst": "nm3", "primaryName": "Cleo Marsh", "birthYear": null, "deathYear": null },
    { "nconst": "nm4", "primaryName": "Dan Roe",    "birthYear": 1950, "deathYear": 1996 },
  ]))
}

fn credits() -> Vec<Document> {
  docs(json!([
    { "nconst": "nm1", "tconst": "tt1", "category": "actress" },
    { "nconst": "nm1", "tconst": "tt2", "category": "actress" },
    { "nconst": "nm1", "tconst": "tt3", "category": "actress" },
    { "nconst": "nm1", "tconst": "tt1", "category": "writer" },
    { "nconst": "nm2", "tconst": "tt1", "category": "actor" },
    { "nconst": "nm2", "tconst": "tt4", "category": "actor" },
    { "nconst": "nm3", "tconst": "tt4", "category": "director" },
    { "nconst": "nm3", "tconst": "tt2", "category": "director" },
    { "nconst": "nm3", "tconst": "tt9", "category": "director" },
    { "nconst": "nm4", "tconst": "tt2", "category": "actor" },
    { "nconst": "nm9", "tconst": "tt1", "category": "actor" },
  ]))
}

async fn catalog() -> SqliteStore {
  let s = store().await;
  s.bulk_replace(Collection::Movies, movies()).await.unwrap();
  s.bulk_replace(Collection::People, people()).await.unwrap();
  s.bulk_replace(Collection::Credits, credits()).await.unwrap();
  s
}

fn summary(title: &str, year: Option<i32>) -> MovieSummary {
  MovieSummary { title: Some(title.into()), year }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn bulk_replace_loads_every_document() {
  let s = store().await.with_batch_size(3);
  let n = s.bulk_replace(Collection::Credits, credits()).await.unwrap();
  assert_eq!(n, 11);
  assert_eq!(s.count(Collection::Credits).await.unwrap(), 11);
}

#[tokio::test]
async fn bulk_replace_is_idempotent() {
  let s = store().await.with_batch_size(2);
  s.bulk_replace(Collection::Movies, movies()).await.unwrap();
  s.bulk_replace(Collection::Movies, movies()).await.unwrap();
  assert_eq!(s.count(Collection::Movies).await.unwrap(), 4);
}

#[tokio::test]
async fn replace_keeps_every_column_and_load_order() {
  let s = catalog().await;
  let all = s.find(Collection::Movies, &Filter::All).await.unwrap();
  let ids: Vec<_> = all.iter().map(|d| d["tconst"].clone()).collect();
  assert_eq!(ids, [json!("tt1"), json!("tt2"), json!("tt3"), json!("tt4")]);
  assert_eq!(all[0]["titleType"], json!("movie"));
  assert_eq!(all[2]["startYear"], Value::Null);
}

#[tokio::test]
async fn duplicate_key_fails_and_keeps_previous_contents() {
  let s = store().await.with_batch_size(2);
  s.bulk_replace(Collection::People, people()).await.unwrap();

  let mut dupes = people();
  dupes.push(dupes[0].clone());
  let err = s.bulk_replace(Collection::People, dupes).await.unwrap_err();
  assert!(matches!(err, Error::DuplicateKey { collection: Collection::People, .. }));

  assert_eq!(s.count(Collection::People).await.unwrap(), 4);
  // Nothing left staged: a clean reload commits exactly its own rows.
  assert_eq!(s.commit_staged(Collection::People).await.unwrap(), 0);
}

#[tokio::test]
async fn credits_allow_repeated_pairs() {
  let s = store().await;
  let row = json!({ "nconst": "nm1", "tconst": "tt1", "category": "actor" });
  let n = s.bulk_replace(Collection::Credits, docs(json!([row, row]))).await.unwrap();
  assert_eq!(n, 2);
}

#[tokio::test]
async fn discarded_batches_never_go_live() {
  let s = catalog().await;
  s.stage_batch(Collection::Movies, docs(json!([{ "tconst": "tt99" }])))
    .await
    .unwrap();
  s.discard_staged(Collection::Movies).await.unwrap();
  assert_eq!(s.count(Collection::Movies).await.unwrap(), 4);
}

#[tokio::test]
async fn ensure_indexes_is_idempotent() {
  let s = catalog().await;
  s.ensure_indexes().await.unwrap();
  s.ensure_indexes().await.unwrap();
  assert_eq!(s.count(Collection::People).await.unwrap(), 4);
}

#[tokio::test]
async fn collection_stats_report_counts_and_load_time() {
  let s = store().await;
  let before = s.collection_stats().await.unwrap();
  assert!(before.iter().all(|c| c.documents == 0 && c.loaded_at.is_none()));

  s.bulk_replace(Collection::People, people()).await.unwrap();
  let after = s.collection_stats().await.unwrap();
  let people = after
    .iter()
    .find(|c| c.collection == Collection::People)
    .unwrap();
  assert_eq!(people.documents, 4);
  assert!(people.loaded_at.is_some());
  assert_eq!(after.len(), 3);
}

// ─── Reads ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn find_by_equality_and_null() {
  let s = catalog().await;
  let hits = s
    .find(Collection::People, &Filter::eq("primaryName", "Ben Hale"))
    .await
    .unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0]["nconst"], json!("nm2"));

  let alive = s
    .find(Collection::People, &Filter::eq("deathYear", Value::Null))
    .await
    .unwrap();
  assert_eq!(alive.len(), 1);
  assert_eq!(alive[0]["primaryName"], json!("Cleo Marsh"));
}

#[tokio::test]
async fn find_by_membership() {
  let s = catalog().await;
  let hits = s
    .find(Collection::Credits, &Filter::is_in("category", ["actor", "actress"]))
    .await
    .unwrap();
  assert_eq!(hits.len(), 7);
}

#[tokio::test]
async fn find_by_integer_range() {
  let s = catalog().await;
  let hits = s
    .find(Collection::People, &Filter::between("deathYear", 1995, 2000))
    .await
    .unwrap();
  let names: Vec<_> = hits.iter().map(|d| d["primaryName"].clone()).collect();
  assert_eq!(names, [json!("Ava Stone"), json!("Dan Roe")]);
}

#[tokio::test]
async fn find_by_substring_ignores_case() {
  let s = catalog().await;
  let hits = s
    .find(Collection::Movies, &Filter::contains_ignore_case("genres", "ACTION"))
    .await
    .unwrap();
  assert_eq!(hits.len(), 3);
}

#[tokio::test]
async fn find_by_conjunction() {
  let s = catalog().await;
  let filter = Filter::eq("nconst", "nm1").and(Filter::eq("category", "writer"));
  let hits = s.find(Collection::Credits, &filter).await.unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0]["tconst"], json!("tt1"));
}

#[tokio::test]
async fn find_rejects_unsafe_field_names() {
  let s = catalog().await;
  let err = s
    .find(Collection::Movies, &Filter::eq("x') OR ('1", 1))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidField(_)));
}

// ─── Resolution ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn resolution_prefers_the_lowest_identifier() {
  let s = store().await;
  s.bulk_replace(Collection::People, docs(json!([
    { "nconst": "nm7", "primaryName": "Sam Lee" },
    { "nconst": "nm5", "primaryName": "Sam Lee" },
  ])))
  .await
  .unwrap();

  let all = resolve_all_by_name(&s, "Sam Lee").await.unwrap();
  assert_eq!(all.iter().map(|p| p.as_str()).collect::<Vec<_>>(), ["nm5", "nm7"]);
  let picked = resolve_by_name(&s, "Sam Lee").await.unwrap();
  assert_eq!(picked.map(|p| p.0), Some("nm5".to_owned()));
  assert_eq!(resolve_by_name(&s, "sam lee").await.unwrap(), None);
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn top_credited_matches_a_direct_count() {
  let s = catalog().await;

  let people: Vec<Person> = people()
    .into_iter()
    .map(|d| serde_json::from_value(Value::Object(d)).unwrap())
    .collect();
  let mut expected: BTreeMap<String, u64> = BTreeMap::new();
  for credit in credits() {
    let credit: Credit = serde_json::from_value(Value::Object(credit)).unwrap();
    if !credit.is_acting() {
      continue;
    }
    if let Some(p) = people.iter().find(|p| p.nconst == credit.nconst) {
      *expected.entry(p.name.clone()).or_default() += 1;
    }
  }

  let top = top_credited_people(&s).await.unwrap();
  assert_eq!(top.len(), expected.len());
  for CreditCount { name, count } in &top {
    let name = name.as_deref().unwrap();
    assert_eq!(expected.get(name), Some(count), "{name}");
  }
  assert!(top.windows(2).all(|w| w[0].count >= w[1].count));
}

#[tokio::test]
async fn filmographies_follow_year_then_title() {
  let s = catalog().await;
  assert_eq!(filmography_by_person(&s, "Ava Stone").await.unwrap(), vec![
    summary("Meadow", Some(1985)),
    summary("Harbor", Some(1990)),
    summary("Harbor", Some(1990)),
    summary("Undated", None),
  ]);
  assert_eq!(filmography_by_director(&s, "Cleo Marsh").await.unwrap(), vec![
    summary("Meadow", Some(1985)),
    summary("Skyline", Some(1995)),
  ]);
  assert!(filmography_by_person(&s, "Nobody").await.unwrap().is_empty());
}

#[tokio::test]
async fn most_common_genre_over_sqlite() {
  let s = catalog().await;
  let top = most_common_genre(&s).await.unwrap().unwrap();
  assert_eq!(top.genre, "Action");
  assert_eq!(top.count, 2);
}

#[tokio::test]
async fn shared_filmography_over_sqlite() {
  let s = catalog().await;
  assert_eq!(
    shared_filmography(&s, "Ava Stone", "Ben Hale").await.unwrap(),
    vec![summary("Harbor", Some(1990))]
  );
  assert_eq!(
    shared_filmography(&s, "Ava Stone", "Cleo Marsh").await.unwrap(),
    vec![summary("Meadow", Some(1985))]
  );
}

#[tokio::test]
async fn death_cohort_over_sqlite() {
  let s = catalog().await;
  let cohort = death_cohort(&s, &CohortParams {
    start: 1995,
    end:   2000,
    genre: "action".into(),
  })
  .await
  .unwrap();
  assert_eq!(cohort.len(), 1);
  assert_eq!(cohort[0].name.as_deref(), Some("Ava Stone"));
  assert_eq!(cohort[0].death_year, Some(1998));
  assert_eq!(cohort[0].movies, vec![summary("Harbor", Some(1990)), summary("Undated", None)]);
}

#[tokio::test]
async fn null_titles_and_names_survive_the_round_trip() {
  let s = store().await;
  s.bulk_replace(Collection::Movies, docs(json!([
    { "tconst": "tt1", "originalTitle": null, "startYear": 1992, "genres": "Action" },
  ])))
  .await
  .unwrap();
  s.bulk_replace(Collection::People, docs(json!([
    { "nconst": "nm1", "primaryName": "Ava Stone", "deathYear": 1995 },
    { "nconst": "nm2", "primaryName": null,        "deathYear": 1996 },
  ])))
  .await
  .unwrap();
  s.bulk_replace(Collection::Credits, docs(json!([
    { "nconst": "nm1", "tconst": "tt1", "category": "actress" },
    { "nconst": "nm2", "tconst": "tt1", "category": "actor" },
    { "nconst": "nm2", "tconst": "tt1", "category": "actor" },
  ])))
  .await
  .unwrap();

  let untitled = MovieSummary { title: None, year: Some(1992) };
  assert_eq!(filmography_by_person(&s, "Ava Stone").await.unwrap(), vec![untitled.clone()]);

  let top = top_credited_people(&s).await.unwrap();
  assert_eq!(top, vec![
    CreditCount { name: None, count: 2 },
    CreditCount { name: Some("Ava Stone".into()), count: 1 },
  ]);

  let cohort = death_cohort(&s, &CohortParams {
    start: 1990,
    end:   2000,
    genre: "action".into(),
  })
  .await
  .unwrap();
  let names: Vec<_> = cohort.iter().map(|m| m.name.as_deref()).collect();
  assert_eq!(names, [Some("Ava Stone"), None]);
  assert_eq!(cohort[1].movies, vec![untitled]);
}

// ─── Connections ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn reads_beyond_the_pool_size_wait_their_turn() {
  let s = catalog().await;
  let tasks: Vec<_> = (0..3 * crate::DEFAULT_READERS)
    .map(|_| {
      let s = s.clone();
      tokio::spawn(async move {
        s.find(Collection::Credits, &Filter::is_in("category", ["actor", "actress"]))
          .await
      })
    })
    .collect();
  for task in tasks {
    assert_eq!(task.await.unwrap().unwrap().len(), 7);
  }
}

#[tokio::test]
async fn file_store_readers_see_committed_writes() {
  let dir = tempfile::TempDir::new().unwrap();
  let path = dir.path().join("reel.db");

  let s = SqliteStore::open_with_readers(&path, 2).await.unwrap();
  assert_eq!(s.count(Collection::People).await.unwrap(), 0);
  s.bulk_replace(Collection::People, people()).await.unwrap();
  assert_eq!(s.count(Collection::People).await.unwrap(), 4);
  drop(s);

  let reopened = SqliteStore::open(&path).await.unwrap();
  let hits = reopened
    .find(Collection::People, &Filter::eq("primaryName", "Dan Roe"))
    .await
    .unwrap();
  assert_eq!(hits[0]["nconst"], json!("nm4"));
}
