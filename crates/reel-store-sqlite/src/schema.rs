//! SQL schema for the Reel SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Tables; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Live collections. Documents are JSON objects holding every source column.
CREATE TABLE IF NOT EXISTS movies  (doc TEXT NOT NULL);
CREATE TABLE IF NOT EXISTS people  (doc TEXT NOT NULL);
CREATE TABLE IF NOT EXISTS credits (doc TEXT NOT NULL);

-- Staging copies filled batch by batch during a replace, then swapped in.
CREATE TABLE IF NOT EXISTS movies_staging  (doc TEXT NOT NULL);
CREATE TABLE IF NOT EXISTS people_staging  (doc TEXT NOT NULL);
CREATE TABLE IF NOT EXISTS credits_staging (doc TEXT NOT NULL);

CREATE TABLE IF NOT EXISTS collection_meta (
    collection  TEXT PRIMARY KEY,
    documents   INTEGER NOT NULL,
    loaded_at   TEXT NOT NULL     -- RFC 3339 UTC
);

PRAGMA user_version = 1;
";

/// Unique keys and join indexes. The staging tables carry the unique keys
/// too, so a duplicate fails the batch that introduces it.
pub const INDEXES: &str = "
CREATE UNIQUE INDEX IF NOT EXISTS movies_tconst_idx
    ON movies (json_extract(doc, '$.tconst'));
CREATE UNIQUE INDEX IF NOT EXISTS movies_staging_tconst_idx
    ON movies_staging (json_extract(doc, '$.tconst'));

CREATE UNIQUE INDEX IF NOT EXISTS people_nconst_idx
    ON people (json_extract(doc, '$.nconst'));
CREATE UNIQUE INDEX IF NOT EXISTS people_staging_nconst_idx
    ON people_staging (json_extract(doc, '$.nconst'));
CREATE INDEX IF NOT EXISTS people_name_idx
    ON people (json_extract(doc, '$.primaryName'));

CREATE INDEX IF NOT EXISTS credits_nconst_idx
    ON credits (json_extract(doc, '$.nconst'));
CREATE INDEX IF NOT EXISTS credits_tconst_idx
    ON credits (json_extract(doc, '$.tconst'));
";
