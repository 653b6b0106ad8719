//! `reel` binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered with
//! `REEL_*` environment variables, opens the SQLite catalog, and either loads
//! the IMDb dumps (`reel ingest`) or serves the query API (`reel serve`).

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use reel_core::dispatch::Dispatcher;
use reel_server::{DataFiles, ServerConfig, ingest};
use reel_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Reel movie catalog")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the query API over HTTP.
  Serve,
  /// Replace the catalog with the contents of the TSV dumps.
  Ingest {
    /// Movies file (title.basics.tsv).
    #[arg(long)]
    movies:  Option<PathBuf>,
    /// People file (name.basics.tsv).
    #[arg(long)]
    people:  Option<PathBuf>,
    /// Credits file (title.principals.tsv).
    #[arg(long)]
    credits: Option<PathBuf>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("REEL")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read config file")?;

  let cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open_with_readers(&store_path, cfg.read_connections)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?
    .with_batch_size(cfg.batch_size);

  match cli.command {
    Command::Serve => serve(store, &cfg).await,
    Command::Ingest { movies, people, credits } => {
      let data = DataFiles {
        movies:  expand_tilde(movies.as_deref().unwrap_or(cfg.data.movies.as_path())),
        people:  expand_tilde(people.as_deref().unwrap_or(cfg.data.people.as_path())),
        credits: expand_tilde(credits.as_deref().unwrap_or(cfg.data.credits.as_path())),
      };
      ingest::ingest_all(&store, &data, &cfg.tsv_options())
        .await
        .context("ingestion failed")?;
      Ok(())
    }
  }
}

async fn serve(store: SqliteStore, cfg: &ServerConfig) -> anyhow::Result<()> {
  let dispatcher = Dispatcher::new(Arc::new(store))
    .with_timeout(cfg.query_timeout())
    .with_unknown_query_policy(cfg.unknown_query);

  let app = reel_api::api_router(Arc::new(dispatcher));
  let address = format!("{}:{}", cfg.host, cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
