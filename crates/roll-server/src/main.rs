//! roll server binary.
//!
//! Reads `roll.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and either serves the JSON API over HTTP or
//! moves CSV tables in and out of the store.

use std::{
  fs::File,
  io::{self, BufReader, BufWriter, Write as _},
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use roll_core::cache::CachedStore;
use roll_server::ServerConfig;
use roll_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Roll attendance register")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "roll.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the JSON API (the default).
  Serve,
  /// Load a CSV table into the store.
  Import {
    table: Table,
    /// CSV file to read.
    file:  PathBuf,
  },
  /// Write a CSV table from the store.
  Export {
    table:  Table,
    /// Output file; stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
}

#[derive(Clone, Copy, ValueEnum)]
enum Table {
  Children,
  Attendance,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = ServerConfig::load(&cli.config)?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(store, cfg).await,
    Command::Import { table, file } => {
      let reader = BufReader::new(
        File::open(&file).with_context(|| format!("failed to open {file:?}"))?,
      );
      let summary = match table {
        Table::Children => roll_server::import_children(&store, reader).await?,
        Table::Attendance => roll_server::import_attendance(&store, reader).await?,
      };
      eprintln!("imported {}, skipped {}", summary.imported, summary.skipped);
      Ok(())
    }
    Command::Export { table, output } => {
      let mut out: Box<dyn io::Write> = match &output {
        Some(path) => Box::new(BufWriter::new(
          File::create(path).with_context(|| format!("failed to create {path:?}"))?,
        )),
        None => Box::new(io::stdout().lock()),
      };
      match table {
        Table::Children => roll_server::export_children(&store, &mut out).await?,
        Table::Attendance => roll_server::export_attendance(&store, &mut out).await?,
      }
      out.flush()?;
      Ok(())
    }
  }
}

async fn serve(store: SqliteStore, cfg: ServerConfig) -> anyhow::Result<()> {
  let store = Arc::new(CachedStore::with_ttl(store, cfg.cache_ttl()));
  tracing::info!(ttl_secs = store.ttl().as_secs(), "snapshot cache enabled");
  let app = roll_server::app(store, cfg.reports.clone());
  let address = cfg.address();

  match cfg.reports.reference_window {
    Some(w) => tracing::info!(start = %w.start, end = %w.end, "reference window"),
    None => tracing::info!("no reference window; first-attendance reports disabled"),
  }

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
