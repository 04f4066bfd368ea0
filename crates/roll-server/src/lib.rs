//! Server wiring for Roll.
//!
//! Loads [`ServerConfig`], builds the HTTP application around a
//! [`CachedStore`], and moves CSV tables in and out of a store.

use std::{io::Read, path::{Path, PathBuf}, sync::Arc, time::Duration};

use anyhow::Context as _;
use axum::Router;
use roll_api::{ReportSettings, api_router};
use roll_core::{
  attendance::{AttendanceFilter, DateRange},
  cache::CachedStore,
  names::NameIndex,
  store::RecordStore,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `roll.toml` and `ROLL_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:           String,
  pub port:           u16,
  pub store_path:     PathBuf,
  /// Lifetime of cached list snapshots.
  pub cache_ttl_secs: u64,
  #[serde(default)]
  pub reports:        ReportSettings,
}

impl ServerConfig {
  /// Layer `path` (optional) under the environment. Nested keys use `__`,
  /// e.g. `ROLL_REPORTS__REFERENCE_WINDOW__START=2024-03-01`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .set_default("host", "127.0.0.1")?
      .set_default("port", 8080)?
      .set_default("store_path", "roll.db")?
      .set_default("cache_ttl_secs", 30)?
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("ROLL")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .context("failed to read configuration")?;

    let cfg: ServerConfig = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;

    // Deserialising skips the ordering check.
    if let Some(window) = cfg.reports.reference_window {
      DateRange::new(window.start, window.end)
        .context("invalid reports.reference_window")?;
    }
    Ok(cfg)
  }

  pub fn cache_ttl(&self) -> Duration { Duration::from_secs(self.cache_ttl_secs) }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Application ──────────────────────────────────────────────────────────────

/// The full HTTP application: the JSON API under `/api`, with request
/// tracing.
pub fn app<S>(store: Arc<CachedStore<S>>, reports: ReportSettings) -> Router
where
  S: RecordStore + 'static,
{
  Router::new()
    .nest("/api", api_router(store, reports))
    .layer(TraceLayer::new_for_http())
}

// ─── CSV import / export ──────────────────────────────────────────────────────

/// Row counts from an import.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
  pub imported: usize,
  pub skipped:  usize,
}

/// Upsert every readable row of a children table. Rows with a `child_id`
/// update that child; the rest become new children. Bad rows are logged and
/// skipped.
pub async fn import_children<S: RecordStore>(
  store: &S,
  input: impl Read,
) -> anyhow::Result<ImportSummary> {
  let rows = roll_csv::read_children(input).context("failed to read children table")?;
  let mut summary = ImportSummary::default();

  for row in rows {
    let input = match row {
      Ok(input) => input,
      Err(e) => {
        tracing::warn!(error = %e, "skipping child row");
        summary.skipped += 1;
        continue;
      }
    };
    match store.upsert_child(input).await {
      Ok(_) => summary.imported += 1,
      Err(e) => {
        tracing::warn!(error = %e, "child rejected by store");
        summary.skipped += 1;
      }
    }
  }

  tracing::info!(imported = summary.imported, skipped = summary.skipped, "imported children");
  Ok(summary)
}

/// Upsert every readable row of an attendance table. Rows that name their
/// child are resolved against the current roster; ambiguous or unknown names
/// are skipped.
pub async fn import_attendance<S: RecordStore>(
  store: &S,
  input: impl Read,
) -> anyhow::Result<ImportSummary> {
  let rows = roll_csv::read_attendance(input).context("failed to read attendance table")?;
  let children = store.list_children().await.context("failed to list children")?;
  let index = NameIndex::build(&children);
  for (name, ids) in index.duplicates() {
    tracing::warn!(name, children = ids.len(), "name shared by several children");
  }

  let mut summary = ImportSummary::default();
  for row in rows {
    let input = match row.and_then(|r| r.resolve(&index)) {
      Ok(input) => input,
      Err(e) => {
        tracing::warn!(error = %e, "skipping attendance row");
        summary.skipped += 1;
        continue;
      }
    };
    match store.upsert_attendance(input).await {
      Ok(_) => summary.imported += 1,
      Err(e) => {
        tracing::warn!(error = %e, "attendance rejected by store");
        summary.skipped += 1;
      }
    }
  }

  tracing::info!(imported = summary.imported, skipped = summary.skipped, "imported attendance");
  Ok(summary)
}

pub async fn export_children<S: RecordStore>(
  store: &S,
  output: impl std::io::Write,
) -> anyhow::Result<()> {
  let children = store.list_children().await.context("failed to list children")?;
  roll_csv::write_children(output, &children)?;
  Ok(())
}

pub async fn export_attendance<S: RecordStore>(
  store: &S,
  output: impl std::io::Write,
) -> anyhow::Result<()> {
  let children = store.list_children().await.context("failed to list children")?;
  let rows = store
    .list_attendance(AttendanceFilter::all())
    .await
    .context("failed to list attendance")?;
  roll_csv::write_attendance(output, &children, &rows)?;
  Ok(())
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use roll_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  const CHILDREN: &str = "\
Full Name,Group/Class,Grade,Sponsored by OCM
Amani Wanjiru,Chosen Nation(grade 1–3),Grade 2,Yes
Baraka Otieno,,PP1,no
,Priesthood,,
";

  const ATTENDANCE: &str = "\
Child Name,Session Date,Attendance Status,Brought Bible
Amani Wanjiru,2024-03-03,Present,Yes
Baraka Otieno,2024-03-03,Absent,Yes
Nobody Known,2024-03-03,Present,No
";

  #[tokio::test]
  async fn legacy_tables_import_and_export() {
    let store = SqliteStore::open_in_memory().await.unwrap();

    let children = import_children(&store, CHILDREN.as_bytes()).await.unwrap();
    assert_eq!(children, ImportSummary { imported: 2, skipped: 1 });

    let attendance = import_attendance(&store, ATTENDANCE.as_bytes()).await.unwrap();
    assert_eq!(attendance, ImportSummary { imported: 2, skipped: 1 });

    let rows = store.list_attendance(AttendanceFilter::all()).await.unwrap();
    let absent = rows.iter().find(|r| !r.present).unwrap();
    assert!(!absent.flags.has_bible);

    let mut out = Vec::new();
    export_attendance(&store, &mut out).await.unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(text.contains("Amani Wanjiru"));

    // The export reads back without creating duplicates.
    let mut out = Vec::new();
    export_children(&store, &mut out).await.unwrap();
    import_children(&store, out.as_slice()).await.unwrap();
    assert_eq!(store.list_children().await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn app_serves_api_under_prefix() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let router = app(Arc::new(CachedStore::new(store)), ReportSettings::default());

    let req = Request::builder()
      .uri("/api/children")
      .body(Body::empty())
      .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[test]
  fn config_defaults_without_file() {
    let cfg = ServerConfig::load(Path::new("does-not-exist.toml")).unwrap();
    assert_eq!(cfg.cache_ttl(), Duration::from_secs(30));
    assert!(cfg.reports.reference_window.is_none());
  }
}
