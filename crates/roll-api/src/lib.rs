//! JSON REST API for Roll.
//!
//! Exposes an axum [`Router`] backed by any [`roll_core::store::RecordStore`]
//! wrapped in a [`CachedStore`]. TLS and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", roll_api::api_router(store.clone(), settings))
//! ```

pub mod attendance;
pub mod children;
pub mod error;
pub mod performance;
pub mod reports;

use std::sync::Arc;

use axum::{
  Router,
  extract::State,
  http::StatusCode,
  routing::{get, post},
};
use roll_core::{attendance::DateRange, cache::CachedStore, store::RecordStore};
use serde::Deserialize;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Report options, deserialised from the `[reports]` config table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportSettings {
  /// Children present inside this window count as pre-existing in
  /// first-attendance reports. Without it those reports return 400.
  #[serde(default)]
  pub reference_window: Option<DateRange>,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct ApiState<S> {
  pub store:   Arc<CachedStore<S>>,
  pub reports: Arc<ReportSettings>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:   Arc::clone(&self.store),
      reports: Arc::clone(&self.reports),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<CachedStore<S>>, reports: ReportSettings) -> Router<()>
where
  S: RecordStore + 'static,
{
  let state = ApiState { store, reports: Arc::new(reports) };

  Router::new()
    // Children
    .route("/children", get(children::list::<S>).post(children::create::<S>))
    .route(
      "/children/{id}",
      get(children::get_one::<S>)
        .put(children::put_one::<S>)
        .delete(children::delete_one::<S>),
    )
    // Attendance
    .route("/attendance", get(attendance::list::<S>).post(attendance::record::<S>))
    .route("/attendance/export", get(attendance::export::<S>))
    // Performance
    .route("/performance", get(performance::list::<S>).post(performance::create::<S>))
    // Reports
    .route("/reports/daily", get(reports::daily::<S>))
    .route("/reports/classes", get(reports::classes::<S>))
    .route("/reports/sponsored", get(reports::sponsored::<S>))
    .route("/reports/monthly", get(reports::monthly::<S>))
    .route("/reports/period", get(reports::period::<S>))
    .route("/reports/children/{id}", get(reports::child::<S>))
    .route(
      "/reports/children/{id}/first-attendance",
      get(reports::first_attendance::<S>),
    )
    .route("/reports/first-attendance", get(reports::first_attendance_all::<S>))
    .route("/reports/performance", get(reports::performance::<S>))
    // Cache
    .route("/refresh", post(refresh::<S>))
    .with_state(state)
}

/// `POST /refresh`: drop every cached snapshot so the next read goes to the
/// store.
async fn refresh<S: RecordStore>(State(state): State<ApiState<S>>) -> StatusCode {
  let dropped = state.store.cached_snapshots();
  state.store.refresh();
  tracing::info!(dropped, "snapshot cache cleared");
  StatusCode::NO_CONTENT
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, header},
    response::Response,
  };
  use chrono::NaiveDate;
  use roll_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use super::*;

  async fn make_store() -> Arc<CachedStore<SqliteStore>> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    Arc::new(CachedStore::new(store))
  }

  fn window() -> ReportSettings {
    ReportSettings {
      reference_window: Some(
        DateRange::new(
          NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
          NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
        )
        .unwrap(),
      ),
    }
  }

  async fn send(
    store: &Arc<CachedStore<SqliteStore>>,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> Response {
    send_with(store, ReportSettings::default(), method, uri, body).await
  }

  async fn send_with(
    store:    &Arc<CachedStore<SqliteStore>>,
    settings: ReportSettings,
    method:   &str,
    uri:      &str,
    body:     Option<Value>,
  ) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
      Some(v) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(v.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    api_router(store.clone(), settings).oneshot(req).await.unwrap()
  }

  async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  async fn add_child(
    store: &Arc<CachedStore<SqliteStore>>,
    name: &str,
    class: &str,
    sponsored: bool,
  ) -> Uuid {
    let resp = send(
      store,
      "POST",
      "/children",
      Some(json!({ "full_name": name, "class_group": class, "sponsored": sponsored })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    body["child_id"].as_str().unwrap().parse().unwrap()
  }

  // ── Children ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_get_and_list_children() {
    let store = make_store().await;
    let id = add_child(&store, "Amani", "chosen_nation", false).await;

    let resp = send(&store, "GET", &format!("/children/{id}"), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["full_name"], "Amani");

    let resp = send(&store, "GET", "/children", None).await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn blank_name_is_bad_request() {
    let store = make_store().await;
    let resp = send(
      &store,
      "POST",
      "/children",
      Some(json!({ "full_name": "  ", "class_group": "priesthood" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(resp).await["error"].is_string());
  }

  #[tokio::test]
  async fn put_updates_under_path_id() {
    let store = make_store().await;
    let id = add_child(&store, "Amani", "chosen_nation", false).await;

    let resp = send(
      &store,
      "PUT",
      &format!("/children/{id}"),
      Some(json!({ "full_name": "Amani W.", "class_group": "priesthood" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["child_id"], id.to_string());
    assert_eq!(body["class_group"], "priesthood");
  }

  #[tokio::test]
  async fn delete_child_then_404() {
    let store = make_store().await;
    let id = add_child(&store, "Amani", "chosen_nation", false).await;

    let resp = send(&store, "DELETE", &format!("/children/{id}"), None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = send(&store, "DELETE", &format!("/children/{id}"), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = send(&store, "GET", &format!("/children/{id}"), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Attendance ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn record_and_filter_attendance() {
    let store = make_store().await;
    let a = add_child(&store, "Amani", "chosen_nation", false).await;
    let b = add_child(&store, "Baraka", "chosen_nation", false).await;

    let resp = send(
      &store,
      "POST",
      "/attendance",
      Some(json!([
        { "child_id": a, "session_date": "2024-03-03", "present": true,
          "flags": { "has_bible": true } },
        { "child_id": b, "session_date": "2024-03-03", "present": false },
        { "child_id": a, "session_date": "2024-03-10", "present": true },
      ])),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 3);

    let resp = send(&store, "GET", "/attendance?session_date=2024-03-03", None).await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 2);

    let resp = send(&store, "GET", &format!("/attendance?child_id={a}"), None).await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 2);

    let resp = send(&store, "GET", "/attendance?from=2024-03-04", None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn batch_with_unknown_child_writes_nothing() {
    let store = make_store().await;
    let a = add_child(&store, "Amani", "chosen_nation", false).await;

    let resp = send(
      &store,
      "POST",
      "/attendance",
      Some(json!([
        { "child_id": a, "session_date": "2024-03-03", "present": true },
        { "child_id": Uuid::new_v4(), "session_date": "2024-03-03", "present": true },
      ])),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(&store, "GET", "/attendance", None).await;
    assert!(json_body(resp).await.as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn export_is_csv_with_names() {
    let store = make_store().await;
    let a = add_child(&store, "Amani", "chosen_nation", false).await;
    send(
      &store,
      "POST",
      "/attendance",
      Some(json!([{ "child_id": a, "session_date": "2024-03-03", "present": true }])),
    )
    .await;

    let resp = send(&store, "GET", "/attendance/export", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
      resp.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv")
    );
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.starts_with("child_id,full_name,session_date"));
    assert!(text.contains(",Amani,2024-03-03,yes,"));
  }

  // ── Reports ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn daily_class_and_sponsored_reports() {
    let store = make_store().await;
    let a = add_child(&store, "Amani", "chosen_nation", true).await;
    let b = add_child(&store, "Baraka", "chosen_nation", false).await;
    let _c = add_child(&store, "Chebet", "priesthood", true).await;
    send(
      &store,
      "POST",
      "/attendance",
      Some(json!([
        { "child_id": a, "session_date": "2024-03-03", "present": true,
          "flags": { "early": true } },
        { "child_id": b, "session_date": "2024-03-03", "present": true },
      ])),
    )
    .await;

    let daily = json_body(send(&store, "GET", "/reports/daily?date=2024-03-03", None).await).await;
    assert_eq!(daily["total_children"], 3);
    assert_eq!(daily["present_count"], 2);
    assert_eq!(daily["absent_count"], 1);
    assert_eq!(daily["flag_counts"]["early"], 1);
    assert_eq!(daily["flag_rates"]["early"], 50.0);

    let classes =
      json_body(send(&store, "GET", "/reports/classes?date=2024-03-03", None).await).await;
    assert_eq!(classes.as_object().unwrap().len(), 5);
    assert_eq!(classes["chosen_nation"]["present_count"], 2);
    assert_eq!(classes["priesthood"]["attendance_rate"], 0.0);

    let sponsored =
      json_body(send(&store, "GET", "/reports/sponsored?date=2024-03-03", None).await).await;
    assert_eq!(sponsored["total_children"], 2);
    assert_eq!(sponsored["present_count"], 1);
  }

  #[tokio::test]
  async fn child_report_is_null_for_unknown_child() {
    let store = make_store().await;
    let resp = send(&store, "GET", &format!("/reports/children/{}", Uuid::new_v4()), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(json_body(resp).await.is_null());
  }

  #[tokio::test]
  async fn monthly_and_period_reports() {
    let store = make_store().await;
    let a = add_child(&store, "Amani", "chosen_nation", false).await;
    send(
      &store,
      "POST",
      "/attendance",
      Some(json!([
        { "child_id": a, "session_date": "2024-03-03", "present": true },
        { "child_id": a, "session_date": "2024-03-10", "present": false },
        { "child_id": a, "session_date": "2024-04-07", "present": true },
      ])),
    )
    .await;

    let month =
      json_body(send(&store, "GET", "/reports/monthly?year=2024&month=3", None).await).await;
    assert_eq!(month["session_dates"], json!(["2024-03-03", "2024-03-10"]));
    assert_eq!(month["mean_attendance_rate"], 50.0);

    let bad = json_body(send(&store, "GET", "/reports/monthly?year=2024&month=13", None).await).await;
    assert!(bad["range"].is_null());
    assert!(bad["per_session"].as_array().unwrap().is_empty());

    let period = json_body(
      send(&store, "GET", "/reports/period?from=2024-03-01&to=2024-04-30", None).await,
    )
    .await;
    assert_eq!(period["per_session"].as_array().unwrap().len(), 3);

    let resp = send(&store, "GET", "/reports/period?from=2024-04-30&to=2024-03-01", None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn malformed_query_is_a_json_bad_request() {
    let store = make_store().await;
    for uri in [
      "/reports/daily",
      "/reports/daily?date=03/03/2024",
      "/reports/monthly?year=2024",
      "/reports/performance?year=2024&term=term9",
      "/attendance?child_id=not-a-uuid",
    ] {
      let resp = send(&store, "GET", uri, None).await;
      assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
      assert!(json_body(resp).await["error"].is_string(), "{uri}");
    }
  }

  #[tokio::test]
  async fn first_attendance_needs_a_window() {
    let store = make_store().await;
    let a = add_child(&store, "Amani", "chosen_nation", false).await;
    send(
      &store,
      "POST",
      "/attendance",
      Some(json!([
        { "child_id": a, "session_date": "2024-03-03", "present": true },
        { "child_id": a, "session_date": "2024-05-05", "present": false },
      ])),
    )
    .await;
    let uri = format!("/reports/children/{a}/first-attendance");

    let resp = send(&store, "GET", &uri, None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send_with(&store, window(), "GET", &uri, None).await;
    let body = json_body(resp).await;
    assert_eq!(body["cohort"], "pre_existing");
    assert_eq!(body["available_sessions"], 2);
    assert_eq!(body["attendance_rate"], 50.0);

    let resp = send_with(&store, window(), "GET", "/reports/first-attendance", None).await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn performance_record_and_summary() {
    let store = make_store().await;
    let a = add_child(&store, "Amani", "chosen_nation", false).await;

    let resp = send(
      &store,
      "POST",
      "/performance",
      Some(json!({
        "child_id": a, "year": 2024, "term": "term1",
        "scores": { "mathematics": 80, "english": 60, "kiswahili": 70,
                    "science": 90, "social_studies": 50, "religious_education": 70 }
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(
      &store,
      "POST",
      "/performance",
      Some(json!({
        "child_id": Uuid::new_v4(), "year": 2024, "term": "term1",
        "scores": { "mathematics": 1, "english": 1, "kiswahili": 1,
                    "science": 1, "social_studies": 1, "religious_education": 1 }
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let summary = json_body(
      send(&store, "GET", "/reports/performance?year=2024&term=term1", None).await,
    )
    .await;
    assert_eq!(summary["record_count"], 1);
    assert_eq!(summary["subject_averages"]["mathematics"], 80.0);
    assert_eq!(summary["overall_average"], 70.0);
  }

  // ── Cache ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn refresh_clears_snapshots() {
    let store = make_store().await;
    send(&store, "GET", "/children", None).await;
    assert_eq!(store.cached_snapshots(), 1);

    let resp = send(&store, "POST", "/refresh", None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(store.cached_snapshots(), 0);
  }
}
