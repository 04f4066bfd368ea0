//! Handlers for `/attendance` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/attendance` | Optional `session_date`, `child_id`, `from` + `to` |
//! | `POST` | `/attendance` | Body: list of [`AttendanceInput`]; upserts each |
//! | `GET`  | `/attendance/export` | Same filters as `GET`; `text/csv` |

use std::collections::HashSet;

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
  http::header,
  response::IntoResponse,
};
use chrono::NaiveDate;
use roll_core::{
  attendance::{AttendanceFilter, AttendanceInput, AttendanceRecord, DateRange},
  store::RecordStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

// ─── Filters ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub session_date: Option<NaiveDate>,
  pub child_id:     Option<Uuid>,
  /// Inclusive start of a date range; requires `to`.
  pub from:         Option<NaiveDate>,
  /// Inclusive end of a date range; requires `from`.
  pub to:           Option<NaiveDate>,
}

impl ListParams {
  pub fn filter(&self) -> Result<AttendanceFilter, ApiError> {
    let date_range = match (self.from, self.to) {
      (None, None) => None,
      (Some(from), Some(to)) => Some(DateRange::new(from, to)?),
      _ => {
        return Err(ApiError::BadRequest(
          "`from` and `to` must be given together".into(),
        ));
      }
    };
    Ok(AttendanceFilter {
      session_date: self.session_date,
      child_id: self.child_id,
      date_range,
    })
  }
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /attendance[?session_date=...][&child_id=...][&from=...&to=...]`
pub async fn list<S: RecordStore>(
  State(state): State<ApiState<S>>,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError> {
  let Query(params) = params?;
  let rows = state
    .store
    .list_attendance(params.filter()?)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rows))
}

// ─── Record ───────────────────────────────────────────────────────────────────

/// `POST /attendance` with body `[{"child_id": ..., "session_date": ..., "present": true}]`
///
/// Every child is checked before anything is written, so a batch naming an
/// unknown child writes nothing. Rows for the same child and date replace
/// each other; the last one in the batch wins.
pub async fn record<S: RecordStore>(
  State(state): State<ApiState<S>>,
  Json(batch): Json<Vec<AttendanceInput>>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError> {
  let known: HashSet<Uuid> = state
    .store
    .list_children()
    .await
    .map_err(ApiError::store)?
    .into_iter()
    .map(|c| c.child_id)
    .collect();
  if let Some(missing) = batch.iter().find(|i| !known.contains(&i.child_id)) {
    return Err(roll_core::Error::ChildNotFound(missing.child_id).into());
  }

  let mut saved = Vec::with_capacity(batch.len());
  for input in batch {
    saved.push(
      state
        .store
        .upsert_attendance(input)
        .await
        .map_err(ApiError::store)?,
    );
  }

  tracing::info!(rows = saved.len(), "recorded attendance");
  Ok(Json(saved))
}

// ─── Export ───────────────────────────────────────────────────────────────────

/// `GET /attendance/export`: the filtered rows as CSV with child names.
pub async fn export<S: RecordStore>(
  State(state): State<ApiState<S>>,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let Query(params) = params?;
  let filter = params.filter()?;
  let children = state.store.list_children().await.map_err(ApiError::store)?;
  let rows = state
    .store
    .list_attendance(filter)
    .await
    .map_err(ApiError::store)?;

  let mut body = Vec::new();
  roll_csv::write_attendance(&mut body, &children, &rows)
    .map_err(ApiError::store)?;

  Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], body))
}
