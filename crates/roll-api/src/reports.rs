//! Handlers for `/reports` endpoints.
//!
//! Each handler loads the snapshot it needs through the cached store and
//! hands it to the pure aggregator in [`roll_core::report`] or
//! [`roll_core::cohort`].
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/reports/daily` | `?date` |
//! | `GET`  | `/reports/classes` | `?date`; all five class groups |
//! | `GET`  | `/reports/sponsored` | `?date` |
//! | `GET`  | `/reports/monthly` | `?year&month` |
//! | `GET`  | `/reports/period` | `?from&to` |
//! | `GET`  | `/reports/children/:id` | `null` for an unknown child |
//! | `GET`  | `/reports/children/:id/first-attendance` | Needs a reference window |
//! | `GET`  | `/reports/first-attendance` | Every child, by name |
//! | `GET`  | `/reports/performance` | `?year&term` |

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Path, Query, State, rejection::QueryRejection},
};
use chrono::NaiveDate;
use roll_core::{
  attendance::{AttendanceFilter, AttendanceRecord, DateRange},
  child::{Child, ClassGroup},
  cohort::{self, FirstAttendance},
  performance::Term,
  report::{self, ChildProfile, DailySummary, PerformanceSummary, PeriodSummary},
  store::RecordStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

async fn snapshot<S: RecordStore>(
  state: &ApiState<S>,
  filter: AttendanceFilter,
) -> Result<(Vec<Child>, Vec<AttendanceRecord>), ApiError> {
  let children = state.store.list_children().await.map_err(ApiError::store)?;
  let attendance = state
    .store
    .list_attendance(filter)
    .await
    .map_err(ApiError::store)?;
  Ok((children, attendance))
}

fn reference_window<S>(state: &ApiState<S>) -> Result<DateRange, ApiError> {
  state.reports.reference_window.ok_or_else(|| {
    ApiError::BadRequest("no reference window is configured".into())
  })
}

// ─── Single session ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DateParams {
  pub date: NaiveDate,
}

/// `GET /reports/daily?date=YYYY-MM-DD`
pub async fn daily<S: RecordStore>(
  State(state): State<ApiState<S>>,
  params: Result<Query<DateParams>, QueryRejection>,
) -> Result<Json<DailySummary>, ApiError> {
  let Query(params) = params?;
  let (children, attendance) =
    snapshot(&state, AttendanceFilter::on(params.date)).await?;
  Ok(Json(report::daily_summary(&children, &attendance, params.date)))
}

/// `GET /reports/classes?date=YYYY-MM-DD`
pub async fn classes<S: RecordStore>(
  State(state): State<ApiState<S>>,
  params: Result<Query<DateParams>, QueryRejection>,
) -> Result<Json<BTreeMap<ClassGroup, DailySummary>>, ApiError> {
  let Query(params) = params?;
  let (children, attendance) =
    snapshot(&state, AttendanceFilter::on(params.date)).await?;
  Ok(Json(report::class_breakdown(&children, &attendance, params.date)))
}

/// `GET /reports/sponsored?date=YYYY-MM-DD`
pub async fn sponsored<S: RecordStore>(
  State(state): State<ApiState<S>>,
  params: Result<Query<DateParams>, QueryRejection>,
) -> Result<Json<DailySummary>, ApiError> {
  let Query(params) = params?;
  let (children, attendance) =
    snapshot(&state, AttendanceFilter::on(params.date)).await?;
  Ok(Json(report::sponsored_breakdown(&children, &attendance, params.date)))
}

// ─── Periods ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MonthParams {
  pub year:  i32,
  pub month: u32,
}

/// `GET /reports/monthly?year=2024&month=3`. An invalid month yields an
/// empty summary with a `null` range.
pub async fn monthly<S: RecordStore>(
  State(state): State<ApiState<S>>,
  params: Result<Query<MonthParams>, QueryRejection>,
) -> Result<Json<PeriodSummary>, ApiError> {
  let Query(params) = params?;
  let Some(range) = DateRange::month(params.year, params.month) else {
    return Ok(Json(report::monthly_summary(&[], &[], params.year, params.month)));
  };
  let (children, attendance) =
    snapshot(&state, AttendanceFilter::within(range)).await?;
  Ok(Json(report::monthly_summary(
    &children,
    &attendance,
    params.year,
    params.month,
  )))
}

#[derive(Debug, Deserialize)]
pub struct RangeParams {
  pub from: NaiveDate,
  pub to:   NaiveDate,
}

/// `GET /reports/period?from=YYYY-MM-DD&to=YYYY-MM-DD`
pub async fn period<S: RecordStore>(
  State(state): State<ApiState<S>>,
  params: Result<Query<RangeParams>, QueryRejection>,
) -> Result<Json<PeriodSummary>, ApiError> {
  let Query(params) = params?;
  let range = DateRange::new(params.from, params.to)?;
  let (children, attendance) =
    snapshot(&state, AttendanceFilter::within(range)).await?;
  Ok(Json(report::period_summary(&children, &attendance, range)))
}

// ─── Per child ───────────────────────────────────────────────────────────────

/// `GET /reports/children/:id`
pub async fn child<S: RecordStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Option<ChildProfile>>, ApiError> {
  let (children, attendance) =
    snapshot(&state, AttendanceFilter::for_child(id)).await?;
  Ok(Json(report::child_profile(&children, &attendance, id)))
}

/// `GET /reports/children/:id/first-attendance`
pub async fn first_attendance<S: RecordStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Option<FirstAttendance>>, ApiError> {
  let window = reference_window(&state)?;
  // Session dates come from every child's rows.
  let (children, attendance) = snapshot(&state, AttendanceFilter::all()).await?;
  Ok(Json(cohort::first_attendance_tracking(
    &children,
    &attendance,
    id,
    window,
  )))
}

/// `GET /reports/first-attendance`
pub async fn first_attendance_all<S: RecordStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<FirstAttendance>>, ApiError> {
  let window = reference_window(&state)?;
  let (children, attendance) = snapshot(&state, AttendanceFilter::all()).await?;
  Ok(Json(cohort::first_attendance_report(&children, &attendance, window)))
}

// ─── Performance ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TermParams {
  pub year: i32,
  pub term: Term,
}

/// `GET /reports/performance?year=2024&term=term1`
pub async fn performance<S: RecordStore>(
  State(state): State<ApiState<S>>,
  params: Result<Query<TermParams>, QueryRejection>,
) -> Result<Json<PerformanceSummary>, ApiError> {
  let Query(params) = params?;
  let records = state
    .store
    .list_performance(None)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(report::performance_summary(&records, params.year, params.term)))
}
