//! Handlers for `/performance` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/performance` | Optional `?child_id` |
//! | `POST` | `/performance` | Body: [`NewPerformance`]; returns 201 |

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use roll_core::{
  performance::{NewPerformance, PerformanceRecord},
  store::RecordStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub child_id: Option<Uuid>,
}

/// `GET /performance[?child_id=<id>]`
pub async fn list<S: RecordStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<PerformanceRecord>>, ApiError> {
  let rows = state
    .store
    .list_performance(params.child_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rows))
}

/// `POST /performance`
pub async fn create<S: RecordStore>(
  State(state): State<ApiState<S>>,
  Json(input): Json<NewPerformance>,
) -> Result<impl IntoResponse, ApiError> {
  input.validate()?;
  if state
    .store
    .get_child(input.child_id)
    .await
    .map_err(ApiError::store)?
    .is_none()
  {
    return Err(roll_core::Error::ChildNotFound(input.child_id).into());
  }

  let record = state
    .store
    .record_performance(input)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(record)))
}
