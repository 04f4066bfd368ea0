//! Handlers for `/children` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/children` | Ordered by name |
//! | `POST`   | `/children` | Body: [`ChildInput`]; returns 201 + stored child |
//! | `GET`    | `/children/:id` | 404 if not found |
//! | `PUT`    | `/children/:id` | Body: [`ChildInput`]; upsert under `id` |
//! | `DELETE` | `/children/:id` | 204, or 404 if not found |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use roll_core::{
  child::{Child, ChildInput},
  store::RecordStore,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

/// `GET /children`
pub async fn list<S: RecordStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Child>>, ApiError> {
  let children = state.store.list_children().await.map_err(ApiError::store)?;
  Ok(Json(children))
}

/// `POST /children`
pub async fn create<S: RecordStore>(
  State(state): State<ApiState<S>>,
  Json(input): Json<ChildInput>,
) -> Result<impl IntoResponse, ApiError> {
  input.validate(Utc::now().date_naive())?;
  let child = state.store.upsert_child(input).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(child)))
}

/// `GET /children/:id`
pub async fn get_one<S: RecordStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Child>, ApiError> {
  let child = state
    .store
    .get_child(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("child {id} not found")))?;
  Ok(Json(child))
}

/// `PUT /children/:id`: the path id wins over any id in the body.
pub async fn put_one<S: RecordStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(mut input): Json<ChildInput>,
) -> Result<Json<Child>, ApiError> {
  input.child_id = Some(id);
  input.validate(Utc::now().date_naive())?;
  let child = state.store.upsert_child(input).await.map_err(ApiError::store)?;
  Ok(Json(child))
}

/// `DELETE /children/:id`: removes the child with its attendance and
/// performance rows.
pub async fn delete_one<S: RecordStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  if state.store.delete_child(id).await.map_err(ApiError::store)? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("child {id} not found")))
  }
}
