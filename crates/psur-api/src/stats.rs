//! Handler for `GET /stats`.

use axum::{Json, extract::State};
use psur_core::{stats::Statistics, store::ScheduleStore};

use crate::{AppState, error::ApiError, today};

/// `GET /stats`
pub async fn handler<S>(State(state): State<AppState<S>>) -> Result<Json<Statistics>, ApiError>
where
  S: ScheduleStore,
{
  let snapshot = state.store.list_records().await.map_err(ApiError::store)?;
  Ok(Json(Statistics::compute(&snapshot, today())))
}
