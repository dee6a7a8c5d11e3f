//! Handlers for `/records` and `/reports` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/records` | Whole collection in insertion order |
//! | `POST`   | `/records` | Body: field map; returns 201 + `{tracking_number, record_id}` |
//! | `GET`    | `/records/{tn}` | First match; 404 if none |
//! | `GET`    | `/records/{tn}/all` | Every duplicate, possibly empty |
//! | `PATCH`  | `/records/{tn}` | Body: `{"fields":{..},"expected_version":N}` |
//! | `POST`   | `/records/bulk-update` | Body: `{"criteria":{..},"fields":{..}}` |
//! | `POST`   | `/records/{tn}/notes` | Body: `{"text":".."}` |
//! | `POST`   | `/records/{tn}/links` | Body: `{"links":{"name":"url"}}` |
//! | `DELETE` | `/records/{tn}` | Removes every duplicate |
//! | `GET`    | `/reports/{rn}` | First record with that report number |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use psur_core::{
  patch::{RecordPatch, new_record_from_json},
  query::RecordFilter,
  record::{CreatedRecord, ExternalLinks, Record},
  store::{BulkOutcome, ScheduleStore},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::{AppState, error::ApiError};

/// `{"success": bool}`, sent with 200 or 404.
#[derive(Debug, Serialize, Deserialize)]
pub struct Success {
  pub success: bool,
}

/// 200 on success. `found = false` turns a failure into a 404.
fn success(ok: bool, found: bool) -> (StatusCode, Json<Success>) {
  let status = if ok || found { StatusCode::OK } else { StatusCode::NOT_FOUND };
  (status, Json(Success { success: ok }))
}

// ─── Reads ────────────────────────────────────────────────────────────────────

/// `GET /records`
pub async fn list<S>(State(state): State<AppState<S>>) -> Result<Json<Vec<Record>>, ApiError>
where
  S: ScheduleStore,
{
  let records = state.store.list_records().await.map_err(ApiError::store)?;
  Ok(Json(records))
}

/// `GET /records/{tn}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(tn): Path<String>,
) -> Result<Json<Record>, ApiError>
where
  S: ScheduleStore,
{
  let record = state
    .store
    .read_first(&tn)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("tracking number {tn} not found")))?;
  Ok(Json(record))
}

/// `GET /records/{tn}/all`
pub async fn get_all<S>(
  State(state): State<AppState<S>>,
  Path(tn): Path<String>,
) -> Result<Json<Vec<Record>>, ApiError>
where
  S: ScheduleStore,
{
  let records = state.store.read_all(&tn).await.map_err(ApiError::store)?;
  Ok(Json(records))
}

/// `GET /reports/{rn}`
pub async fn by_report_number<S>(
  State(state): State<AppState<S>>,
  Path(rn): Path<String>,
) -> Result<Json<Record>, ApiError>
where
  S: ScheduleStore,
{
  let record = state
    .store
    .read_by_report_number(&rn)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("report number {rn} not found")))?;
  Ok(Json(record))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /records`, body: `{"product_name":"..", "due_date":"2025-03-31", ..}`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScheduleStore,
{
  let input = new_record_from_json(&body)?;
  let created: CreatedRecord = state.store.create(input).await.map_err(ApiError::store)?;
  info!(tracking_number = %created.tracking_number, "record created via api");
  Ok((StatusCode::CREATED, Json(created)))
}

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub fields:           Map<String, Value>,
  /// When set, the update is refused with 409 unless the first matching
  /// record is still at this version.
  pub expected_version: Option<u32>,
}

/// `PATCH /records/{tn}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Path(tn): Path<String>,
  Json(body): Json<UpdateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScheduleStore,
{
  let patch = RecordPatch::from_json_map(&body.fields)?;

  if let Some(expected) = body.expected_version {
    let Some(current) = state.store.read_first(&tn).await.map_err(ApiError::store)? else {
      return Ok(success(false, false));
    };
    if current.version != expected {
      return Err(ApiError::Conflict { expected, actual: current.version });
    }
  }

  if patch.is_empty() {
    return Ok(success(false, true));
  }

  let updated = state
    .store
    .update_first(&tn, &patch)
    .await
    .map_err(ApiError::store)?;
  if updated {
    info!(tracking_number = %tn, fields = patch.len(), "record updated");
  }
  Ok(success(updated, false))
}

#[derive(Debug, Deserialize)]
pub struct BulkUpdateBody {
  pub criteria: RecordFilter,
  pub fields:   Map<String, Value>,
}

/// `POST /records/bulk-update`
///
/// Empty criteria are refused so a typo cannot rewrite the whole schedule.
pub async fn bulk_update<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<BulkUpdateBody>,
) -> Result<Json<BulkOutcome>, ApiError>
where
  S: ScheduleStore,
{
  if body.criteria.is_empty() {
    return Err(ApiError::BadRequest("criteria must not be empty".to_owned()));
  }
  let patch = RecordPatch::from_json_map(&body.fields)?;
  let outcome = state
    .store
    .update_all_matching(&body.criteria, &patch)
    .await
    .map_err(ApiError::store)?;
  info!(
    matched = outcome.matched,
    updated = outcome.updated,
    "bulk update via api"
  );
  Ok(Json(outcome))
}

// ─── Notes and links ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NoteBody {
  pub text: String,
}

/// `POST /records/{tn}/notes`
pub async fn append_note<S>(
  State(state): State<AppState<S>>,
  Path(tn): Path<String>,
  Json(body): Json<NoteBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScheduleStore,
{
  if body.text.trim().is_empty() {
    return Ok(success(false, true));
  }
  let appended = state
    .store
    .append_note(&tn, &body.text)
    .await
    .map_err(ApiError::store)?;
  if appended {
    info!(tracking_number = %tn, "note appended");
  }
  Ok(success(appended, false))
}

#[derive(Debug, Deserialize)]
pub struct LinksBody {
  pub links: ExternalLinks,
}

/// `POST /records/{tn}/links`
pub async fn attach_links<S>(
  State(state): State<AppState<S>>,
  Path(tn): Path<String>,
  Json(body): Json<LinksBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScheduleStore,
{
  if body.links.values().all(|url| url.trim().is_empty()) {
    return Ok(success(false, true));
  }
  let attached = state
    .store
    .attach_links(&tn, &body.links)
    .await
    .map_err(ApiError::store)?;
  if attached {
    info!(tracking_number = %tn, links = body.links.len(), "links attached");
  }
  Ok(success(attached, false))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /records/{tn}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Path(tn): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScheduleStore,
{
  let removed = state.store.delete(&tn).await.map_err(ApiError::store)?;
  if removed {
    info!(tracking_number = %tn, "records deleted");
  }
  Ok(success(removed, false))
}
