//! Handlers for record lifecycle endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/records/{tn}/rollover` | Spawns the next period; 404 if `tn` is unknown |
//! | `POST` | `/records/{tn}/clone` | Body: `{"tracking_number":..,"fields":{..}}`, both optional |
//! | `GET`  | `/records/{tn}/audit` | Consistency issues for the first match |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use psur_core::{
  audit::{AuditIssue, audit, expected_due_date},
  patch::RecordPatch,
  rollover::{RolloverReport, clone_record, rollover},
  store::ScheduleStore,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::{AppState, error::ApiError};

// ─── Rollover ────────────────────────────────────────────────────────────────

/// `POST /records/{tn}/rollover`
pub async fn rollover_one<S>(
  State(state): State<AppState<S>>,
  Path(tn): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScheduleStore,
{
  let outcome = rollover(state.store.as_ref(), &tn, &state.policy)
    .await
    .map_err(ApiError::store)?;

  let status = match &outcome {
    Some(r) => {
      info!(
        source = %tn,
        new_tracking_number = %r.new_tracking_number,
        cycle_years = r.cycle_years,
        "rolled over"
      );
      StatusCode::OK
    }
    None => StatusCode::NOT_FOUND,
  };
  Ok((status, Json(RolloverReport::from_outcome(&tn, outcome.as_ref()))))
}

// ─── Clone ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CloneBody {
  /// Explicit identifier for the copy; generated when absent.
  pub tracking_number: Option<String>,
  /// Field changes applied on top of the copied values.
  pub fields:          Map<String, Value>,
}

/// `POST /records/{tn}/clone`
pub async fn clone_one<S>(
  State(state): State<AppState<S>>,
  Path(tn): Path<String>,
  Json(body): Json<CloneBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScheduleStore,
{
  let changes = RecordPatch::from_json_map(&body.fields)?;
  let created = clone_record(state.store.as_ref(), &tn, body.tracking_number, &changes)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("tracking number {tn} not found")))?;
  info!(source = %tn, tracking_number = %created.tracking_number, "record cloned");
  Ok((StatusCode::CREATED, Json(created)))
}

// ─── Audit ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AuditEntry {
  #[serde(flatten)]
  pub issue:   AuditIssue,
  pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AuditReport {
  pub tracking_number:   String,
  /// Period end + submission buffer; `null` without a period end.
  pub expected_due_date: Option<NaiveDate>,
  pub issues:            Vec<AuditEntry>,
}

/// `GET /records/{tn}/audit`
pub async fn audit_one<S>(
  State(state): State<AppState<S>>,
  Path(tn): Path<String>,
) -> Result<Json<AuditReport>, ApiError>
where
  S: ScheduleStore,
{
  let record = state
    .store
    .read_first(&tn)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("tracking number {tn} not found")))?;

  let expected_due_date = expected_due_date(&record, &state.policy);
  let issues = audit(&record, &state.policy)
    .into_iter()
    .map(|issue| AuditEntry { message: issue.message(), issue })
    .collect();
  Ok(Json(AuditReport {
    tracking_number: record.tracking_number,
    expected_due_date,
    issues,
  }))
}
