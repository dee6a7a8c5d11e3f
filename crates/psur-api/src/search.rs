//! Query endpoints: free-text search, structured filter, missing-field
//! audit and tracking-number normalisation.
//!
//! All of them run over a fresh [`ScheduleStore::list_records`] snapshot.

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::NaiveDate;
use psur_core::{
  identifier::{normalize_report_number, normalize_tracking_number},
  patch::parse_date,
  query::{self, DEFAULT_SEARCH_LIMIT, RecordFilter},
  record::{Record, RecordField},
  store::ScheduleStore,
};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError, today};

// ─── Search ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct SearchParams {
  #[serde(default)]
  pub text:  String,
  /// Defaults to [`DEFAULT_SEARCH_LIMIT`].
  pub limit: Option<usize>,
}

/// `GET /search?text=...[&limit=N]`
pub async fn search<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Record>>, ApiError>
where
  S: ScheduleStore,
{
  let snapshot = state.store.list_records().await.map_err(ApiError::store)?;
  let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
  let hits = query::search(&snapshot, &params.text, limit)
    .into_iter()
    .cloned()
    .collect();
  Ok(Json(hits))
}

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Query-string form of [`RecordFilter`]. Dates accept every layout
/// [`parse_date`] does.
#[derive(Debug, Deserialize, Default)]
pub struct FilterParams {
  pub tracking_number: Option<String>,
  pub owner:           Option<String>,
  pub classification:  Option<String>,
  pub status:          Option<String>,
  pub due_before:      Option<String>,
  #[serde(default)]
  pub overdue_only:    bool,
  pub within_days:     Option<u32>,
}

fn non_blank(s: Option<String>) -> Option<String> { s.filter(|s| !s.trim().is_empty()) }

impl FilterParams {
  pub fn into_filter(self) -> Result<RecordFilter, ApiError> {
    let due_before: Option<NaiveDate> = non_blank(self.due_before)
      .map(|d| {
        parse_date(&d).ok_or_else(|| ApiError::Validation {
          field:   Some("due_before".to_owned()),
          message: format!("unparseable date {d:?}"),
        })
      })
      .transpose()?;

    Ok(RecordFilter {
      tracking_number: non_blank(self.tracking_number),
      owner:           non_blank(self.owner),
      classification:  non_blank(self.classification),
      status:          non_blank(self.status),
      due_before,
      overdue_only:    self.overdue_only,
      within_days:     self.within_days,
    })
  }
}

/// `GET /filter?owner=..&classification=..&status=..&due_before=..&overdue_only=true&within_days=N`
///
/// Sorted ascending by due date, undated records last.
pub async fn filter<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<FilterParams>,
) -> Result<Json<Vec<Record>>, ApiError>
where
  S: ScheduleStore,
{
  let criteria = params.into_filter()?;
  let snapshot = state.store.list_records().await.map_err(ApiError::store)?;
  let hits = query::filter(&snapshot, &criteria, today())
    .into_iter()
    .cloned()
    .collect();
  Ok(Json(hits))
}

// ─── Missing fields ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MissingParams {
  /// Comma-separated field names, e.g. `owner,due_date`.
  pub fields: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MissingEntry {
  pub tracking_number: String,
  pub record_id:       i64,
  pub product_name:    Option<String>,
  pub missing:         Vec<RecordField>,
}

/// `GET /missing?fields=owner,due_date`
pub async fn missing<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<MissingParams>,
) -> Result<Json<Vec<MissingEntry>>, ApiError>
where
  S: ScheduleStore,
{
  let fields = params
    .fields
    .split(',')
    .map(str::trim)
    .filter(|f| !f.is_empty())
    .map(|f| {
      f.parse::<RecordField>()
        .map_err(|_| ApiError::from(psur_core::Error::UnknownField(f.to_owned())))
    })
    .collect::<Result<Vec<_>, _>>()?;
  if fields.is_empty() {
    return Err(ApiError::BadRequest("no fields requested".to_owned()));
  }

  let snapshot = state.store.list_records().await.map_err(ApiError::store)?;
  let entries = query::find_missing_fields(&snapshot, &fields)
    .into_iter()
    .map(|hit| MissingEntry {
      tracking_number: hit.record.tracking_number.clone(),
      record_id:       hit.record.record_id,
      product_name:    hit.record.product_name.clone(),
      missing:         hit.missing,
    })
    .collect();
  Ok(Json(entries))
}

// ─── Normalise ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NormalizeParams {
  pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Normalized {
  pub tracking_number: Option<String>,
  pub report_number:   Option<String>,
}

/// `GET /normalize?query=td%207%20psur%203`:
/// `{"tracking_number":"TD007","report_number":"PSUR003"}`, `null` for
/// whichever is absent.
pub async fn normalize<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<NormalizeParams>,
) -> Json<Normalized>
where
  S: ScheduleStore,
{
  Json(Normalized {
    tracking_number: normalize_tracking_number(&params.query, &state.identifiers),
    report_number:   normalize_report_number(&params.query),
  })
}
