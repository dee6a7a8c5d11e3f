//! Rollover: spawning the next reporting-period record from a closed one.
//!
//! [`plan_successor`] is the pure part (dates, carried-over fields, audit
//! note). [`rollover`] loads the closed record through a [`ScheduleStore`]
//! and persists the plan with ordinary create semantics, which also assigns
//! a freshly generated tracking number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  cycle::RolloverPolicy,
  identifier::increment_report_number,
  patch::RecordPatch,
  record::{CreatedRecord, NewRecord, Record},
  store::ScheduleStore,
};

/// Outcome of a successful rollover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rollover {
  pub source_tracking_number: String,
  pub new_tracking_number:    String,
  pub new_report_number:      Option<String>,
  pub record_id:              i64,
  pub cycle_years:            u32,
}

/// The boundary result shape for a rollover request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloverReport {
  pub success:             bool,
  pub new_tracking_number: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub new_report_number:   Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error:               Option<String>,
}

impl RolloverReport {
  pub fn from_outcome(source: &str, outcome: Option<&Rollover>) -> Self {
    match outcome {
      Some(r) => Self {
        success:             true,
        new_tracking_number: Some(r.new_tracking_number.clone()),
        new_report_number:   r.new_report_number.clone(),
        error:               None,
      },
      None => Self {
        success:             false,
        new_tracking_number: None,
        new_report_number:   None,
        error:               Some(format!("tracking number {source} not found")),
      },
    }
  }
}

fn date_or_unknown(d: Option<chrono::NaiveDate>) -> String {
  d.map_or_else(|| "unknown".to_owned(), |d| d.to_string())
}

/// Build the successor of `closed` for the next compliance period.
///
/// The tracking number is left unset so the store generates a fresh one.
/// If `closed` has no period end, the new period and due date stay unset.
pub fn plan_successor(
  closed: &Record,
  policy: &RolloverPolicy,
  generated_at: DateTime<Utc>,
) -> NewRecord {
  let years = policy.cycle_years(closed);
  let period = closed
    .period_end
    .and_then(|end| policy.successor_period(end, years));

  let audit_line = format!(
    "[{}] Auto-generated from {} ({}-year cycle). Previous period: {} to {}.",
    generated_at.format("%Y-%m-%d %H:%M"),
    closed.tracking_number,
    years,
    date_or_unknown(closed.period_start),
    date_or_unknown(closed.period_end),
  );

  NewRecord {
    tracking_number:        None,
    report_number:          closed
      .report_number
      .as_deref()
      .and_then(increment_report_number),
    report_type:            closed.report_type.clone(),
    classification:         closed.classification.clone(),
    product_name:           closed.product_name.clone(),
    catalog_number:         closed.catalog_number.clone(),
    owner:                  closed.owner.clone(),
    owner_contact:          closed.owner_contact.clone(),
    period_start:           period.map(|p| p.start),
    period_end:             period.map(|p| p.end),
    frequency:              closed.frequency.clone(),
    due_date:               period.map(|p| p.due),
    status:                 Some(policy.initial_status.clone()),
    region_flag:            closed.region_flag.clone(),
    region_status:          None,
    notes:                  Some(audit_line),
    external_links:         Default::default(),
    parent_tracking_number: Some(closed.tracking_number.clone()),
    auto_generated:         true,
  }
}

/// Roll the first record with `tracking_number` over into a new one.
///
/// Returns `Ok(None)` when no such record exists.
pub async fn rollover<S: ScheduleStore>(
  store: &S,
  tracking_number: &str,
  policy: &RolloverPolicy,
) -> Result<Option<Rollover>, S::Error> {
  let Some(closed) = store.read_first(tracking_number).await? else {
    return Ok(None);
  };

  let cycle_years = policy.cycle_years(&closed);
  let plan = plan_successor(&closed, policy, Utc::now());
  let new_report_number = plan.report_number.clone();
  let CreatedRecord { tracking_number: new_tracking_number, record_id } =
    store.create(plan).await?;

  Ok(Some(Rollover {
    source_tracking_number: closed.tracking_number,
    new_tracking_number,
    new_report_number,
    record_id,
    cycle_years,
  }))
}

/// Copy the first record with `source` into a new record.
///
/// `new_tracking_number` overrides the identifier (duplicates are allowed);
/// without one the store generates a fresh identifier. `changes` is applied
/// on top of the copied fields. Returns `Ok(None)` when `source` is missing.
pub async fn clone_record<S: ScheduleStore>(
  store: &S,
  source: &str,
  new_tracking_number: Option<String>,
  changes: &RecordPatch,
) -> Result<Option<CreatedRecord>, S::Error> {
  let Some(original) = store.read_first(source).await? else {
    return Ok(None);
  };

  let mut copy = NewRecord::from(original);
  copy.tracking_number = new_tracking_number;
  changes.apply_new(&mut copy);

  store.create(copy).await.map(Some)
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::record::fixtures::{date, record};

  fn closed() -> Record {
    let mut r = record(7, "TD007");
    r.report_number = Some("PSUR012".into());
    r.report_type = Some("PSUR".into());
    r.classification = Some("IIa".into());
    r.frequency = Some("Annual".into());
    r.product_name = Some("Infusion Set".into());
    r.catalog_number = Some("IS-200".into());
    r.owner = Some("Dana".into());
    r.owner_contact = Some("dana@example.com".into());
    r.period_start = Some(date("2023-07-01"));
    r.period_end = Some(date("2024-06-30"));
    r.due_date = Some(date("2024-09-28"));
    r.status = Some("Submitted".into());
    r.region_flag = Some("Yes".into());
    r.region_status = Some("Filed".into());
    r.notes = Some("old notes".into());
    r.external_links.insert("mc".into(), "https://mc.example/7".into());
    r
  }

  fn at() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 7, 2, 8, 30, 0).unwrap() }

  #[test]
  fn iia_successor_spans_two_years() {
    let plan = plan_successor(&closed(), &RolloverPolicy::default(), at());
    assert_eq!(plan.period_start, Some(date("2024-07-01")));
    assert_eq!(plan.period_end, Some(date("2026-06-30")));
    assert_eq!(plan.due_date, Some(date("2026-09-28")));
    assert_eq!(plan.status.as_deref(), Some("Not started"));
    assert!(plan.auto_generated);
    assert_eq!(plan.parent_tracking_number.as_deref(), Some("TD007"));
    assert_eq!(plan.tracking_number, None);
  }

  #[test]
  fn carries_over_and_resets() {
    let plan = plan_successor(&closed(), &RolloverPolicy::default(), at());
    assert_eq!(plan.report_number.as_deref(), Some("PSUR013"));
    assert_eq!(plan.report_type.as_deref(), Some("PSUR"));
    assert_eq!(plan.catalog_number.as_deref(), Some("IS-200"));
    assert_eq!(plan.owner_contact.as_deref(), Some("dana@example.com"));
    assert_eq!(plan.frequency.as_deref(), Some("Annual"));
    assert_eq!(plan.region_flag.as_deref(), Some("Yes"));
    assert_eq!(plan.region_status, None);
    assert!(plan.external_links.is_empty());
  }

  #[test]
  fn audit_note_names_source_and_previous_period() {
    let plan = plan_successor(&closed(), &RolloverPolicy::default(), at());
    let notes = plan.notes.unwrap();
    assert!(notes.starts_with("[2024-07-02 08:30]"));
    assert!(notes.contains("TD007"));
    assert!(notes.contains("2023-07-01 to 2024-06-30"));
  }

  #[test]
  fn class_three_without_frequency_is_annual() {
    let mut r = closed();
    r.classification = Some("III".into());
    r.frequency = None;
    let plan = plan_successor(&r, &RolloverPolicy::default(), at());
    assert_eq!(plan.period_end, Some(date("2025-06-30")));
    assert_eq!(plan.due_date, Some(date("2025-09-28")));
  }

  #[test]
  fn missing_period_end_leaves_dates_unset() {
    let mut r = closed();
    r.period_end = None;
    r.report_number = Some("draft".into());
    let plan = plan_successor(&r, &RolloverPolicy::default(), at());
    assert_eq!(plan.period_start, None);
    assert_eq!(plan.period_end, None);
    assert_eq!(plan.due_date, None);
    assert_eq!(plan.report_number, None);
  }

  #[test]
  fn not_found_report_shape() {
    let report = RolloverReport::from_outcome("TD404", None);
    assert!(!report.success);
    assert_eq!(report.new_tracking_number, None);
    assert!(report.error.unwrap().contains("TD404"));
  }
}
