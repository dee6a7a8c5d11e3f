//! Search, filter and data-quality queries over a record snapshot.
//!
//! Everything here is a pure function over records in store iteration
//! (insertion) order. Callers take a snapshot with
//! [`ScheduleStore::list_records`](crate::store::ScheduleStore::list_records)
//! and pass it in, along with "today" for date-relative criteria.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::record::{Record, RecordField};

/// Limit applied to [`search`] when the caller does not supply one.
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

/// Fields scanned by [`search`], in order.
pub const SEARCH_FIELDS: [RecordField; 7] = [
  RecordField::TrackingNumber,
  RecordField::ReportNumber,
  RecordField::ProductName,
  RecordField::CatalogNumber,
  RecordField::Owner,
  RecordField::Classification,
  RecordField::Status,
];

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
  haystack.to_lowercase().contains(needle_lower)
}

fn eq_ci(a: &str, b: &str) -> bool { a.trim().to_lowercase() == b.trim().to_lowercase() }

// ─── Search ──────────────────────────────────────────────────────────────────

/// Case-insensitive substring search. Returns the first `limit` matches in
/// iteration order; there is no relevance ranking.
pub fn search<'r>(records: &'r [Record], text: &str, limit: usize) -> Vec<&'r Record> {
  let needle = text.trim().to_lowercase();
  records
    .iter()
    .filter(|r| {
      SEARCH_FIELDS
        .iter()
        .filter_map(|f| r.field_text(*f))
        .any(|v| contains_ci(&v, &needle))
    })
    .take(limit)
    .collect()
}

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Criteria for [`filter`] and bulk updates. All supplied criteria must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordFilter {
  /// Exact tracking number; selects every duplicate of one identifier.
  pub tracking_number: Option<String>,
  /// Case-insensitive substring of the owner.
  pub owner:           Option<String>,
  /// Case-insensitive exact classification.
  pub classification:  Option<String>,
  /// Case-insensitive exact status.
  pub status:          Option<String>,
  /// Due date strictly before this date. Undated records never match.
  pub due_before:      Option<NaiveDate>,
  /// Due date strictly before today. Undated records never match.
  pub overdue_only:    bool,
  /// Due date within `[today, today + n days]`.
  pub within_days:     Option<u32>,
}

impl RecordFilter {
  /// Whether `record` satisfies every supplied criterion.
  pub fn matches(&self, record: &Record, today: NaiveDate) -> bool {
    if let Some(tn) = &self.tracking_number
      && record.tracking_number != *tn
    {
      return false;
    }
    if let Some(owner) = &self.owner {
      let needle = owner.trim().to_lowercase();
      if !record.owner.as_deref().is_some_and(|o| contains_ci(o, &needle)) {
        return false;
      }
    }
    if let Some(class) = &self.classification
      && !record.classification.as_deref().is_some_and(|c| eq_ci(c, class))
    {
      return false;
    }
    if let Some(status) = &self.status
      && !record.status.as_deref().is_some_and(|s| eq_ci(s, status))
    {
      return false;
    }
    if let Some(cutoff) = self.due_before
      && !record.due_date.is_some_and(|d| d < cutoff)
    {
      return false;
    }
    if self.overdue_only && !record.is_overdue(today) {
      return false;
    }
    if let Some(days) = self.within_days {
      let window_end = today
        .checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX);
      if !record.due_date.is_some_and(|d| d >= today && d <= window_end) {
        return false;
      }
    }
    true
  }

  pub fn is_empty(&self) -> bool { *self == Self::default() }
}

/// Records satisfying `criteria`, sorted ascending by due date with undated
/// records last. The sort is stable, so ties keep insertion order.
pub fn filter<'r>(
  records: &'r [Record],
  criteria: &RecordFilter,
  today: NaiveDate,
) -> Vec<&'r Record> {
  let mut hits: Vec<&Record> =
    records.iter().filter(|r| criteria.matches(r, today)).collect();
  sort_by_due_date(&mut hits);
  hits
}

/// Ascending by due date, `None` last.
pub fn sort_by_due_date(records: &mut [&Record]) {
  records.sort_by_key(|r| (r.due_date.is_none(), r.due_date));
}

// ─── Missing fields ──────────────────────────────────────────────────────────

/// A record that failed a missing-field audit.
#[derive(Debug, Clone, Serialize)]
pub struct MissingFields<'r> {
  pub record:  &'r Record,
  /// The requested fields that are absent or blank, in request order.
  pub missing: Vec<RecordField>,
}

/// Every record where at least one of `fields` is absent or blank.
pub fn find_missing_fields<'r>(
  records: &'r [Record],
  fields: &[RecordField],
) -> Vec<MissingFields<'r>> {
  records
    .iter()
    .filter_map(|record| {
      let missing: Vec<RecordField> =
        fields.iter().copied().filter(|f| record.is_blank(*f)).collect();
      (!missing.is_empty()).then_some(MissingFields { record, missing })
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::record::fixtures::{date, record};

  fn sample() -> Vec<Record> {
    let mut a = record(1, "TD001");
    a.product_name = Some("Cardiac Stent".into());
    a.owner = Some("Dana Whitfield".into());
    a.classification = Some("III".into());
    a.status = Some("In progress".into());
    a.due_date = Some(date("2025-03-01"));

    let mut b = record(2, "TD002");
    b.product_name = Some("Wound Dressing".into());
    b.owner = Some("Sam Ortiz".into());
    b.classification = Some("IIa".into());
    b.status = Some("Not started".into());

    let mut c = record(3, "TD003");
    c.product_name = Some("Stent Delivery System".into());
    c.owner = Some("dana w.".into());
    c.classification = Some("iii".into());
    c.status = Some("Not started".into());
    c.due_date = Some(date("2024-12-01"));
    c.report_number = Some("PSUR014".into());

    let mut d = record(4, "TD004");
    d.owner = Some("Sam Ortiz".into());
    d.due_date = Some(date("2026-05-01"));

    vec![a, b, c, d]
  }

  fn ids(records: &[&Record]) -> Vec<i64> { records.iter().map(|r| r.record_id).collect() }

  const TODAY: &str = "2025-06-15";

  #[test]
  fn search_is_case_insensitive_in_insertion_order() {
    let records = sample();
    assert_eq!(ids(&search(&records, "STENT", 50)), vec![1, 3]);
    assert_eq!(ids(&search(&records, "psur01", 50)), vec![3]);
    assert_eq!(ids(&search(&records, "not started", 50)), vec![2, 3]);
  }

  #[test]
  fn search_respects_limit() {
    let records = sample();
    assert_eq!(ids(&search(&records, "td", 2)), vec![1, 2]);
  }

  #[test]
  fn plain_filter_sorts_undated_last() {
    let records = sample();
    let hits = filter(&records, &RecordFilter::default(), date(TODAY));
    assert_eq!(ids(&hits), vec![3, 1, 4, 2]);
  }

  #[test]
  fn overdue_only_excludes_undated() {
    let records = sample();
    let criteria = RecordFilter { overdue_only: true, ..Default::default() };
    let hits = filter(&records, &criteria, date(TODAY));
    assert_eq!(ids(&hits), vec![3, 1]);
    assert!(hits.iter().all(|r| r.due_date.unwrap() < date(TODAY)));
  }

  #[test]
  fn criteria_are_conjunctive() {
    let records = sample();
    let criteria = RecordFilter {
      owner: Some("DANA".into()),
      classification: Some("III".into()),
      status: Some("not STARTED".into()),
      overdue_only: true,
      ..Default::default()
    };
    assert_eq!(ids(&filter(&records, &criteria, date(TODAY))), vec![3]);
  }

  #[test]
  fn classification_is_exact_not_substring() {
    let records = sample();
    let criteria = RecordFilter { classification: Some("II".into()), ..Default::default() };
    assert!(filter(&records, &criteria, date(TODAY)).is_empty());
  }

  #[test]
  fn due_before_is_strict() {
    let records = sample();
    let criteria =
      RecordFilter { due_before: Some(date("2025-03-01")), ..Default::default() };
    assert_eq!(ids(&filter(&records, &criteria, date(TODAY))), vec![3]);
  }

  #[test]
  fn within_days_window() {
    let records = sample();
    let criteria = RecordFilter { within_days: Some(365), ..Default::default() };
    assert_eq!(ids(&filter(&records, &criteria, date(TODAY))), vec![4]);
  }

  #[test]
  fn missing_fields_lists_each_gap() {
    let records = sample();
    let hits = find_missing_fields(
      &records,
      &[RecordField::DueDate, RecordField::ReportNumber],
    );
    let summary: Vec<(i64, Vec<RecordField>)> =
      hits.iter().map(|h| (h.record.record_id, h.missing.clone())).collect();
    assert_eq!(summary, vec![
      (1, vec![RecordField::ReportNumber]),
      (2, vec![RecordField::DueDate, RecordField::ReportNumber]),
      (4, vec![RecordField::ReportNumber]),
    ]);
  }
}
