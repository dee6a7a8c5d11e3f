//! Aggregate statistics over a record snapshot.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Width of the "due soon" window, in days from today inclusive.
pub const DUE_SOON_DAYS: u64 = 30;

/// Summary produced by [`Statistics::compute`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
  /// Every record, duplicates counted individually.
  pub total_records:              usize,
  pub by_status:                  BTreeMap<String, usize>,
  pub by_classification:          BTreeMap<String, usize>,
  pub by_owner:                   BTreeMap<String, usize>,
  /// Records whose due date lies strictly before today.
  pub overdue:                    usize,
  /// Records due between today and today + [`DUE_SOON_DAYS`].
  pub due_soon:                   usize,
  /// Tracking numbers carried by more than one record, sorted, each once.
  pub duplicate_tracking_numbers: Vec<String>,
}

fn bump(histogram: &mut BTreeMap<String, usize>, key: Option<&str>) {
  if let Some(key) = key.map(str::trim).filter(|k| !k.is_empty()) {
    *histogram.entry(key.to_owned()).or_default() += 1;
  }
}

impl Statistics {
  /// One pass over `records`. Histograms skip records whose grouping field
  /// is absent or blank.
  pub fn compute(records: &[Record], today: NaiveDate) -> Self {
    let soon_end = today
      .checked_add_days(Days::new(DUE_SOON_DAYS))
      .unwrap_or(NaiveDate::MAX);
    let mut stats = Self { total_records: records.len(), ..Self::default() };
    let mut per_tracking_number: BTreeMap<&str, usize> = BTreeMap::new();

    for record in records {
      bump(&mut stats.by_status, record.status.as_deref());
      bump(&mut stats.by_classification, record.classification.as_deref());
      bump(&mut stats.by_owner, record.owner.as_deref());

      if let Some(due) = record.due_date {
        if due < today {
          stats.overdue += 1;
        } else if due <= soon_end {
          stats.due_soon += 1;
        }
      }

      *per_tracking_number.entry(record.tracking_number.as_str()).or_default() += 1;
    }

    stats.duplicate_tracking_numbers = per_tracking_number
      .into_iter()
      .filter(|(_, n)| *n > 1)
      .map(|(tn, _)| tn.to_owned())
      .collect();
    stats
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::record::fixtures::{date, record};

  #[test]
  fn duplicates_are_reported_once_and_counted_individually() {
    let mut records = vec![record(1, "TD010"), record(2, "TD011"), record(3, "TD010")];
    records.push(record(4, "TD010"));
    let stats = Statistics::compute(&records, date("2025-01-01"));
    assert_eq!(stats.total_records, 4);
    assert_eq!(stats.duplicate_tracking_numbers, vec!["TD010".to_owned()]);
  }

  #[test]
  fn histograms_skip_absent_and_blank() {
    let mut a = record(1, "TD001");
    a.status = Some("Done".into());
    a.owner = Some("  ".into());
    a.classification = Some("IIb".into());
    let mut b = record(2, "TD002");
    b.status = Some("Done".into());
    b.owner = Some("Sam".into());
    let c = record(3, "TD003");

    let stats = Statistics::compute(&[a, b, c], date("2025-01-01"));
    assert_eq!(stats.by_status.get("Done"), Some(&2));
    assert_eq!(stats.by_status.len(), 1);
    assert_eq!(stats.by_owner.len(), 1);
    assert_eq!(stats.by_classification.get("IIb"), Some(&1));
  }

  #[test]
  fn overdue_and_due_soon_windows() {
    let today = date("2025-06-15");
    let mk = |id: i64, due: Option<&str>| {
      let mut r = record(id, &format!("TD{id:03}"));
      r.due_date = due.map(date);
      r
    };
    let records = [
      mk(1, Some("2025-06-14")),
      mk(2, Some("2025-06-15")),
      mk(3, Some("2025-07-15")),
      mk(4, Some("2025-07-16")),
      mk(5, None),
    ];
    let stats = Statistics::compute(&records, today);
    assert_eq!(stats.overdue, 1);
    assert_eq!(stats.due_soon, 2);
  }

  #[test]
  fn empty_collection() {
    let stats = Statistics::compute(&[], date("2025-01-01"));
    assert_eq!(stats, Statistics::default());
  }
}
