//! Consistency checks for a single record.
//!
//! These are warnings for data-quality tooling; nothing in the store refuses
//! a record because of them. The stored due date stays authoritative even
//! when it drifts from the one the period implies.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
  cycle::RolloverPolicy,
  record::{Record, RecordField},
};

/// One problem found by [`audit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum AuditIssue {
  /// The frequency label implies a different cycle length than the
  /// classification rule does.
  FrequencyMismatch {
    classification: String,
    frequency:      String,
    expected_years: u32,
    implied_years:  u32,
  },
  MissingDueDate,
  MissingOwner,
  /// `period_start` falls after `period_end`.
  InvertedPeriod,
  /// The submission deadline precedes the end of the period it covers.
  DueBeforePeriodEnd,
  /// The stored due date differs from period end + submission buffer.
  DueDateDrift { stored: NaiveDate, expected: NaiveDate },
}

impl AuditIssue {
  pub fn message(&self) -> String {
    match self {
      Self::FrequencyMismatch { classification, frequency, expected_years, .. } => {
        format!(
          "class {classification} reports every {expected_years} year(s); \
           frequency {frequency:?} does not match"
        )
      }
      Self::MissingDueDate => {
        "missing due date; compute it from the period end and frequency".to_owned()
      }
      Self::MissingOwner => "missing writer/owner".to_owned(),
      Self::InvertedPeriod => "period start is after period end".to_owned(),
      Self::DueBeforePeriodEnd => "due date is before the period end".to_owned(),
      Self::DueDateDrift { stored, expected } => {
        format!("due date {stored} differs from the expected {expected}")
      }
    }
  }
}

/// The deadline implied by the record's period: `period_end` plus the
/// policy's submission buffer.
pub fn expected_due_date(record: &Record, policy: &RolloverPolicy) -> Option<NaiveDate> {
  record
    .period_end?
    .checked_add_days(Days::new(policy.submission_buffer_days))
}

/// Check `record` against `policy`'s cycle rules and basic completeness.
pub fn audit(record: &Record, policy: &RolloverPolicy) -> Vec<AuditIssue> {
  let mut issues = Vec::new();

  if let (Some(classification), Some(frequency)) =
    (record.classification.as_deref(), record.frequency.as_deref())
    && !frequency.trim().is_empty()
  {
    let expected = policy
      .years_by_classification(classification)
      .unwrap_or(policy.default_years);
    let implied = policy.years_by_frequency(frequency);
    if expected != implied {
      issues.push(AuditIssue::FrequencyMismatch {
        classification: classification.to_owned(),
        frequency:      frequency.to_owned(),
        expected_years: expected,
        implied_years:  implied,
      });
    }
  }

  if record.due_date.is_none() {
    issues.push(AuditIssue::MissingDueDate);
  }
  if record.is_blank(RecordField::Owner) {
    issues.push(AuditIssue::MissingOwner);
  }

  if let (Some(start), Some(end)) = (record.period_start, record.period_end)
    && start > end
  {
    issues.push(AuditIssue::InvertedPeriod);
  }
  if let (Some(end), Some(due)) = (record.period_end, record.due_date)
    && due < end
  {
    issues.push(AuditIssue::DueBeforePeriodEnd);
  }
  if let (Some(stored), Some(expected)) = (record.due_date, expected_due_date(record, policy))
    && stored != expected
  {
    issues.push(AuditIssue::DueDateDrift { stored, expected });
  }

  issues
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::record::fixtures::{date, record};

  fn complete() -> Record {
    let mut r = record(1, "TD001");
    r.owner = Some("Sam".into());
    r.period_start = Some(date("2024-01-01"));
    r.period_end = Some(date("2024-12-31"));
    r.due_date = Some(date("2025-03-31"));
    r
  }

  #[test]
  fn clean_record_has_no_issues() {
    let mut r = complete();
    r.classification = Some("IIb".into());
    r.frequency = Some("Annual".into());
    assert!(audit(&r, &RolloverPolicy::default()).is_empty());
  }

  #[test]
  fn iia_with_annual_frequency_is_flagged() {
    let mut r = complete();
    r.classification = Some("IIa".into());
    r.frequency = Some("Annual".into());
    let issues = audit(&r, &RolloverPolicy::default());
    assert_eq!(issues, vec![AuditIssue::FrequencyMismatch {
      classification: "IIa".into(),
      frequency:      "Annual".into(),
      expected_years: 2,
      implied_years:  1,
    }]);
  }

  #[test]
  fn class_three_with_biennial_is_flagged() {
    let mut r = complete();
    r.classification = Some("III".into());
    r.frequency = Some("Biennial".into());
    let issues = audit(&r, &RolloverPolicy::default());
    assert!(matches!(issues[0], AuditIssue::FrequencyMismatch { expected_years: 1, .. }));
  }

  #[test]
  fn completeness_and_date_order() {
    let mut r = record(1, "TD001");
    r.period_start = Some(date("2025-01-01"));
    r.period_end = Some(date("2024-12-31"));
    let issues = audit(&r, &RolloverPolicy::default());
    assert_eq!(issues, vec![
      AuditIssue::MissingDueDate,
      AuditIssue::MissingOwner,
      AuditIssue::InvertedPeriod,
    ]);

    r.due_date = Some(date("2024-06-01"));
    assert!(audit(&r, &RolloverPolicy::default()).contains(&AuditIssue::DueBeforePeriodEnd));
  }

  #[test]
  fn due_date_drift_is_reported_not_repaired() {
    let mut r = complete();
    r.due_date = Some(date("2025-04-30"));
    let policy = RolloverPolicy::default();
    assert_eq!(expected_due_date(&r, &policy), Some(date("2025-03-31")));
    assert_eq!(audit(&r, &policy), vec![AuditIssue::DueDateDrift {
      stored:   date("2025-04-30"),
      expected: date("2025-03-31"),
    }]);
    assert_eq!(r.due_date, Some(date("2025-04-30")));

    let shorter = RolloverPolicy { submission_buffer_days: 60, ..RolloverPolicy::default() };
    assert!(matches!(
      audit(&complete(), &shorter)[..],
      [AuditIssue::DueDateDrift { expected, .. }] if expected == date("2025-03-01")
    ));
  }
}
