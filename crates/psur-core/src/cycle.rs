//! Reporting-cycle rules and period arithmetic.
//!
//! How many years a reporting period spans is a jurisdiction rule, so it
//! lives in an ordered table ([`RolloverPolicy::rules`]) instead of in the
//! rollover algorithm. The first rule whose pattern matches decides; when
//! none does, [`RolloverPolicy::default_years`] applies.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Which record field a [`CycleRule`] inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleField {
  Classification,
  Frequency,
}

/// `field` contains any of `contains` (case-insensitive) => `years`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleRule {
  pub field:    RuleField,
  pub contains: Vec<String>,
  pub years:    u32,
}

impl CycleRule {
  pub fn new(field: RuleField, contains: &[&str], years: u32) -> Self {
    Self {
      field,
      contains: contains.iter().map(|s| (*s).to_owned()).collect(),
      years,
    }
  }

  /// Whether the rule's pattern occurs in `value`.
  pub fn matches_value(&self, value: &str) -> bool {
    let value = value.to_lowercase();
    self.contains.iter().any(|p| value.contains(&p.to_lowercase()))
  }

  pub fn matches(&self, classification: Option<&str>, frequency: Option<&str>) -> bool {
    let value = match self.field {
      RuleField::Classification => classification,
      RuleField::Frequency => frequency,
    };
    value.is_some_and(|v| self.matches_value(v))
  }
}

/// Everything the rollover engine needs to know about the next cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloverPolicy {
  /// Evaluated in order; first match wins.
  pub rules:                  Vec<CycleRule>,
  /// Cycle length when no rule matches.
  pub default_years:          u32,
  /// Days between the end of a period and its submission deadline.
  pub submission_buffer_days: u64,
  /// Status given to freshly spawned records.
  pub initial_status:         String,
}

impl Default for RolloverPolicy {
  /// Class IIa reports every two years; otherwise the frequency label
  /// decides (biennial, five-yearly); everything else (classes I, IIb, III,
  /// unspecified) is annual.
  fn default() -> Self {
    Self {
      rules:                  vec![
        CycleRule::new(RuleField::Classification, &["iia", "ii a"], 2),
        CycleRule::new(RuleField::Frequency, &["bienn"], 2),
        CycleRule::new(RuleField::Frequency, &["5"], 5),
      ],
      default_years:          1,
      submission_buffer_days: 90,
      initial_status:         "Not started".to_owned(),
    }
  }
}

impl RolloverPolicy {
  /// Cycle length for the given classification/frequency pair.
  pub fn cycle_years_for(&self, classification: Option<&str>, frequency: Option<&str>) -> u32 {
    self
      .rules
      .iter()
      .find(|rule| rule.matches(classification, frequency))
      .map_or(self.default_years, |rule| rule.years)
  }

  /// Cycle length for `record`.
  pub fn cycle_years(&self, record: &Record) -> u32 {
    self.cycle_years_for(record.classification.as_deref(), record.frequency.as_deref())
  }

  /// Cycle length implied by the classification alone, if a rule covers it.
  pub fn years_by_classification(&self, classification: &str) -> Option<u32> {
    self
      .rules
      .iter()
      .filter(|r| r.field == RuleField::Classification)
      .find(|r| r.matches_value(classification))
      .map(|r| r.years)
  }

  /// Cycle length implied by the frequency label alone.
  pub fn years_by_frequency(&self, frequency: &str) -> u32 {
    self.cycle_years_for(None, Some(frequency))
  }

  /// The period following one that ended on `previous_end`.
  pub fn successor_period(&self, previous_end: NaiveDate, years: u32) -> Option<ReportingPeriod> {
    ReportingPeriod::successor(previous_end, years, self.submission_buffer_days)
  }
}

// ─── Period arithmetic ───────────────────────────────────────────────────────

/// An inclusive reporting period and its submission deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingPeriod {
  pub start: NaiveDate,
  pub end:   NaiveDate,
  pub due:   NaiveDate,
}

impl ReportingPeriod {
  /// start = `previous_end` + 1 day; end = start + `years` - 1 day;
  /// due = end + `buffer_days`.
  ///
  /// Returns `None` only if the dates leave chrono's representable range.
  ///
  /// A period starting on Feb 29 ends on Feb 27: the month addition clamps to
  /// Feb 28 before the day is subtracted. Every later cycle then starts on
  /// Feb 28.
  pub fn successor(previous_end: NaiveDate, years: u32, buffer_days: u64) -> Option<Self> {
    let start = previous_end.checked_add_days(Days::new(1))?;
    let end = start
      .checked_add_months(Months::new(years.checked_mul(12)?))?
      .checked_sub_days(Days::new(1))?;
    let due = end.checked_add_days(Days::new(buffer_days))?;
    Some(Self { start, end, due })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::record::fixtures::date;

  #[test]
  fn classification_outranks_frequency() {
    let p = RolloverPolicy::default();
    assert_eq!(p.cycle_years_for(Some("IIa"), Some("Annual")), 2);
    assert_eq!(p.cycle_years_for(Some("Class II a"), None), 2);
  }

  #[test]
  fn frequency_fallbacks() {
    let p = RolloverPolicy::default();
    assert_eq!(p.cycle_years_for(Some("IIb"), Some("Biennial")), 2);
    assert_eq!(p.cycle_years_for(None, Some("Every 5 years")), 5);
    assert_eq!(p.cycle_years_for(Some("III"), None), 1);
    assert_eq!(p.cycle_years_for(Some("I"), Some("Annual")), 1);
    assert_eq!(p.cycle_years_for(None, None), 1);
  }

  #[test]
  fn class_three_is_not_mistaken_for_iia() {
    let p = RolloverPolicy::default();
    assert_eq!(p.cycle_years_for(Some("III"), Some("annual")), 1);
    assert_eq!(p.years_by_classification("IIb"), None);
  }

  #[test]
  fn rule_table_is_replaceable() {
    let p = RolloverPolicy {
      rules: vec![CycleRule::new(RuleField::Classification, &["III"], 3)],
      default_years: 4,
      ..RolloverPolicy::default()
    };
    assert_eq!(p.cycle_years_for(Some("iii"), None), 3);
    assert_eq!(p.cycle_years_for(Some("IIa"), None), 4);
  }

  #[test]
  fn two_year_successor() {
    let period = ReportingPeriod::successor(date("2024-06-30"), 2, 90).unwrap();
    assert_eq!(period.start, date("2024-07-01"));
    assert_eq!(period.end, date("2026-06-30"));
    assert_eq!(period.due, date("2026-09-28"));
  }

  #[test]
  fn year_end_rollover() {
    let period = ReportingPeriod::successor(date("2024-12-31"), 1, 90).unwrap();
    assert_eq!(period.start, date("2025-01-01"));
    assert_eq!(period.end, date("2025-12-31"));
    assert_eq!(period.due, date("2026-03-31"));
  }

  #[test]
  fn leap_day_start_shifts_later_cycles_to_feb_28() {
    let period = ReportingPeriod::successor(date("2024-02-28"), 1, 90).unwrap();
    assert_eq!(period.start, date("2024-02-29"));
    assert_eq!(period.end, date("2025-02-27"));
    assert_eq!(period.due, date("2025-05-28"));

    let next = ReportingPeriod::successor(period.end, 1, 90).unwrap();
    assert_eq!(next.start, date("2025-02-28"));
    assert_eq!(next.end, date("2026-02-27"));
  }

  #[test]
  fn policy_deserializes_with_defaults() {
    let p: RolloverPolicy =
      serde_json::from_str(r#"{ "submission_buffer_days": 60 }"#).unwrap();
    assert_eq!(p.submission_buffer_days, 60);
    assert_eq!(p.rules, RolloverPolicy::default().rules);
  }
}
