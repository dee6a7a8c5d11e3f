//! Record, the central entity of the schedule.
//!
//! A record describes one periodic safety update report obligation: which
//! product it covers, who writes it, which reporting period it spans and when
//! it is due. Tracking numbers are deliberately *not* unique; several records
//! (e.g. distinct products under one filing) may share one.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Named URLs to related systems (document control, shared drives, ...).
pub type ExternalLinks = BTreeMap<String, String>;

// ─── Field vocabulary ────────────────────────────────────────────────────────

/// Canonical names of the caller-visible record fields.
///
/// The snake_case spelling is the vocabulary shared with every collaborator
/// (transport, UI, import tooling).
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordField {
  TrackingNumber,
  ReportNumber,
  ReportType,
  Classification,
  ProductName,
  CatalogNumber,
  Owner,
  OwnerContact,
  PeriodStart,
  PeriodEnd,
  Frequency,
  DueDate,
  Status,
  RegionFlag,
  RegionStatus,
  Notes,
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A persisted compliance record.
///
/// `created_at`, `updated_at` and `version` are owned by the store; every
/// mutation bumps `version` and moves `updated_at` forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
  /// Internal surrogate key. Its order is insertion order.
  pub record_id:              i64,
  pub tracking_number:        String,
  pub report_number:          Option<String>,
  pub report_type:            Option<String>,
  pub classification:         Option<String>,
  pub product_name:           Option<String>,
  pub catalog_number:         Option<String>,
  /// The assigned writer.
  pub owner:                  Option<String>,
  /// Contact e-mail for the writer.
  pub owner_contact:          Option<String>,
  pub period_start:           Option<NaiveDate>,
  pub period_end:             Option<NaiveDate>,
  pub frequency:              Option<String>,
  pub due_date:               Option<NaiveDate>,
  pub status:                 Option<String>,
  /// Whether the secondary jurisdiction needs a report for this cycle.
  pub region_flag:            Option<String>,
  pub region_status:          Option<String>,
  /// Append-only comment log, one stamped entry per line.
  pub notes:                  Option<String>,
  #[serde(default)]
  pub external_links:         ExternalLinks,
  pub created_at:             DateTime<Utc>,
  pub updated_at:             DateTime<Utc>,
  pub version:                u32,
  /// Set by the rollover engine to the record this one was spawned from.
  pub parent_tracking_number: Option<String>,
  #[serde(default)]
  pub auto_generated:         bool,
}

impl Record {
  /// Text form of a field, or `None` when it is absent.
  ///
  /// Dates render as ISO `YYYY-MM-DD`. Used by search, missing-field audits
  /// and the statistics histograms, which all treat fields as plain text.
  pub fn field_text(&self, field: RecordField) -> Option<String> {
    let text = |v: &Option<String>| v.clone();
    let date = |v: &Option<NaiveDate>| v.map(|d| d.to_string());
    match field {
      RecordField::TrackingNumber => Some(self.tracking_number.clone()),
      RecordField::ReportNumber => text(&self.report_number),
      RecordField::ReportType => text(&self.report_type),
      RecordField::Classification => text(&self.classification),
      RecordField::ProductName => text(&self.product_name),
      RecordField::CatalogNumber => text(&self.catalog_number),
      RecordField::Owner => text(&self.owner),
      RecordField::OwnerContact => text(&self.owner_contact),
      RecordField::PeriodStart => date(&self.period_start),
      RecordField::PeriodEnd => date(&self.period_end),
      RecordField::Frequency => text(&self.frequency),
      RecordField::DueDate => date(&self.due_date),
      RecordField::Status => text(&self.status),
      RecordField::RegionFlag => text(&self.region_flag),
      RecordField::RegionStatus => text(&self.region_status),
      RecordField::Notes => text(&self.notes),
    }
  }

  /// `true` when the field is absent or holds only whitespace.
  pub fn is_blank(&self, field: RecordField) -> bool {
    self
      .field_text(field)
      .is_none_or(|v| v.trim().is_empty())
  }

  /// Whether the due date lies strictly before `today`.
  pub fn is_overdue(&self, today: NaiveDate) -> bool {
    self.due_date.is_some_and(|d| d < today)
  }
}

// ─── NewRecord ───────────────────────────────────────────────────────────────

/// Input to [`crate::store::ScheduleStore::create`].
///
/// Every field is optional. A missing or blank `tracking_number` is generated
/// by the store. Timestamps and `version` are never accepted from callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewRecord {
  pub tracking_number:        Option<String>,
  pub report_number:          Option<String>,
  pub report_type:            Option<String>,
  pub classification:         Option<String>,
  pub product_name:           Option<String>,
  pub catalog_number:         Option<String>,
  pub owner:                  Option<String>,
  pub owner_contact:          Option<String>,
  pub period_start:           Option<NaiveDate>,
  pub period_end:             Option<NaiveDate>,
  pub frequency:              Option<String>,
  pub due_date:               Option<NaiveDate>,
  pub status:                 Option<String>,
  pub region_flag:            Option<String>,
  pub region_status:          Option<String>,
  pub notes:                  Option<String>,
  pub external_links:         ExternalLinks,
  #[serde(skip)]
  pub parent_tracking_number: Option<String>,
  #[serde(skip)]
  pub auto_generated:         bool,
}

impl NewRecord {
  /// Convenience constructor for a record with an explicit tracking number.
  pub fn with_tracking_number(tracking_number: impl Into<String>) -> Self {
    Self { tracking_number: Some(tracking_number.into()), ..Self::default() }
  }

  /// The supplied tracking number, if it is non-blank.
  pub fn explicit_tracking_number(&self) -> Option<&str> {
    self
      .tracking_number
      .as_deref()
      .map(str::trim)
      .filter(|tn| !tn.is_empty())
  }
}

impl From<Record> for NewRecord {
  /// Copy the caller-owned fields of an existing record. Store-managed
  /// fields and rollover provenance are dropped.
  fn from(r: Record) -> Self {
    Self {
      tracking_number:        Some(r.tracking_number),
      report_number:          r.report_number,
      report_type:            r.report_type,
      classification:         r.classification,
      product_name:           r.product_name,
      catalog_number:         r.catalog_number,
      owner:                  r.owner,
      owner_contact:          r.owner_contact,
      period_start:           r.period_start,
      period_end:             r.period_end,
      frequency:              r.frequency,
      due_date:               r.due_date,
      status:                 r.status,
      region_flag:            r.region_flag,
      region_status:          r.region_status,
      notes:                  r.notes,
      external_links:         r.external_links,
      parent_tracking_number: None,
      auto_generated:         false,
    }
  }
}

/// Identifiers assigned by a successful create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRecord {
  pub tracking_number: String,
  pub record_id:       i64,
}


#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::{fixtures::*, *};

  #[test]
  fn field_names_use_snake_case() {
    assert_eq!(RecordField::OwnerContact.as_ref(), "owner_contact");
    assert_eq!(RecordField::from_str("due_date").unwrap(), RecordField::DueDate);
    assert!(RecordField::from_str("dueDate").is_err());
  }

  #[test]
  fn whitespace_counts_as_blank() {
    let mut r = record(1, "TD001");
    r.owner = Some("   ".into());
    assert!(r.is_blank(RecordField::Owner));
    assert!(r.is_blank(RecordField::Status));
    assert!(!r.is_blank(RecordField::TrackingNumber));
  }

  #[test]
  fn dates_render_as_iso_text() {
    let mut r = record(1, "TD001");
    r.due_date = Some(date("2026-09-28"));
    assert_eq!(r.field_text(RecordField::DueDate).as_deref(), Some("2026-09-28"));
  }

  #[test]
  fn blank_tracking_number_is_not_explicit() {
    assert_eq!(NewRecord::with_tracking_number("  ").explicit_tracking_number(), None);
    assert_eq!(
      NewRecord::with_tracking_number(" TD004 ").explicit_tracking_number(),
      Some("TD004"),
    );
  }
}
