//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings (microsecond
//! precision, `Z` suffix) so that text comparison orders them and `MAX()`
//! works in SQL. Calendar dates are `YYYY-MM-DD`. External links are a
//! compact JSON object.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use psur_core::{
  patch::{FieldPatch, RecordPatch},
  record::{ExternalLinks, NewRecord, Record},
};
use rusqlite::types::Value;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

fn decode_opt_date(s: Option<String>) -> Result<Option<NaiveDate>> {
  s.as_deref().map(decode_date).transpose()
}

// ─── External links ──────────────────────────────────────────────────────────

pub fn encode_links(links: &ExternalLinks) -> Result<String> {
  Ok(serde_json::to_string(links)?)
}

pub fn decode_links(s: &str) -> Result<ExternalLinks> {
  if s.trim().is_empty() {
    return Ok(ExternalLinks::new());
  }
  Ok(serde_json::from_str(s)?)
}

// ─── Patches ─────────────────────────────────────────────────────────────────

fn text(v: Option<String>) -> Value { v.map_or(Value::Null, Value::Text) }

fn date(v: Option<NaiveDate>) -> Value {
  v.map_or(Value::Null, |d| Value::Text(encode_date(d)))
}

/// The column written by a field patch, and the value to write.
pub fn encode_field_patch(patch: &FieldPatch) -> (&'static str, Value) {
  match patch.clone() {
    FieldPatch::ReportNumber(v) => ("report_number", text(v)),
    FieldPatch::ReportType(v) => ("report_type", text(v)),
    FieldPatch::Classification(v) => ("classification", text(v)),
    FieldPatch::ProductName(v) => ("product_name", text(v)),
    FieldPatch::CatalogNumber(v) => ("catalog_number", text(v)),
    FieldPatch::Owner(v) => ("owner", text(v)),
    FieldPatch::OwnerContact(v) => ("owner_contact", text(v)),
    FieldPatch::PeriodStart(v) => ("period_start", date(v)),
    FieldPatch::PeriodEnd(v) => ("period_end", date(v)),
    FieldPatch::Frequency(v) => ("frequency", text(v)),
    FieldPatch::DueDate(v) => ("due_date", date(v)),
    FieldPatch::Status(v) => ("status", text(v)),
    FieldPatch::RegionFlag(v) => ("region_flag", text(v)),
    FieldPatch::RegionStatus(v) => ("region_status", text(v)),
    FieldPatch::Notes(v) => ("notes", text(v)),
  }
}

/// Column assignments for `patch`. When a field appears more than once the
/// later value wins.
pub fn encode_patch(patch: &RecordPatch) -> Vec<(&'static str, Value)> {
  let mut columns: Vec<(&'static str, Value)> = Vec::with_capacity(patch.len());
  for (column, value) in patch.iter().map(encode_field_patch) {
    match columns.iter_mut().find(|(c, _)| *c == column) {
      Some(slot) => slot.1 = value,
      None => columns.push((column, value)),
    }
  }
  columns
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawRecord::from_row`], in order.
pub const RECORD_COLUMNS: &str = "
  record_id, tracking_number, report_number, report_type, classification,
  product_name, catalog_number, owner, owner_contact, period_start,
  period_end, frequency, due_date, status, region_flag, region_status,
  notes, external_links, created_at, updated_at, version,
  parent_tracking_number, auto_generated";

/// Columns bound by [`NewRow::params`], in order.
pub const INSERT_COLUMNS: &str = "
  tracking_number, report_number, report_type, classification,
  product_name, catalog_number, owner, owner_contact, period_start,
  period_end, frequency, due_date, status, region_flag, region_status,
  notes, external_links, created_at, updated_at, version,
  parent_tracking_number, auto_generated";

/// `INSERT` statement binding every [`INSERT_COLUMNS`] value positionally.
pub fn insert_sql() -> String {
  let placeholders: Vec<String> = (1..=INSERT_COLUMNS.split(',').count())
    .map(|i| format!("?{i}"))
    .collect();
  format!("INSERT INTO records ({INSERT_COLUMNS}) VALUES ({})", placeholders.join(", "))
}

/// Raw values read directly from a `records` row.
pub struct RawRecord {
  pub record_id:              i64,
  pub tracking_number:        String,
  pub report_number:          Option<String>,
  pub report_type:            Option<String>,
  pub classification:         Option<String>,
  pub product_name:           Option<String>,
  pub catalog_number:         Option<String>,
  pub owner:                  Option<String>,
  pub owner_contact:          Option<String>,
  pub period_start:           Option<String>,
  pub period_end:             Option<String>,
  pub frequency:              Option<String>,
  pub due_date:               Option<String>,
  pub status:                 Option<String>,
  pub region_flag:            Option<String>,
  pub region_status:          Option<String>,
  pub notes:                  Option<String>,
  pub external_links:         String,
  pub created_at:             String,
  pub updated_at:             String,
  pub version:                u32,
  pub parent_tracking_number: Option<String>,
  pub auto_generated:         bool,
}

impl RawRecord {
  /// Read a row selected with [`RECORD_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:              row.get(0)?,
      tracking_number:        row.get(1)?,
      report_number:          row.get(2)?,
      report_type:            row.get(3)?,
      classification:         row.get(4)?,
      product_name:           row.get(5)?,
      catalog_number:         row.get(6)?,
      owner:                  row.get(7)?,
      owner_contact:          row.get(8)?,
      period_start:           row.get(9)?,
      period_end:             row.get(10)?,
      frequency:              row.get(11)?,
      due_date:               row.get(12)?,
      status:                 row.get(13)?,
      region_flag:            row.get(14)?,
      region_status:          row.get(15)?,
      notes:                  row.get(16)?,
      external_links:         row.get(17)?,
      created_at:             row.get(18)?,
      updated_at:             row.get(19)?,
      version:                row.get(20)?,
      parent_tracking_number: row.get(21)?,
      auto_generated:         row.get(22)?,
    })
  }

  pub fn into_record(self) -> Result<Record> {
    Ok(Record {
      record_id:              self.record_id,
      tracking_number:        self.tracking_number,
      report_number:          self.report_number,
      report_type:            self.report_type,
      classification:         self.classification,
      product_name:           self.product_name,
      catalog_number:         self.catalog_number,
      owner:                  self.owner,
      owner_contact:          self.owner_contact,
      period_start:           decode_opt_date(self.period_start)?,
      period_end:             decode_opt_date(self.period_end)?,
      frequency:              self.frequency,
      due_date:               decode_opt_date(self.due_date)?,
      status:                 self.status,
      region_flag:            self.region_flag,
      region_status:          self.region_status,
      notes:                  self.notes,
      external_links:         decode_links(&self.external_links)?,
      created_at:             decode_dt(&self.created_at)?,
      updated_at:             decode_dt(&self.updated_at)?,
      version:                self.version,
      parent_tracking_number: self.parent_tracking_number,
      auto_generated:         self.auto_generated,
    })
  }
}

/// A [`NewRecord`] flattened into owned column values, ready to move onto
/// the database thread. The tracking number is bound separately because it
/// may be generated inside the insert transaction.
pub struct NewRow {
  values: Vec<Value>,
}

impl NewRow {
  pub fn encode(input: &NewRecord, now: DateTime<Utc>) -> Result<Self> {
    let now = encode_dt(now);
    let values = vec![
      text(input.report_number.clone()),
      text(input.report_type.clone()),
      text(input.classification.clone()),
      text(input.product_name.clone()),
      text(input.catalog_number.clone()),
      text(input.owner.clone()),
      text(input.owner_contact.clone()),
      date(input.period_start),
      date(input.period_end),
      text(input.frequency.clone()),
      date(input.due_date),
      text(input.status.clone()),
      text(input.region_flag.clone()),
      text(input.region_status.clone()),
      text(input.notes.clone()),
      Value::Text(encode_links(&input.external_links)?),
      Value::Text(now.clone()),
      Value::Text(now),
      Value::Integer(1),
      text(input.parent_tracking_number.clone()),
      Value::Integer(i64::from(input.auto_generated)),
    ];
    Ok(Self { values })
  }

  /// All [`INSERT_COLUMNS`] values, tracking number first.
  pub fn params(self, tracking_number: String) -> Vec<Value> {
    let mut params = Vec::with_capacity(self.values.len() + 1);
    params.push(Value::Text(tracking_number));
    params.extend(self.values);
    params
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_are_fixed_width_and_ordered() {
    let a = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
    let b = a + chrono::Duration::microseconds(1);
    let (ea, eb) = (encode_dt(a), encode_dt(b));
    assert_eq!(ea.len(), eb.len());
    assert!(ea < eb);
    assert_eq!(decode_dt(&ea).unwrap(), a);
  }

  #[test]
  fn later_patch_for_same_column_wins() {
    let patch = RecordPatch::new()
      .set(FieldPatch::Status(Some("Draft".into())))
      .set(FieldPatch::Owner(Some("Sam".into())))
      .set(FieldPatch::Status(None));
    let columns = encode_patch(&patch);
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0], ("status", Value::Null));
    assert_eq!(columns[1], ("owner", Value::Text("Sam".into())));
  }

  #[test]
  fn insert_columns_and_values_line_up() {
    let row = NewRow::encode(&NewRecord::default(), Utc::now()).unwrap();
    let n_columns = INSERT_COLUMNS.split(',').count();
    assert_eq!(row.params("TD001".into()).len(), n_columns);
  }
}
