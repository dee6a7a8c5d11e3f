//! Sparse partial updates.
//!
//! A [`RecordPatch`] is an ordered list of [`FieldPatch`]es. Each variant
//! names exactly one field and carries its new value; `None` clears the
//! field. Fields that are not mentioned are left untouched.
//!
//! The store applies patches without validating them. Validation happens
//! here, when a loosely-typed field map arriving at the boundary is turned
//! into a patch ([`RecordPatch::from_json_map`]).

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
  Error, Result,
  record::{NewRecord, Record, RecordField},
};

/// Date layouts accepted at the boundary, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Parse a calendar date in one of the accepted layouts, or an RFC 3339
/// timestamp (whose date part is kept).
pub fn parse_date(text: &str) -> Option<NaiveDate> {
  let text = text.trim();
  DATE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
    .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
}

// ─── FieldPatch ──────────────────────────────────────────────────────────────

/// A single-field update. The variant is the field; the payload is the new
/// value, with `None` meaning "clear".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldPatch {
  ReportNumber(Option<String>),
  ReportType(Option<String>),
  Classification(Option<String>),
  ProductName(Option<String>),
  CatalogNumber(Option<String>),
  Owner(Option<String>),
  OwnerContact(Option<String>),
  PeriodStart(Option<NaiveDate>),
  PeriodEnd(Option<NaiveDate>),
  Frequency(Option<String>),
  DueDate(Option<NaiveDate>),
  Status(Option<String>),
  RegionFlag(Option<String>),
  RegionStatus(Option<String>),
  Notes(Option<String>),
}

impl FieldPatch {
  /// The field this patch writes.
  pub fn field(&self) -> RecordField {
    match self {
      Self::ReportNumber(_) => RecordField::ReportNumber,
      Self::ReportType(_) => RecordField::ReportType,
      Self::Classification(_) => RecordField::Classification,
      Self::ProductName(_) => RecordField::ProductName,
      Self::CatalogNumber(_) => RecordField::CatalogNumber,
      Self::Owner(_) => RecordField::Owner,
      Self::OwnerContact(_) => RecordField::OwnerContact,
      Self::PeriodStart(_) => RecordField::PeriodStart,
      Self::PeriodEnd(_) => RecordField::PeriodEnd,
      Self::Frequency(_) => RecordField::Frequency,
      Self::DueDate(_) => RecordField::DueDate,
      Self::Status(_) => RecordField::Status,
      Self::RegionFlag(_) => RecordField::RegionFlag,
      Self::RegionStatus(_) => RecordField::RegionStatus,
      Self::Notes(_) => RecordField::Notes,
    }
  }

  /// A patch that clears `field`.
  pub fn clear(field: RecordField) -> Result<Self> {
    Self::from_json(field, &Value::Null)
  }

  /// Build a patch for `field` from a loosely-typed JSON value.
  ///
  /// `null` and blank strings clear the field. Numbers and booleans are
  /// accepted for text fields (spreadsheets like to hand those out for
  /// catalog numbers and yes/no flags). Date fields must parse with
  /// [`parse_date`].
  pub fn from_json(field: RecordField, value: &Value) -> Result<Self> {
    let name = field.as_ref();
    let text = match value {
      Value::Null => None,
      Value::String(s) if s.trim().is_empty() => None,
      Value::String(s) => Some(s.trim().to_owned()),
      Value::Number(n) => Some(n.to_string()),
      Value::Bool(b) => Some(if *b { "Yes" } else { "No" }.to_owned()),
      Value::Array(_) | Value::Object(_) => {
        return Err(Error::validation(name, "expected a string"));
      }
    };

    let date = |text: Option<String>| -> Result<Option<NaiveDate>> {
      text
        .map(|t| {
          parse_date(&t).ok_or_else(|| {
            Error::validation(name, format!("unparseable date {t:?}"))
          })
        })
        .transpose()
    };

    Ok(match field {
      RecordField::TrackingNumber => {
        return Err(Error::ReadOnlyField(name.to_owned()));
      }
      RecordField::ReportNumber => Self::ReportNumber(text),
      RecordField::ReportType => Self::ReportType(text),
      RecordField::Classification => Self::Classification(text),
      RecordField::ProductName => Self::ProductName(text),
      RecordField::CatalogNumber => Self::CatalogNumber(text),
      RecordField::Owner => Self::Owner(text),
      RecordField::OwnerContact => Self::OwnerContact(text),
      RecordField::PeriodStart => Self::PeriodStart(date(text)?),
      RecordField::PeriodEnd => Self::PeriodEnd(date(text)?),
      RecordField::Frequency => Self::Frequency(text),
      RecordField::DueDate => Self::DueDate(date(text)?),
      RecordField::Status => Self::Status(text),
      RecordField::RegionFlag => Self::RegionFlag(text),
      RecordField::RegionStatus => Self::RegionStatus(text),
      RecordField::Notes => Self::Notes(text),
    })
  }

  pub fn apply(&self, r: &mut Record) {
    match self.clone() {
      Self::ReportNumber(v) => r.report_number = v,
      Self::ReportType(v) => r.report_type = v,
      Self::Classification(v) => r.classification = v,
      Self::ProductName(v) => r.product_name = v,
      Self::CatalogNumber(v) => r.catalog_number = v,
      Self::Owner(v) => r.owner = v,
      Self::OwnerContact(v) => r.owner_contact = v,
      Self::PeriodStart(v) => r.period_start = v,
      Self::PeriodEnd(v) => r.period_end = v,
      Self::Frequency(v) => r.frequency = v,
      Self::DueDate(v) => r.due_date = v,
      Self::Status(v) => r.status = v,
      Self::RegionFlag(v) => r.region_flag = v,
      Self::RegionStatus(v) => r.region_status = v,
      Self::Notes(v) => r.notes = v,
    }
  }

  pub fn apply_new(&self, r: &mut NewRecord) {
    match self.clone() {
      Self::ReportNumber(v) => r.report_number = v,
      Self::ReportType(v) => r.report_type = v,
      Self::Classification(v) => r.classification = v,
      Self::ProductName(v) => r.product_name = v,
      Self::CatalogNumber(v) => r.catalog_number = v,
      Self::Owner(v) => r.owner = v,
      Self::OwnerContact(v) => r.owner_contact = v,
      Self::PeriodStart(v) => r.period_start = v,
      Self::PeriodEnd(v) => r.period_end = v,
      Self::Frequency(v) => r.frequency = v,
      Self::DueDate(v) => r.due_date = v,
      Self::Status(v) => r.status = v,
      Self::RegionFlag(v) => r.region_flag = v,
      Self::RegionStatus(v) => r.region_status = v,
      Self::Notes(v) => r.notes = v,
    }
  }
}

// ─── RecordPatch ─────────────────────────────────────────────────────────────

/// An ordered set of field updates. Later entries for the same field win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordPatch(Vec<FieldPatch>);

impl RecordPatch {
  pub fn new() -> Self { Self::default() }

  /// Builder-style push.
  pub fn set(mut self, patch: FieldPatch) -> Self {
    self.0.push(patch);
    self
  }

  pub fn push(&mut self, patch: FieldPatch) { self.0.push(patch); }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn iter(&self) -> impl Iterator<Item = &FieldPatch> { self.0.iter() }

  /// Validate a `{ "field_name": value, ... }` map into a patch. Errors name
  /// the offending field.
  pub fn from_json_map(map: &Map<String, Value>) -> Result<Self> {
    map
      .iter()
      .map(|(key, value)| {
        let field = key
          .parse::<RecordField>()
          .map_err(|_| Error::UnknownField(key.clone()))?;
        FieldPatch::from_json(field, value)
      })
      .collect::<Result<Vec<_>>>()
      .map(Self)
  }

  pub fn apply(&self, record: &mut Record) {
    self.0.iter().for_each(|p| p.apply(record));
  }

  pub fn apply_new(&self, record: &mut NewRecord) {
    self.0.iter().for_each(|p| p.apply_new(record));
  }
}

impl From<Vec<FieldPatch>> for RecordPatch {
  fn from(patches: Vec<FieldPatch>) -> Self { Self(patches) }
}

impl FromIterator<FieldPatch> for RecordPatch {
  fn from_iter<I: IntoIterator<Item = FieldPatch>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

// ─── Create input ────────────────────────────────────────────────────────────

/// Validate a loosely-typed field map into a [`NewRecord`].
///
/// Accepts every [`RecordField`] (including `tracking_number`) plus
/// `external_links`, an object of name to URL strings.
pub fn new_record_from_json(map: &Map<String, Value>) -> Result<NewRecord> {
  let mut record = NewRecord::default();
  for (key, value) in map {
    match key.as_str() {
      "tracking_number" => {
        record.tracking_number = match value {
          Value::Null => None,
          Value::String(s) => Some(s.trim().to_owned()),
          Value::Number(n) => Some(n.to_string()),
          _ => return Err(Error::validation(key.as_str(), "expected a string")),
        };
      }
      "external_links" => {
        let Value::Object(links) = value else {
          return Err(Error::validation(key.as_str(), "expected an object of URLs"));
        };
        for (name, url) in links {
          let Value::String(url) = url else {
            return Err(Error::validation(key.as_str(), format!("link {name:?} is not a string")));
          };
          record.external_links.insert(name.clone(), url.clone());
        }
      }
      _ => {
        let field = key
          .parse::<RecordField>()
          .map_err(|_| Error::UnknownField(key.clone()))?;
        FieldPatch::from_json(field, value)?.apply_new(&mut record);
      }
    }
  }
  Ok(record)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::record::fixtures::{date, record};

  fn map(v: Value) -> Map<String, Value> {
    match v {
      Value::Object(m) => m,
      _ => unreachable!(),
    }
  }

  #[test]
  fn parses_accepted_date_layouts() {
    assert_eq!(parse_date("2024-06-30"), Some(date("2024-06-30")));
    assert_eq!(parse_date("06/30/2024"), Some(date("2024-06-30")));
    assert_eq!(parse_date("2024/06/30"), Some(date("2024-06-30")));
    assert_eq!(parse_date("2024-06-30T10:00:00Z"), Some(date("2024-06-30")));
    assert_eq!(parse_date("next tuesday"), None);
  }

  #[test]
  fn field_map_becomes_patch() {
    let patch = RecordPatch::from_json_map(&map(json!({
      "status": "In progress",
      "due_date": "2026-01-15",
      "region_status": null,
    })))
    .unwrap();

    let mut r = record(1, "TD001");
    r.region_status = Some("Submitted".into());
    patch.apply(&mut r);

    assert_eq!(r.status.as_deref(), Some("In progress"));
    assert_eq!(r.due_date, Some(date("2026-01-15")));
    assert_eq!(r.region_status, None);
  }

  #[test]
  fn bad_date_names_the_field() {
    let err = RecordPatch::from_json_map(&map(json!({ "period_end": "soon" })))
      .unwrap_err();
    assert_eq!(err.field(), "period_end");
  }

  #[test]
  fn unknown_and_read_only_fields_are_rejected() {
    let err = RecordPatch::from_json_map(&map(json!({ "colour": "red" })))
      .unwrap_err();
    assert!(matches!(err, Error::UnknownField(ref f) if f == "colour"));

    let err =
      RecordPatch::from_json_map(&map(json!({ "tracking_number": "TD9" })))
        .unwrap_err();
    assert!(matches!(err, Error::ReadOnlyField(_)));
  }

  #[test]
  fn numbers_and_flags_become_text() {
    let patch = RecordPatch::from_json_map(&map(json!({
      "catalog_number": 12345,
      "region_flag": true,
    })))
    .unwrap();
    let mut r = record(1, "TD001");
    patch.apply(&mut r);
    assert_eq!(r.catalog_number.as_deref(), Some("12345"));
    assert_eq!(r.region_flag.as_deref(), Some("Yes"));
  }

  #[test]
  fn create_map_accepts_tracking_number_and_links() {
    let input = new_record_from_json(&map(json!({
      "tracking_number": " TD042 ",
      "product_name": "Stent",
      "due_date": "03/31/2025",
      "external_links": { "sharepoint": "https://sp.example/42" },
    })))
    .unwrap();
    assert_eq!(input.explicit_tracking_number(), Some("TD042"));
    assert_eq!(input.product_name.as_deref(), Some("Stent"));
    assert_eq!(input.due_date, Some(date("2025-03-31")));
    assert_eq!(input.external_links["sharepoint"], "https://sp.example/42");

    let err = new_record_from_json(&map(json!({ "external_links": ["x"] }))).unwrap_err();
    assert_eq!(err.field(), "external_links");
  }

  #[test]
  fn tagged_wire_form() {
    let p = FieldPatch::Status(Some("Done".into()));
    assert_eq!(
      serde_json::to_value(&p).unwrap(),
      json!({ "field": "status", "value": "Done" }),
    );
  }
}
