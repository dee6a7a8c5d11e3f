//! The `ScheduleStore` trait and supporting result types.
//!
//! The trait is implemented by storage backends (e.g. `psur-store-sqlite`).
//! Higher layers (`psur-api`, the rollover engine) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  patch::RecordPatch,
  query::RecordFilter,
  record::{CreatedRecord, ExternalLinks, NewRecord, Record},
};

/// Result of [`ScheduleStore::update_all_matching`].
///
/// Bulk updates are not transactional as a unit. Each record is updated
/// atomically in insertion order; if one fails the loop stops, `updated`
/// says how far it got and `failure` carries the reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOutcome {
  /// Records satisfying the criteria when the operation started.
  pub matched: usize,
  /// Records actually mutated.
  pub updated: usize,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub failure: Option<String>,
}

impl BulkOutcome {
  pub fn is_complete(&self) -> bool {
    self.failure.is_none() && self.updated == self.matched
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a schedule store backend.
///
/// Tracking numbers are not unique. Single-record operations are explicit
/// about acting on the *first* match in insertion order; deletion always
/// acts on every match.
///
/// "Not found" is an ordinary outcome (`None`, `false`, an empty list), never
/// an error. Backends do not validate field values; that is the boundary's
/// job.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ScheduleStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Persist a new record. A missing or blank tracking number is generated
  /// from the store's identifier format. Duplicate tracking numbers are
  /// accepted. Sets `created_at = updated_at = now` and `version = 1`.
  fn create(
    &self,
    input: NewRecord,
  ) -> impl Future<Output = Result<CreatedRecord, Self::Error>> + Send + '_;

  /// Apply `patch` to the first record with `tracking_number`.
  ///
  /// Bumps `version` and `updated_at`. Returns `false` when nothing matched
  /// or the patch is empty.
  fn update_first<'a>(
    &'a self,
    tracking_number: &'a str,
    patch: &'a RecordPatch,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Apply `patch` to every record satisfying `filter`.
  fn update_all_matching<'a>(
    &'a self,
    filter: &'a RecordFilter,
    patch: &'a RecordPatch,
  ) -> impl Future<Output = Result<BulkOutcome, Self::Error>> + Send + 'a;

  /// Append a timestamped line to the first matching record's notes.
  /// Blank text is a no-op returning `false`.
  fn append_note<'a>(
    &'a self,
    tracking_number: &'a str,
    text: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Merge named URLs into the first matching record's external links.
  /// Only non-empty URLs are written; if none remain this is a no-op
  /// returning `false`.
  fn attach_links<'a>(
    &'a self,
    tracking_number: &'a str,
    links: &'a ExternalLinks,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Remove every record with `tracking_number`. Returns whether any were
  /// removed.
  fn delete<'a>(
    &'a self,
    tracking_number: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// The first record with `tracking_number`, in insertion order.
  fn read_first<'a>(
    &'a self,
    tracking_number: &'a str,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + 'a;

  /// Every record with `tracking_number`, in insertion order.
  fn read_all<'a>(
    &'a self,
    tracking_number: &'a str,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + 'a;

  /// The first record with `report_number`, in insertion order.
  fn read_by_report_number<'a>(
    &'a self,
    report_number: &'a str,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + 'a;

  /// A point-in-time snapshot of the whole collection in insertion order.
  /// The query engine and statistics aggregator run over this.
  fn list_records(
    &self,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + '_;
}
