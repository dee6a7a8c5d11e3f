//! [`SqliteStore`]: the SQLite implementation of [`ScheduleStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, params, params_from_iter, types::Value};
use tracing::{debug, info, warn};

use psur_core::{
  identifier::IdentifierFormat,
  patch::RecordPatch,
  query::RecordFilter,
  record::{CreatedRecord, ExternalLinks, NewRecord, Record},
  store::{BulkOutcome, ScheduleStore},
};

use crate::{
  Result,
  encode::{
    NewRow, RECORD_COLUMNS, RawRecord, encode_dt, encode_links, encode_patch, insert_sql,
  },
  schema::SCHEMA,
};

/// Selects the first record (lowest `record_id`) carrying tracking number `?1`.
const FIRST_BY_TRACKING_NUMBER: &str =
  "(SELECT record_id FROM records WHERE tracking_number = ?1 ORDER BY record_id LIMIT 1)";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A PSUR schedule store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:        tokio_rusqlite::Connection,
  identifiers: IdentifierFormat,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, identifiers: IdentifierFormat::default() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, identifiers: IdentifierFormat::default() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Use `format` for generated tracking numbers.
  pub fn with_identifier_format(mut self, format: IdentifierFormat) -> Self {
    self.identifiers = format;
    self
  }

  pub fn identifier_format(&self) -> &IdentifierFormat { &self.identifiers }

  /// Run raw SQL against the connection, e.g. to install triggers in tests.
  #[cfg(test)]
  pub(crate) async fn execute_batch(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `SELECT <columns> FROM records <tail>` and decode every row.
  async fn select_records(&self, tail: &'static str, args: Vec<Value>) -> Result<Vec<Record>> {
    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM records {tail}");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(args), RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }

  /// Apply column assignments to the record picked by `target`, bumping
  /// `version` and moving `updated_at` forward.
  ///
  /// `target` is a SQL expression yielding a `record_id`; it may refer to
  /// `?1`, which is bound to `key`.
  async fn update_where(
    &self,
    target: &'static str,
    key: Value,
    columns: Vec<(&'static str, Value)>,
  ) -> Result<bool> {
    if columns.is_empty() {
      return Ok(false);
    }
    let now = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        let mut sql = String::from("UPDATE records SET ");
        let mut args = vec![key, Value::Text(now)];
        for (column, value) in columns {
          sql.push_str(column);
          sql.push_str(&format!(" = ?{}, ", args.len() + 1));
          args.push(value);
        }
        sql.push_str("updated_at = MAX(updated_at, ?2), version = version + 1 ");
        sql.push_str(&format!("WHERE record_id = {target}"));
        Ok(conn.execute(&sql, params_from_iter(args))?)
      })
      .await?;

    Ok(changed > 0)
  }
}

// ─── ScheduleStore impl ──────────────────────────────────────────────────────

impl ScheduleStore for SqliteStore {
  type Error = crate::Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn create(&self, input: NewRecord) -> Result<CreatedRecord> {
    let explicit = input.explicit_tracking_number().map(str::to_owned);
    let row = NewRow::encode(&input, Utc::now())?;
    let identifiers = self.identifiers.clone();

    let created = self
      .conn
      .call(move |conn| {
        // Generation and insert share one transaction so two concurrent
        // creates cannot both claim the same generated number.
        let tx = conn.transaction()?;
        let tracking_number = match explicit {
          Some(tn) => tn,
          None => {
            let mut stmt = tx.prepare("SELECT tracking_number FROM records")?;
            let existing = stmt
              .query_map([], |row| row.get::<_, String>(0))?
              .collect::<rusqlite::Result<Vec<_>>>()?;
            identifiers.next(existing.iter().map(String::as_str))
          }
        };

        tx.execute(&insert_sql(), params_from_iter(row.params(tracking_number.clone())))?;
        let record_id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(CreatedRecord { tracking_number, record_id })
      })
      .await?;

    info!(
      tracking_number = %created.tracking_number,
      record_id = created.record_id,
      "created record"
    );
    Ok(created)
  }

  async fn update_first(&self, tracking_number: &str, patch: &RecordPatch) -> Result<bool> {
    let updated = self
      .update_where(
        FIRST_BY_TRACKING_NUMBER,
        Value::Text(tracking_number.to_owned()),
        encode_patch(patch),
      )
      .await?;
    debug!(tracking_number, fields = patch.len(), updated, "update_first");
    Ok(updated)
  }

  async fn update_all_matching(
    &self,
    filter: &RecordFilter,
    patch: &RecordPatch,
  ) -> Result<BulkOutcome> {
    let today = Utc::now().date_naive();
    let targets: Vec<i64> = self
      .list_records()
      .await?
      .iter()
      .filter(|r| filter.matches(r, today))
      .map(|r| r.record_id)
      .collect();

    let mut outcome = BulkOutcome { matched: targets.len(), ..BulkOutcome::default() };
    let columns = encode_patch(patch);
    if columns.is_empty() {
      return Ok(outcome);
    }

    for record_id in targets {
      match self.update_where("?1", Value::Integer(record_id), columns.clone()).await {
        Ok(true) => outcome.updated += 1,
        // Deleted since the snapshot was taken.
        Ok(false) => {}
        Err(e) => {
          warn!(
            record_id,
            updated = outcome.updated,
            matched = outcome.matched,
            error = %e,
            "bulk update stopped partway"
          );
          outcome.failure = Some(e.to_string());
          break;
        }
      }
    }

    info!(matched = outcome.matched, updated = outcome.updated, "bulk update");
    Ok(outcome)
  }

  async fn append_note(&self, tracking_number: &str, text: &str) -> Result<bool> {
    let text = text.trim();
    if text.is_empty() {
      return Ok(false);
    }
    let now = Utc::now();
    let line = format!("[{}] {text}", now.format("%Y-%m-%d %H:%M"));
    let now = encode_dt(now);
    let tn = tracking_number.to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "UPDATE records
             SET notes = CASE WHEN notes IS NULL OR notes = '' THEN ?2
                              ELSE notes || char(10) || ?2 END,
                 updated_at = MAX(updated_at, ?3),
                 version = version + 1
           WHERE record_id = {FIRST_BY_TRACKING_NUMBER}"
        );
        Ok(conn.execute(&sql, params![tn, line, now])?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn attach_links(&self, tracking_number: &str, links: &ExternalLinks) -> Result<bool> {
    let links: ExternalLinks = links
      .iter()
      .filter(|(_, url)| !url.trim().is_empty())
      .map(|(name, url)| (name.clone(), url.trim().to_owned()))
      .collect();
    if links.is_empty() {
      return Ok(false);
    }
    let links = encode_links(&links)?;
    let now = encode_dt(Utc::now());
    let tn = tracking_number.to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "UPDATE records
             SET external_links = json_patch(COALESCE(NULLIF(external_links, ''), '{{}}'), ?2),
                 updated_at = MAX(updated_at, ?3),
                 version = version + 1
           WHERE record_id = {FIRST_BY_TRACKING_NUMBER}"
        );
        Ok(conn.execute(&sql, params![tn, links, now])?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn delete(&self, tracking_number: &str) -> Result<bool> {
    let tn = tracking_number.to_owned();
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM records WHERE tracking_number = ?1", params![tn])?)
      })
      .await?;

    if removed > 0 {
      info!(tracking_number, removed, "deleted records");
    }
    Ok(removed > 0)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn read_first(&self, tracking_number: &str) -> Result<Option<Record>> {
    let tn = tracking_number.to_owned();
    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {RECORD_COLUMNS} FROM records WHERE record_id = {FIRST_BY_TRACKING_NUMBER}"
        );
        Ok(conn.query_row(&sql, params![tn], RawRecord::from_row).optional()?)
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn read_all(&self, tracking_number: &str) -> Result<Vec<Record>> {
    self
      .select_records(
        "WHERE tracking_number = ?1 ORDER BY record_id",
        vec![Value::Text(tracking_number.to_owned())],
      )
      .await
  }

  async fn read_by_report_number(&self, report_number: &str) -> Result<Option<Record>> {
    let mut hits = self
      .select_records(
        "WHERE report_number = ?1 ORDER BY record_id LIMIT 1",
        vec![Value::Text(report_number.to_owned())],
      )
      .await?;
    Ok(hits.pop())
  }

  async fn list_records(&self) -> Result<Vec<Record>> {
    self.select_records("ORDER BY record_id", Vec::new()).await
  }
}
