//! SQL schema for the PSUR SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! layout; future migrations will be gated on that number.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One flat collection. tracking_number is deliberately NOT unique.
-- record_id order is insertion order and decides \"first match\".
CREATE TABLE IF NOT EXISTS records (
    record_id              INTEGER PRIMARY KEY AUTOINCREMENT,
    tracking_number        TEXT NOT NULL CHECK (tracking_number != ''),
    report_number          TEXT,
    report_type            TEXT,
    classification         TEXT,
    product_name           TEXT,
    catalog_number         TEXT,
    owner                  TEXT,
    owner_contact          TEXT,
    period_start           TEXT,            -- YYYY-MM-DD
    period_end             TEXT,            -- YYYY-MM-DD
    frequency              TEXT,
    due_date               TEXT,            -- YYYY-MM-DD
    status                 TEXT,
    region_flag            TEXT,
    region_status          TEXT,
    notes                  TEXT,
    external_links         TEXT NOT NULL DEFAULT '{}',  -- JSON object name -> url
    created_at             TEXT NOT NULL,   -- RFC 3339 UTC, microseconds
    updated_at             TEXT NOT NULL,   -- RFC 3339 UTC, microseconds
    version                INTEGER NOT NULL DEFAULT 1 CHECK (version >= 1),
    parent_tracking_number TEXT,
    auto_generated         INTEGER NOT NULL DEFAULT 0,
    CHECK (updated_at >= created_at)
);

-- Lookup accelerators only; none of these carry a uniqueness contract.
CREATE INDEX IF NOT EXISTS records_tracking_idx      ON records(tracking_number);
CREATE INDEX IF NOT EXISTS records_report_idx        ON records(report_number);
CREATE INDEX IF NOT EXISTS records_owner_idx         ON records(owner);
CREATE INDEX IF NOT EXISTS records_status_idx        ON records(status);
CREATE INDEX IF NOT EXISTS records_classification_idx ON records(classification);
CREATE INDEX IF NOT EXISTS records_due_idx           ON records(due_date);

PRAGMA user_version = 1;
";
