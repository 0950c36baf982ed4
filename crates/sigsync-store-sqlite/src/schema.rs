//! SQL schema for the sigsync SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per rule identifier. Rows are never deleted by ingestion;
-- retirement only stamps deleted_at.
CREATE TABLE IF NOT EXISTS signatures (
    id          INTEGER PRIMARY KEY,
    sid         TEXT NOT NULL UNIQUE,
    rule_type   TEXT NOT NULL DEFAULT '',
    proto       TEXT NOT NULL DEFAULT '',
    src_addr    TEXT NOT NULL DEFAULT '',
    src_port    TEXT NOT NULL DEFAULT '',
    dst_addr    TEXT NOT NULL DEFAULT '',
    dst_port    TEXT NOT NULL DEFAULT '',
    msg         TEXT NOT NULL DEFAULT '',
    filename    TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL,           -- RFC 3339 UTC
    updated_at  TEXT,                    -- NULL until the first change
    deleted_at  TEXT                     -- soft-delete marker
);

CREATE INDEX IF NOT EXISTS signatures_deleted_idx ON signatures(deleted_at);

PRAGMA user_version = 1;
";
