//! SQL schema for the Genkan SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS people (
    card_id    TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL,
    name       TEXT NOT NULL,
    status     INTEGER NOT NULL,    -- active flag
    created_at TEXT NOT NULL,       -- ISO 8601 UTC
    updated_at TEXT,
    version    INTEGER NOT NULL     -- optimistic-concurrency counter
);

-- One row per person per local calendar day. The visit list is append-only;
-- mutations replace the JSON array wholesale under a version condition.
CREATE TABLE IF NOT EXISTS accesses (
    user_id    TEXT NOT NULL,
    date       TEXT NOT NULL,       -- local calendar day, YYYY-MM-DD
    name       TEXT NOT NULL,
    records    TEXT NOT NULL,       -- JSON array of visits
    created_at TEXT NOT NULL,
    updated_at TEXT,
    version    INTEGER NOT NULL,
    PRIMARY KEY (user_id, date)
);

-- Secondary index for whole-day queries (participant list, bulk close,
-- daily report).
CREATE INDEX IF NOT EXISTS accesses_date_idx ON accesses(date);

PRAGMA user_version = 1;
";
