//! SQL schema for the Roll SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS children (
    child_id        TEXT PRIMARY KEY,
    full_name       TEXT NOT NULL,
    gender          TEXT NOT NULL DEFAULT 'unset',
    date_of_birth   TEXT,             -- YYYY-MM-DD or NULL
    school          TEXT NOT NULL DEFAULT '',
    grade           TEXT,             -- serde tag of Grade or NULL
    class_group     TEXT NOT NULL,    -- serde tag of ClassGroup
    residence       TEXT NOT NULL DEFAULT '',
    parent1_name    TEXT,
    parent1_contact TEXT,
    parent2_name    TEXT,
    parent2_contact TEXT,
    sponsored       INTEGER NOT NULL DEFAULT 0,
    registered_at   TEXT NOT NULL     -- RFC 3339 UTC; server-assigned
);

-- One row per child per session. Rows are removed by the application
-- before the child is deleted; there is no ON DELETE CASCADE.
CREATE TABLE IF NOT EXISTS attendance (
    child_id      TEXT NOT NULL REFERENCES children(child_id),
    session_date  TEXT NOT NULL,      -- YYYY-MM-DD
    present       INTEGER NOT NULL,
    early         INTEGER NOT NULL DEFAULT 0,
    has_book      INTEGER NOT NULL DEFAULT 0,
    has_pen       INTEGER NOT NULL DEFAULT 0,
    has_bible     INTEGER NOT NULL DEFAULT 0,
    gave_offering INTEGER NOT NULL DEFAULT 0,
    recorded_at   TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    PRIMARY KEY (child_id, session_date)
);

-- Append-only; duplicates per (child, year, term) are allowed.
CREATE TABLE IF NOT EXISTS performance (
    performance_id      TEXT PRIMARY KEY,
    child_id            TEXT NOT NULL REFERENCES children(child_id),
    year                INTEGER NOT NULL,
    term                TEXT NOT NULL,
    mathematics         INTEGER NOT NULL,
    english             INTEGER NOT NULL,
    kiswahili           INTEGER NOT NULL,
    science             INTEGER NOT NULL,
    social_studies      INTEGER NOT NULL,
    religious_education INTEGER NOT NULL,
    remarks             TEXT NOT NULL DEFAULT '',
    recorded_at         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS attendance_date_idx    ON attendance(session_date);
CREATE INDEX IF NOT EXISTS performance_child_idx  ON performance(child_id);
CREATE INDEX IF NOT EXISTS children_name_idx      ON children(full_name);

PRAGMA user_version = 1;
";
