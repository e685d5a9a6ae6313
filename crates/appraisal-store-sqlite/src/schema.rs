//! SQL schema for the appraisal SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS people (
    person_id   TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    role        TEXT NOT NULL,
    department  TEXT NOT NULL,
    manager_id  TEXT,
    active      INTEGER NOT NULL DEFAULT 1
);

-- Directional; labels are stored as given and normalized on read.
CREATE TABLE IF NOT EXISTS relationships (
    rater_role    TEXT NOT NULL,
    ratee_role    TEXT NOT NULL,
    relationship  TEXT NOT NULL,   -- 'direct' | 'indirect' | 'none'
    PRIMARY KEY (rater_role, ratee_role)
);

CREATE TABLE IF NOT EXISTS questions (
    question_id   TEXT PRIMARY KEY,
    category      TEXT NOT NULL,
    text          TEXT NOT NULL,
    scope         TEXT NOT NULL DEFAULT 'global',
    open_ended    INTEGER NOT NULL DEFAULT 0,
    for_managers  INTEGER NOT NULL DEFAULT 0,
    active        INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS kpis (
    kpi_id         TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    weight         REAL,
    applicability  TEXT NOT NULL,   -- JSON
    status         TEXT NOT NULL,
    active         INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS rounds (
    round_id     TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    status       TEXT NOT NULL,   -- 'draft' | 'active' | 'completed'
    include_kpi  INTEGER NOT NULL,
    include_360  INTEGER NOT NULL,
    starts_on    TEXT,
    ends_on      TEXT,
    created_at   TEXT NOT NULL
);

-- At most one active round.
CREATE UNIQUE INDEX IF NOT EXISTS rounds_single_active
    ON rounds(status) WHERE status = 'active';

-- KPI rows carry rater_id, peer360 rows carry rater_token; never both.
CREATE TABLE IF NOT EXISTS assignments (
    round_id     TEXT NOT NULL REFERENCES rounds(round_id),
    kind         TEXT NOT NULL,   -- 'kpi' | 'peer360'
    rater_id     TEXT,
    rater_token  TEXT,
    ratee_id     TEXT NOT NULL,
    assigned_at  TEXT NOT NULL,
    UNIQUE (round_id, kind, rater_id, ratee_id),
    UNIQUE (round_id, kind, rater_token, ratee_id),
    CHECK ((rater_id IS NULL) != (rater_token IS NULL))
);

CREATE TABLE IF NOT EXISTS ratings (
    rating_id     TEXT PRIMARY KEY,
    evaluator_id  TEXT NOT NULL,
    ratee_id      TEXT NOT NULL,
    round_id      TEXT NOT NULL REFERENCES rounds(round_id),
    scores_json   TEXT NOT NULL,
    comment       TEXT,
    status        TEXT NOT NULL,
    submitted_at  TEXT,
    approved_at   TEXT,
    approved_by   TEXT,
    UNIQUE (evaluator_id, ratee_id, round_id)
);

-- No column here identifies a person as rater.
CREATE TABLE IF NOT EXISTS feedback (
    rater_token       TEXT NOT NULL,
    ratee_id          TEXT NOT NULL,
    round_id          TEXT NOT NULL REFERENCES rounds(round_id),
    question_id       TEXT NOT NULL,
    score             REAL,
    comment           TEXT,
    status            TEXT NOT NULL,   -- 'draft' | 'submitted'
    submitted_at      TEXT,
    department_token  TEXT NOT NULL,
    role_token        TEXT NOT NULL,
    is_manager_token  TEXT NOT NULL,
    PRIMARY KEY (rater_token, ratee_id, round_id, question_id)
);

CREATE TABLE IF NOT EXISTS rater_scores (
    rater_token     TEXT NOT NULL,
    ratee_id        TEXT NOT NULL,
    round_id        TEXT NOT NULL REFERENCES rounds(round_id),
    score           REAL NOT NULL,
    question_count  INTEGER NOT NULL,
    updated_at      TEXT NOT NULL,
    PRIMARY KEY (rater_token, ratee_id, round_id)
);

CREATE INDEX IF NOT EXISTS assignments_ratee_idx ON assignments(round_id, ratee_id);
CREATE INDEX IF NOT EXISTS ratings_ratee_idx     ON ratings(round_id, ratee_id);
CREATE INDEX IF NOT EXISTS feedback_ratee_idx    ON feedback(round_id, ratee_id);

PRAGMA user_version = 1;
";
