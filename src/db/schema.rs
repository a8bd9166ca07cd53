//! Database schema and migrations for filebox.
//!
//! Migrations are applied sequentially; `schema_version` records which ones
//! have run.

/// Database migrations, in order.
pub const MIGRATIONS: &[&str] = &[
    // v1: users
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    email       TEXT NOT NULL UNIQUE,
    password    TEXT NOT NULL,           -- Argon2 PHC string
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
    // v2: file and folder metadata
    r#"
CREATE TABLE files (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id),
    name        TEXT NOT NULL,
    file_type   TEXT NOT NULL CHECK (file_type IN ('folder', 'file', 'image')),
    is_public   INTEGER NOT NULL DEFAULT 0,
    parent_id   INTEGER NOT NULL DEFAULT 0,  -- 0 = root
    local_path  TEXT,                        -- NULL for folders
    mime_type   TEXT,                        -- NULL for folders
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_files_parent_id ON files(parent_id, id);
CREATE INDEX idx_files_user_id ON files(user_id);
"#,
    // v3: durable job queue
    r#"
CREATE TABLE jobs (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    queue         TEXT NOT NULL,
    payload       TEXT NOT NULL,               -- JSON
    state         TEXT NOT NULL DEFAULT 'enqueued',
    attempts      INTEGER NOT NULL DEFAULT 0,
    last_error    TEXT,
    available_at  INTEGER NOT NULL,            -- unix millis
    claimed_at    INTEGER,                     -- unix millis
    created_at    INTEGER NOT NULL,
    updated_at    INTEGER NOT NULL
);

CREATE INDEX idx_jobs_claimable ON jobs(queue, state, available_at, id);
"#,
    // v4: expiring key-value entries (session tokens)
    r#"
CREATE TABLE kv_entries (
    key         TEXT PRIMARY KEY,
    value       TEXT NOT NULL,
    expires_at  INTEGER NOT NULL               -- unix millis
);

CREATE INDEX idx_kv_entries_expires_at ON kv_entries(expires_at);
"#,
];
