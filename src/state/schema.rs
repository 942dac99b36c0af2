//! SQL DDL for initializing the state database schema.
//! SQLite-first design; the table intentionally holds a single row.

/// SQLite schema:
/// - `applied_record` table (last-applied artifact identity, single row)
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS applied_record (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    artifact_fingerprint TEXT NOT NULL,
    applied_db_name TEXT NOT NULL,
    applied_db_user TEXT NOT NULL,
    applied_at TEXT NOT NULL, -- RFC3339
    outcome INTEGER NOT NULL DEFAULT 1 -- 1 = success, 0 = failed
);
"#;
