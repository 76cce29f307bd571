//! v001 -- Initial schema creation.
//!
//! A single-row table holding the persisted application record as JSON.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS app_snapshot (
    id        INTEGER PRIMARY KEY CHECK (id = 1),
    version   INTEGER NOT NULL,            -- record layout version
    json      TEXT NOT NULL,
    saved_at  TEXT NOT NULL                -- RFC-3339
);
"#;

pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(UP_SQL)
}
