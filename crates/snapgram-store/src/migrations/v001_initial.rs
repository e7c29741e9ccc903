//! v001 -- Initial schema creation.
//!
//! Creates `local_session`, the single-row marker recording that this device
//! holds a session with the remote service.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS local_session (
    id               INTEGER PRIMARY KEY CHECK (id = 1),
    session_id       TEXT NOT NULL,
    account_id       TEXT NOT NULL,
    expire           TEXT NOT NULL,          -- RFC-3339
    fallback_cookies TEXT,                   -- opaque session credential
    created_at       TEXT NOT NULL
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
