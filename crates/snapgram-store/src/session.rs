use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::Result;
use crate::models::LocalSession;

impl Database {
    /// Persist the session marker, replacing any previous one.
    pub fn save_session_marker(&self, marker: &LocalSession) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO local_session
                 (id, session_id, account_id, expire, fallback_cookies, created_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5)",
            params![
                marker.session_id.as_str(),
                marker.account_id.as_str(),
                marker.expire.to_rfc3339(),
                marker.fallback_cookies,
                marker.created_at.to_rfc3339(),
            ],
        )?;
        tracing::debug!(session = %marker.session_id, "session marker saved");
        Ok(())
    }

    pub fn load_session_marker(&self) -> Result<Option<LocalSession>> {
        let row = self
            .conn()
            .query_row(
                "SELECT session_id, account_id, expire, fallback_cookies, created_at
                 FROM local_session WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((session_id, account_id, expire, fallback_cookies, created_at)) = row else {
            return Ok(None);
        };

        Ok(Some(LocalSession {
            session_id: session_id.into(),
            account_id: account_id.into(),
            expire: parse_ts(&expire)?,
            fallback_cookies,
            created_at: parse_ts(&created_at)?,
        }))
    }

    /// Remove the marker. Returns whether one was present.
    pub fn clear_session_marker(&self) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM local_session WHERE id = 1", [])?;
        Ok(affected > 0)
    }
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn marker(session: &str) -> LocalSession {
        LocalSession {
            session_id: session.into(),
            account_id: "acc-1".into(),
            expire: Utc::now() + Duration::days(365),
            fallback_cookies: Some("{\"a_session_snapgram\":\"secret\"}".into()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_store_has_no_marker() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.load_session_marker().unwrap(), None);
        assert!(!db.clear_session_marker().unwrap());
    }

    #[test]
    fn save_replaces_previous_marker() {
        let db = Database::open_in_memory().unwrap();
        db.save_session_marker(&marker("s1")).unwrap();
        db.save_session_marker(&marker("s2")).unwrap();

        let loaded = db.load_session_marker().unwrap().unwrap();
        assert_eq!(loaded.session_id.as_str(), "s2");
        assert!(loaded.fallback_cookies.is_some());
    }

    #[test]
    fn marker_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapgram.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.save_session_marker(&marker("s1")).unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert!(db.load_session_marker().unwrap().is_some());
        assert!(db.clear_session_marker().unwrap());
        assert!(db.load_session_marker().unwrap().is_none());
    }

    #[test]
    fn expiry_check() {
        let mut m = marker("s1");
        let now = Utc::now();
        assert!(!m.is_expired(now));
        m.expire = now - Duration::seconds(1);
        assert!(m.is_expired(now));
    }
}
