//! Records persisted in the on-device database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use snapgram_shared::models::Session;
use snapgram_shared::types::{AccountId, SessionId};

/// Marker left on the device after a successful sign-in.
///
/// Its presence is what lets the session context skip the sign-in redirect on
/// start-up; the remote account check still decides who is signed in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalSession {
    pub session_id: SessionId,
    pub account_id: AccountId,
    pub expire: DateTime<Utc>,
    /// Credential replayed to the service when cookies are unavailable.
    pub fallback_cookies: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LocalSession {
    pub fn from_session(session: &Session, fallback_cookies: Option<String>) -> Self {
        Self {
            session_id: session.id.clone(),
            account_id: session.account_id.clone(),
            expire: session.expire,
            fallback_cookies,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire <= now
    }
}
