use serde::Serialize;
use tokio::sync::broadcast;

use snapgram_shared::types::UserId;

use crate::query::{QueryKey, QueryStatus};

pub const EVENT_QUERY_UPDATED: &str = "query-updated";
pub const EVENT_QUERY_INVALIDATED: &str = "query-invalidated";
pub const EVENT_QUERY_REMOVED: &str = "query-removed";
pub const EVENT_CACHE_CLEARED: &str = "cache-cleared";
pub const EVENT_SESSION_CHANGED: &str = "session-changed";
pub const EVENT_REDIRECT_SIGN_IN: &str = "redirect-sign-in";

/// Broadcast to mounted views whenever a cache entry changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CacheEvent {
    Updated { key: QueryKey, status: QueryStatus },
    /// The entry is stale; a mounted view should refetch it.
    Invalidated { key: QueryKey },
    Removed { key: QueryKey },
    Cleared,
}

/// An event with a stable wire name.
pub trait AppEvent: Clone {
    fn name(&self) -> &'static str;
}

impl AppEvent for CacheEvent {
    fn name(&self) -> &'static str {
        match self {
            CacheEvent::Updated { .. } => EVENT_QUERY_UPDATED,
            CacheEvent::Invalidated { .. } => EVENT_QUERY_INVALIDATED,
            CacheEvent::Removed { .. } => EVENT_QUERY_REMOVED,
            CacheEvent::Cleared => EVENT_CACHE_CLEARED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SessionEvent {
    /// No local session marker; the sign-in view should be shown.
    RedirectToSignIn,
    Authenticated { user_id: UserId },
    Unauthenticated,
}

impl AppEvent for SessionEvent {
    fn name(&self) -> &'static str {
        match self {
            SessionEvent::RedirectToSignIn => EVENT_REDIRECT_SIGN_IN,
            _ => EVENT_SESSION_CHANGED,
        }
    }
}

/// Send `event` to every subscriber. Having none is not an error.
pub fn emit_event<E: AppEvent>(tx: &broadcast::Sender<E>, event: E) {
    let name = event.name();
    if tx.send(event).is_err() {
        tracing::trace!(event = name, "No subscribers for event");
    }
}
