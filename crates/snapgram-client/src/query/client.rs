//! Process-wide query cache.
//!
//! Entries are keyed by [`QueryKey`] and hold the last successfully fetched
//! value type-erased behind `Arc<dyn Any>`. Invalidation only marks entries
//! stale, so views keep rendering the previous value until the refetch
//! lands.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

use super::deps::Mutation;
use super::key::{QueryKey, QueryTag};
use crate::error::{ApiError, ApiResult};
use crate::events::{emit_event, CacheEvent};

const EVENT_CAPACITY: usize = 256;

type CachedValue = Arc<dyn Any + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryStatus {
    /// Never fetched, or disabled.
    Idle,
    Loading,
    Success,
    Error,
}

/// Snapshot of one cache entry as seen by a view.
#[derive(Debug)]
pub struct QueryState<T> {
    pub status: QueryStatus,
    /// Last good value. Kept through `Loading` and `Error`.
    pub data: Option<Arc<T>>,
    pub error: Option<ApiError>,
    pub is_stale: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            is_stale: self.is_stale,
            updated_at: self.updated_at,
        }
    }
}

impl<T> QueryState<T> {
    pub fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            is_stale: false,
            updated_at: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }
}

#[derive(Clone)]
struct Entry {
    status: QueryStatus,
    data: Option<CachedValue>,
    error: Option<ApiError>,
    stale: bool,
    updated_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            stale: false,
            updated_at: None,
        }
    }

    fn to_state<T: Send + Sync + 'static>(&self) -> QueryState<T> {
        QueryState {
            status: self.status,
            data: self.data.clone().and_then(|d| d.downcast::<T>().ok()),
            error: self.error.clone(),
            is_stale: self.stale,
            updated_at: self.updated_at,
        }
    }

    fn holds<T: 'static>(&self) -> bool {
        self.data.as_ref().map_or(false, |d| d.is::<T>())
    }
}

#[derive(Clone)]
pub struct QueryClient {
    entries: Arc<RwLock<HashMap<QueryKey, Entry>>>,
    events: broadcast::Sender<CacheEvent>,
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryClient {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    /// Cached read. Returns the cached value if it is fresh, otherwise runs
    /// `fetch` and records the outcome. Disabled keys never fetch.
    pub async fn query<T, F, Fut>(&self, key: QueryKey, fetch: F) -> QueryState<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        if !key.is_enabled() {
            debug!(%key, "Query disabled");
            return QueryState::idle();
        }

        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&key) {
                if entry.status == QueryStatus::Success && !entry.stale && entry.holds::<T>() {
                    return entry.to_state();
                }
            }
        }

        self.run(key, fetch).await
    }

    /// Fetch regardless of freshness.
    pub async fn refetch<T, F, Fut>(&self, key: QueryKey, fetch: F) -> QueryState<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        if !key.is_enabled() {
            return QueryState::idle();
        }
        self.run(key, fetch).await
    }

    pub(super) async fn run<T, F, Fut>(&self, key: QueryKey, fetch: F) -> QueryState<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        self.set_status(&key, QueryStatus::Loading).await;

        let result = fetch().await;

        let (state, status) = {
            let mut entries = self.entries.write().await;
            let entry = entries.entry(key.clone()).or_insert_with(Entry::idle);
            match result {
                Ok(value) => {
                    let value: CachedValue = Arc::new(value);
                    entry.status = QueryStatus::Success;
                    entry.data = Some(value);
                    entry.error = None;
                    entry.stale = false;
                    entry.updated_at = Some(Utc::now());
                }
                Err(e) => {
                    warn!(%key, error = %e, "Query failed");
                    entry.status = QueryStatus::Error;
                    entry.error = Some(e);
                }
            }
            (entry.to_state::<T>(), entry.status)
        };

        emit_event(&self.events, CacheEvent::Updated { key, status });
        state
    }

    async fn set_status(&self, key: &QueryKey, status: QueryStatus) {
        {
            let mut entries = self.entries.write().await;
            entries.entry(key.clone()).or_insert_with(Entry::idle).status = status;
        }
        emit_event(
            &self.events,
            CacheEvent::Updated {
                key: key.clone(),
                status,
            },
        );
    }

    pub async fn peek<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<QueryState<T>> {
        self.entries.read().await.get(key).map(Entry::to_state)
    }

    pub async fn get_query_data<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        self.peek::<T>(key).await.and_then(|s| s.data)
    }

    pub async fn status(&self, key: &QueryKey) -> QueryStatus {
        self.entries
            .read()
            .await
            .get(key)
            .map_or(QueryStatus::Idle, |e| e.status)
    }

    /// Write a value directly, as a successful fetch would.
    pub async fn set_query_data<T: Send + Sync + 'static>(&self, key: QueryKey, value: T) {
        {
            let mut entries = self.entries.write().await;
            let entry = entries.entry(key.clone()).or_insert_with(Entry::idle);
            let value: CachedValue = Arc::new(value);
            entry.status = QueryStatus::Success;
            entry.data = Some(value);
            entry.error = None;
            entry.stale = false;
            entry.updated_at = Some(Utc::now());
        }
        emit_event(
            &self.events,
            CacheEvent::Updated {
                key,
                status: QueryStatus::Success,
            },
        );
    }

    /// Mark every entry under `prefix` stale. Returns how many matched.
    pub async fn invalidate(&self, prefix: &QueryKey) -> usize {
        let matched: Vec<QueryKey> = {
            let mut entries = self.entries.write().await;
            entries
                .iter_mut()
                .filter(|(k, _)| k.starts_with(prefix))
                .map(|(k, e)| {
                    e.stale = true;
                    k.clone()
                })
                .collect()
        };

        for key in &matched {
            emit_event(&self.events, CacheEvent::Invalidated { key: key.clone() });
        }
        debug!(%prefix, count = matched.len(), "Invalidated queries");
        matched.len()
    }

    pub async fn invalidate_tags(&self, tags: &[QueryTag]) -> usize {
        let mut count = 0;
        for tag in tags {
            count += self.invalidate(&QueryKey::tag(*tag)).await;
        }
        count
    }

    /// Drop every entry under `prefix`.
    pub async fn remove_queries(&self, prefix: &QueryKey) -> usize {
        let removed: Vec<QueryKey> = {
            let mut entries = self.entries.write().await;
            let keys: Vec<QueryKey> = entries
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect();
            for key in &keys {
                entries.remove(key);
            }
            keys
        };
        for key in &removed {
            emit_event(&self.events, CacheEvent::Removed { key: key.clone() });
        }
        removed.len()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
        emit_event(&self.events, CacheEvent::Cleared);
    }

    pub async fn keys(&self) -> Vec<QueryKey> {
        self.entries.read().await.keys().cloned().collect()
    }

    /// Run a mutation. On success the tags it affects are invalidated; on
    /// failure the error is returned and the cache is left untouched.
    pub async fn mutate<T, Fut>(&self, mutation: Mutation, fut: Fut) -> ApiResult<T>
    where
        Fut: Future<Output = ApiResult<T>>,
    {
        match fut.await {
            Ok(value) => {
                self.invalidate_tags(mutation.invalidates()).await;
                Ok(value)
            }
            Err(e) => {
                debug!(?mutation, error = %e, "Mutation failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use snapgram_shared::types::PostId;

    use crate::error::RemoteError;

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    async fn counted(calls: &AtomicUsize, value: u32) -> ApiResult<u32> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    #[tokio::test]
    async fn fresh_entries_are_served_from_cache() {
        let cache = QueryClient::new();
        let calls = counter();
        let key = QueryKey::recent_posts();

        let first = cache.query(key.clone(), || counted(&calls, 1)).await;
        let second = cache.query(key.clone(), || counted(&calls, 2)).await;

        assert!(first.is_success());
        assert_eq!(*second.data.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidation_keeps_data_until_refetch() {
        let cache = QueryClient::new();
        let calls = counter();
        let key = QueryKey::post_by_id(&PostId::from("p1"));
        cache.query(key.clone(), || counted(&calls, 1)).await;

        assert_eq!(cache.invalidate(&QueryKey::tag(QueryTag::PostById)).await, 1);
        let stale = cache.peek::<u32>(&key).await.unwrap();
        assert!(stale.is_stale);
        assert_eq!(*stale.data.unwrap(), 1);

        let fresh = cache.query(key, || counted(&calls, 2)).await;
        assert_eq!(*fresh.data.unwrap(), 2);
        assert!(!fresh.is_stale);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failure_keeps_last_good_value_and_does_not_retry() {
        let cache = QueryClient::new();
        let key = QueryKey::recent_posts();
        cache.set_query_data(key.clone(), 7u32).await;
        cache.invalidate(&key).await;

        let calls = counter();
        let failing = || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(ApiError::Remote(RemoteError::Transport("offline".into())))
            }
        };
        let state = cache.query(key.clone(), failing).await;
        assert!(state.is_error());
        assert_eq!(*state.data.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.status(&key).await, QueryStatus::Error);
    }

    #[tokio::test]
    async fn disabled_queries_never_fetch() {
        let cache = QueryClient::new();
        let calls = counter();
        let state = cache
            .query(QueryKey::search_posts(""), || counted(&calls, 1))
            .await;
        assert_eq!(state.status, QueryStatus::Idle);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(cache.keys().await.is_empty());
    }

    #[tokio::test]
    async fn failed_mutation_invalidates_nothing() {
        let cache = QueryClient::new();
        cache.set_query_data(QueryKey::recent_posts(), 1u32).await;

        let err = cache
            .mutate(Mutation::CreatePost, async {
                Err::<(), _>(ApiError::Forbidden("nope".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        let state = cache.peek::<u32>(&QueryKey::recent_posts()).await.unwrap();
        assert!(!state.is_stale);

        cache
            .mutate(Mutation::CreatePost, async { Ok::<_, ApiError>(()) })
            .await
            .unwrap();
        let state = cache.peek::<u32>(&QueryKey::recent_posts()).await.unwrap();
        assert!(state.is_stale);
    }

    #[tokio::test]
    async fn events_are_broadcast() {
        let cache = QueryClient::new();
        let mut rx = cache.subscribe();
        let key = QueryKey::current_user();

        cache.set_query_data(key.clone(), 1u32).await;
        cache.invalidate(&key).await;
        cache.clear().await;

        assert_eq!(
            rx.recv().await.unwrap(),
            CacheEvent::Updated { key: key.clone(), status: QueryStatus::Success }
        );
        assert_eq!(rx.recv().await.unwrap(), CacheEvent::Invalidated { key });
        assert_eq!(rx.recv().await.unwrap(), CacheEvent::Cleared);
    }
}
