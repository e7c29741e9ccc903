//! Cursor pagination on top of [`QueryClient`].
//!
//! Pages are accumulated under one key. The cursor for the next page is the
//! id of the last item received; a page with no items ends the sequence and
//! later next-page requests return the cached state untouched.

use std::future::Future;

use tracing::debug;

use snapgram_shared::models::Post;

use super::client::{QueryClient, QueryState};
use super::key::QueryKey;
use crate::error::ApiResult;

/// Items that can continue a cursor-paginated listing.
pub trait PageCursor {
    fn page_cursor(&self) -> String;
}

impl PageCursor for Post {
    fn page_cursor(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfiniteData<T> {
    pub pages: Vec<Vec<T>>,
    pub has_next_page: bool,
}

impl<T: PageCursor> InfiniteData<T> {
    fn first(page: Vec<T>) -> Self {
        let mut data = Self {
            pages: Vec::new(),
            has_next_page: true,
        };
        data.push_page(page);
        data
    }

    fn push_page(&mut self, page: Vec<T>) {
        if page.is_empty() {
            self.has_next_page = false;
        } else {
            self.pages.push(page);
        }
    }

    /// Cursor for the next page, `None` once the listing is exhausted.
    pub fn next_cursor(&self) -> Option<String> {
        if !self.has_next_page {
            return None;
        }
        self.pages.last()?.last().map(PageCursor::page_cursor)
    }

    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.pages.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl QueryClient {
    /// Load the first page, or serve the accumulated pages while fresh.
    pub async fn infinite_query<T, F, Fut>(
        &self,
        key: QueryKey,
        fetch: F,
    ) -> QueryState<InfiniteData<T>>
    where
        T: PageCursor + Send + Sync + 'static,
        F: FnOnce(Option<String>) -> Fut,
        Fut: Future<Output = ApiResult<Vec<T>>>,
    {
        self.query(key, move || async move { fetch(None).await.map(InfiniteData::first) })
            .await
    }

    /// Append the page after the last loaded item.
    ///
    /// Without cached pages this loads the first page. After an empty page
    /// it does nothing: no fetch and no cache write.
    pub async fn fetch_next_page<T, F, Fut>(
        &self,
        key: QueryKey,
        fetch: F,
    ) -> QueryState<InfiniteData<T>>
    where
        T: PageCursor + Clone + Send + Sync + 'static,
        F: FnOnce(Option<String>) -> Fut,
        Fut: Future<Output = ApiResult<Vec<T>>>,
    {
        let Some(current) = self.get_query_data::<InfiniteData<T>>(&key).await else {
            return self.infinite_query(key, fetch).await;
        };

        let Some(cursor) = current.next_cursor() else {
            debug!(%key, "No further pages");
            return self
                .peek(&key)
                .await
                .unwrap_or_else(QueryState::idle);
        };

        self.run(key, move || async move {
            let page = fetch(Some(cursor)).await?;
            let mut data = InfiniteData::clone(&current);
            data.push_page(page);
            Ok(data)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(u32);

    impl PageCursor for Item {
        fn page_cursor(&self) -> String {
            self.0.to_string()
        }
    }

    /// Items 0..total served in pages of three after the cursor.
    fn pages(
        total: u32,
        calls: Arc<AtomicUsize>,
    ) -> impl Fn(Option<String>) -> std::future::Ready<ApiResult<Vec<Item>>> {
        move |cursor| {
            calls.fetch_add(1, Ordering::SeqCst);
            let start = cursor.map_or(0, |c| c.parse::<u32>().unwrap() + 1);
            let items = (start..total).take(3).map(Item).collect();
            std::future::ready(Ok(items))
        }
    }

    #[tokio::test]
    async fn pages_accumulate_until_empty() {
        let cache = QueryClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = pages(5, calls.clone());
        let key = QueryKey::infinite_posts();

        let first = cache.infinite_query(key.clone(), &fetch).await;
        assert_eq!(first.data.unwrap().len(), 3);

        let second = cache.fetch_next_page(key.clone(), &fetch).await;
        let data = second.data.unwrap();
        assert_eq!(data.pages.len(), 2);
        assert_eq!(data.next_cursor().as_deref(), Some("4"));

        let third = cache.fetch_next_page(key.clone(), &fetch).await;
        assert!(!third.data.unwrap().has_next_page);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_listing_is_a_noop() {
        let cache = QueryClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = pages(3, calls.clone());
        let key = QueryKey::infinite_posts();

        cache.infinite_query(key.clone(), &fetch).await;
        cache.fetch_next_page(key.clone(), &fetch).await;
        let before = cache.peek::<InfiniteData<Item>>(&key).await.unwrap();
        let calls_before = calls.load(Ordering::SeqCst);
        let mut events = cache.subscribe();

        let after = cache.fetch_next_page(key.clone(), &fetch).await;

        assert_eq!(calls.load(Ordering::SeqCst), calls_before);
        assert_eq!(after.data, before.data);
        assert_eq!(after.updated_at, before.updated_at);
        assert!(events.try_recv().is_err());
    }
}
