//! The remote data service seam.
//!
//! [`RemoteDataService`] is the full contract the client consumes from the
//! hosted backend. [`HttpRemote`] speaks its REST API; [`MemoryRemote`] is an
//! in-process stand-in that records every call.

pub mod http;
pub mod memory;

use async_trait::async_trait;

use snapgram_shared::constants::{PREVIEW_GRAVITY, PREVIEW_HEIGHT, PREVIEW_QUALITY, PREVIEW_WIDTH};
use snapgram_shared::models::{Account, FileRef, FileUpload, Session};
use snapgram_shared::types::{AccountId, DocumentId, FileId, Gravity, Revision};
use snapgram_shared::{Document, DocumentList, Fields};

use crate::error::RemoteResult;

pub use http::HttpRemote;
pub use memory::MemoryRemote;

/// A list filter understood by the document database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Equal(String, String),
    OrderAsc(String),
    OrderDesc(String),
    Limit(u32),
    /// Continue after the document with this id.
    CursorAfter(String),
    Search(String, String),
}

impl Query {
    pub fn equal(attribute: &str, value: impl Into<String>) -> Self {
        Query::Equal(attribute.to_string(), value.into())
    }

    pub fn order_desc(attribute: &str) -> Self {
        Query::OrderDesc(attribute.to_string())
    }

    pub fn cursor_after(id: impl Into<String>) -> Self {
        Query::CursorAfter(id.into())
    }

    /// Render in the service's query string syntax, e.g. `equal("creator", ["u1"])`.
    pub fn to_query_string(&self) -> String {
        let q = |s: &str| serde_json::Value::from(s).to_string();
        match self {
            Query::Equal(attr, value) => format!("equal({}, [{}])", q(attr), q(value)),
            Query::OrderAsc(attr) => format!("orderAsc({})", q(attr)),
            Query::OrderDesc(attr) => format!("orderDesc({})", q(attr)),
            Query::Limit(n) => format!("limit({n})"),
            Query::CursorAfter(id) => format!("cursorAfter({})", q(id)),
            Query::Search(attr, term) => format!("search({}, [{}])", q(attr), q(term)),
        }
    }
}

/// Rendering options for a storage preview URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewOptions {
    pub width: u32,
    pub height: u32,
    pub gravity: Gravity,
    pub quality: u8,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            width: PREVIEW_WIDTH,
            height: PREVIEW_HEIGHT,
            gravity: PREVIEW_GRAVITY,
            quality: PREVIEW_QUALITY,
        }
    }
}

/// Operations the hosted backend offers to the client.
///
/// Collection and bucket arguments are the configured identifiers from
/// [`snapgram_shared::ServiceConfig`].
#[async_trait]
pub trait RemoteDataService: Send + Sync {
    async fn create_account(
        &self,
        id: &AccountId,
        email: &str,
        password: &str,
        name: &str,
    ) -> RemoteResult<Account>;

    async fn create_session(&self, email: &str, password: &str) -> RemoteResult<Session>;

    /// The account behind the current session.
    async fn get_account(&self) -> RemoteResult<Account>;

    /// Delete the current session.
    async fn delete_session(&self) -> RemoteResult<()>;

    async fn create_document(
        &self,
        collection: &str,
        id: &DocumentId,
        data: Fields,
    ) -> RemoteResult<Document>;

    async fn list_documents(&self, collection: &str, queries: &[Query])
        -> RemoteResult<DocumentList>;

    async fn get_document(&self, collection: &str, id: &str) -> RemoteResult<Document>;

    /// Patch `data` into a document. With `expected` set, the write only
    /// applies if the document is still at that revision, otherwise
    /// [`RemoteError::PreconditionFailed`](crate::error::RemoteError::PreconditionFailed).
    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        data: Fields,
        expected: Option<&Revision>,
    ) -> RemoteResult<Document>;

    async fn delete_document(&self, collection: &str, id: &str) -> RemoteResult<()>;

    async fn upload_file(&self, bucket: &str, id: &FileId, file: FileUpload)
        -> RemoteResult<FileRef>;

    fn file_preview_url(
        &self,
        bucket: &str,
        file_id: &FileId,
        options: &PreviewOptions,
    ) -> RemoteResult<String>;

    async fn delete_file(&self, bucket: &str, file_id: &FileId) -> RemoteResult<()>;

    async fn search(&self, collection: &str, attribute: &str, term: &str)
        -> RemoteResult<DocumentList>;

    /// URL of a generated initials avatar for `name`.
    fn avatar_initials_url(&self, name: &str) -> String;

    /// Credential to persist so a restarted client can resume its session.
    fn session_secret(&self) -> Option<String> {
        None
    }

    /// Reinstate a credential previously returned by [`Self::session_secret`].
    fn restore_session_secret(&self, _secret: Option<String>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_strings_quote_their_arguments() {
        assert_eq!(
            Query::equal("accountId", "a\"1").to_query_string(),
            r#"equal("accountId", ["a\"1"])"#
        );
        assert_eq!(Query::Limit(9).to_query_string(), "limit(9)");
        assert_eq!(
            Query::order_desc("$createdAt").to_query_string(),
            r#"orderDesc("$createdAt")"#
        );
    }

    #[test]
    fn default_preview_matches_feed_layout() {
        let options = PreviewOptions::default();
        assert_eq!((options.width, options.height), (2000, 2000));
        assert_eq!(options.gravity, Gravity::Top);
        assert_eq!(options.quality, 100);
    }
}
