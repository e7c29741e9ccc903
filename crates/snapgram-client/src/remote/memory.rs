//! In-process implementation of the remote data service.
//!
//! Behaves like the hosted backend for everything the client relies on
//! (accounts, sessions, documents with revisions, files, search) and keeps a
//! log of every call. Failures can be injected per operation, which is how
//! the compensation paths of the adapter are exercised.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::debug;

use snapgram_shared::constants::{ATTR_CREATED_AT, ATTR_ID, ATTR_UPDATED_AT};
use snapgram_shared::models::{Account, FileRef, FileUpload, Session};
use snapgram_shared::types::{AccountId, DocumentId, FileId, Revision, SessionId};
use snapgram_shared::{Document, DocumentList, Fields};

use super::{PreviewOptions, Query, RemoteDataService};
use crate::error::{RemoteError, RemoteResult};

/// Default page size applied when a list call carries no limit.
const DEFAULT_LIST_LIMIT: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAccount,
    CreateSession,
    GetAccount,
    DeleteSession,
    CreateDocument,
    ListDocuments,
    GetDocument,
    UpdateDocument,
    DeleteDocument,
    UploadFile,
    FilePreview,
    DeleteFile,
    Search,
}

/// One recorded call. `target` is the collection or bucket, when any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    pub op: Operation,
    pub target: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    op: Operation,
    target: Option<String>,
    /// `None` fails every matching call.
    remaining: Option<usize>,
    error: RemoteError,
}

struct StoredAccount {
    account: Account,
    password: String,
}

#[derive(Default)]
struct Inner {
    accounts: Vec<StoredAccount>,
    sessions: HashMap<SessionId, Session>,
    current_session: Option<SessionId>,
    collections: HashMap<String, Vec<Document>>,
    files: HashMap<(String, FileId), FileRef>,
    calls: Vec<RemoteCall>,
    failures: Vec<InjectedFailure>,
    clock: Option<DateTime<Utc>>,
}

impl Inner {
    /// Strictly increasing timestamps so every write yields a new revision.
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.clock {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.clock = Some(next);
        next
    }

    fn take_failure(&mut self, op: Operation, target: Option<&str>) -> Option<RemoteError> {
        let idx = self.failures.iter().position(|f| {
            f.op == op && (f.target.is_none() || f.target.as_deref() == target)
        })?;
        let error = self.failures[idx].error.clone();
        match self.failures[idx].remaining {
            Some(n) if n <= 1 => {
                self.failures.remove(idx);
            }
            Some(n) => self.failures[idx].remaining = Some(n - 1),
            None => {}
        }
        Some(error)
    }

    fn current_account_id(&self) -> RemoteResult<AccountId> {
        self.current_session
            .as_ref()
            .and_then(|id| self.sessions.get(id))
            .map(|s| s.account_id.clone())
            .ok_or_else(|| RemoteError::Unauthorized("No active session".into()))
    }

    fn collection_mut(&mut self, collection: &str) -> &mut Vec<Document> {
        self.collections.entry(collection.to_string()).or_default()
    }

    fn find_document(&self, collection: &str, id: &str) -> RemoteResult<&Document> {
        self.collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id.as_str() == id))
            .ok_or_else(|| not_found(collection, id))
    }
}

/// In-memory remote data service.
#[derive(Default)]
pub struct MemoryRemote {
    inner: Mutex<Inner>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the call and apply any injected failure.
    fn begin(
        &self,
        op: Operation,
        target: Option<&str>,
        id: Option<&str>,
    ) -> RemoteResult<MutexGuard<'_, Inner>> {
        let mut inner = self.lock();
        inner.calls.push(RemoteCall {
            op,
            target: target.map(String::from),
            id: id.map(String::from),
        });
        if let Some(error) = inner.take_failure(op, target) {
            debug!(?op, collection = ?target, %error, "injected remote failure");
            return Err(error);
        }
        Ok(inner)
    }

    // -- failure injection ----------------------------------------------------

    /// Fail every call of `op` until [`Self::clear_failures`].
    pub fn fail(&self, op: Operation, error: RemoteError) {
        self.push_failure(op, None, None, error);
    }

    /// Fail only the next call of `op`.
    pub fn fail_once(&self, op: Operation, error: RemoteError) {
        self.push_failure(op, None, Some(1), error);
    }

    /// Fail every call of `op` against one collection or bucket.
    pub fn fail_on(&self, op: Operation, target: &str, error: RemoteError) {
        self.push_failure(op, Some(target.to_string()), None, error);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    fn push_failure(
        &self,
        op: Operation,
        target: Option<String>,
        remaining: Option<usize>,
        error: RemoteError,
    ) {
        self.lock().failures.push(InjectedFailure {
            op,
            target,
            remaining,
            error,
        });
    }

    // -- inspection -----------------------------------------------------------

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    pub fn calls_to(&self, op: Operation) -> Vec<RemoteCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.op == op)
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn file_exists(&self, bucket: &str, id: &FileId) -> bool {
        self.lock()
            .files
            .contains_key(&(bucket.to_string(), id.clone()))
    }

    pub fn file_count(&self, bucket: &str) -> usize {
        self.lock()
            .files
            .keys()
            .filter(|(b, _)| b == bucket)
            .count()
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<Document> {
        self.lock().find_document(collection, id).ok().cloned()
    }

    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.lock()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Seed a document directly, bypassing the call log.
    pub fn insert_document(&self, collection: &str, id: &str, data: Fields) -> Document {
        let mut inner = self.lock();
        let now = inner.tick();
        let doc = Document {
            id: id.into(),
            collection: collection.to_string(),
            created_at: now,
            updated_at: now,
            data,
        };
        inner.collection_mut(collection).push(doc.clone());
        doc
    }
}

#[async_trait]
impl RemoteDataService for MemoryRemote {
    async fn create_account(
        &self,
        id: &AccountId,
        email: &str,
        password: &str,
        name: &str,
    ) -> RemoteResult<Account> {
        tokio::task::yield_now().await;
        let mut inner = self.begin(Operation::CreateAccount, None, Some(id.as_str()))?;

        if inner
            .accounts
            .iter()
            .any(|a| a.account.email.eq_ignore_ascii_case(email) || a.account.id == *id)
        {
            return Err(RemoteError::AlreadyExists(format!(
                "A user with the same id or email already exists: {email}"
            )));
        }

        let account = Account {
            id: id.clone(),
            name: name.to_string(),
            email: email.to_string(),
            created_at: inner.tick(),
        };
        inner.accounts.push(StoredAccount {
            account: account.clone(),
            password: password.to_string(),
        });
        Ok(account)
    }

    async fn create_session(&self, email: &str, password: &str) -> RemoteResult<Session> {
        tokio::task::yield_now().await;
        let mut inner = self.begin(Operation::CreateSession, None, None)?;

        let account_id = inner
            .accounts
            .iter()
            .find(|a| a.account.email.eq_ignore_ascii_case(email) && a.password == password)
            .map(|a| a.account.id.clone())
            .ok_or_else(|| RemoteError::Unauthorized("Invalid credentials".into()))?;

        let now = inner.tick();
        let session = Session {
            id: SessionId::unique(),
            account_id,
            expire: now + Duration::days(365),
        };
        inner.sessions.insert(session.id.clone(), session.clone());
        inner.current_session = Some(session.id.clone());
        Ok(session)
    }

    async fn get_account(&self) -> RemoteResult<Account> {
        tokio::task::yield_now().await;
        let inner = self.begin(Operation::GetAccount, None, None)?;
        let account_id = inner.current_account_id()?;
        inner
            .accounts
            .iter()
            .find(|a| a.account.id == account_id)
            .map(|a| a.account.clone())
            .ok_or_else(|| RemoteError::Unauthorized("Account no longer exists".into()))
    }

    async fn delete_session(&self) -> RemoteResult<()> {
        tokio::task::yield_now().await;
        let mut inner = self.begin(Operation::DeleteSession, None, None)?;
        inner.current_account_id()?;
        if let Some(id) = inner.current_session.take() {
            inner.sessions.remove(&id);
        }
        Ok(())
    }

    async fn create_document(
        &self,
        collection: &str,
        id: &DocumentId,
        data: Fields,
    ) -> RemoteResult<Document> {
        tokio::task::yield_now().await;
        let mut inner = self.begin(Operation::CreateDocument, Some(collection), Some(id.as_str()))?;

        if inner.find_document(collection, id.as_str()).is_ok() {
            return Err(RemoteError::AlreadyExists(format!(
                "Document {id} already exists in {collection}"
            )));
        }

        let now = inner.tick();
        let doc = Document {
            id: id.clone(),
            collection: collection.to_string(),
            created_at: now,
            updated_at: now,
            data,
        };
        inner.collection_mut(collection).push(doc.clone());
        Ok(doc)
    }

    async fn list_documents(
        &self,
        collection: &str,
        queries: &[Query],
    ) -> RemoteResult<DocumentList> {
        tokio::task::yield_now().await;
        let inner = self.begin(Operation::ListDocuments, Some(collection), None)?;
        let docs = inner.collections.get(collection).cloned().unwrap_or_default();
        apply_queries(collection, docs, queries)
    }

    async fn get_document(&self, collection: &str, id: &str) -> RemoteResult<Document> {
        tokio::task::yield_now().await;
        let inner = self.begin(Operation::GetDocument, Some(collection), Some(id))?;
        inner.find_document(collection, id).cloned()
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        data: Fields,
        expected: Option<&Revision>,
    ) -> RemoteResult<Document> {
        tokio::task::yield_now().await;
        let mut inner = self.begin(Operation::UpdateDocument, Some(collection), Some(id))?;

        let current = inner.find_document(collection, id)?;
        if let Some(expected) = expected {
            if current.revision() != *expected {
                return Err(RemoteError::PreconditionFailed);
            }
        }

        let now = inner.tick();
        let docs = inner.collection_mut(collection);
        let doc = docs
            .iter_mut()
            .find(|d| d.id.as_str() == id)
            .ok_or_else(|| not_found(collection, id))?;
        for (key, value) in data {
            doc.data.insert(key, value);
        }
        doc.updated_at = now;
        Ok(doc.clone())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> RemoteResult<()> {
        tokio::task::yield_now().await;
        let mut inner = self.begin(Operation::DeleteDocument, Some(collection), Some(id))?;
        let docs = inner.collection_mut(collection);
        let before = docs.len();
        docs.retain(|d| d.id.as_str() != id);
        if docs.len() == before {
            return Err(not_found(collection, id));
        }
        Ok(())
    }

    async fn upload_file(
        &self,
        bucket: &str,
        id: &FileId,
        file: FileUpload,
    ) -> RemoteResult<FileRef> {
        tokio::task::yield_now().await;
        let mut inner = self.begin(Operation::UploadFile, Some(bucket), Some(id.as_str()))?;

        let key = (bucket.to_string(), id.clone());
        if inner.files.contains_key(&key) {
            return Err(RemoteError::AlreadyExists(format!("File {id} already exists")));
        }
        let file_ref = FileRef {
            id: id.clone(),
            bucket_id: bucket.to_string(),
            name: file.name,
            mime_type: file.mime_type,
            size: file.data.len() as u64,
        };
        inner.files.insert(key, file_ref.clone());
        Ok(file_ref)
    }

    fn file_preview_url(
        &self,
        bucket: &str,
        file_id: &FileId,
        options: &PreviewOptions,
    ) -> RemoteResult<String> {
        let inner = self.begin(Operation::FilePreview, Some(bucket), Some(file_id.as_str()))?;
        if !inner.files.contains_key(&(bucket.to_string(), file_id.clone())) {
            return Err(RemoteError::Preview(format!("File {file_id} not found")));
        }
        Ok(format!(
            "memory://storage/{bucket}/{file_id}/preview?width={}&height={}&gravity={}&quality={}",
            options.width,
            options.height,
            options.gravity.as_str(),
            options.quality
        ))
    }

    async fn delete_file(&self, bucket: &str, file_id: &FileId) -> RemoteResult<()> {
        tokio::task::yield_now().await;
        let mut inner = self.begin(Operation::DeleteFile, Some(bucket), Some(file_id.as_str()))?;
        inner
            .files
            .remove(&(bucket.to_string(), file_id.clone()))
            .map(|_| ())
            .ok_or_else(|| RemoteError::NotFound(format!("File {file_id} not found")))
    }

    async fn search(
        &self,
        collection: &str,
        attribute: &str,
        term: &str,
    ) -> RemoteResult<DocumentList> {
        tokio::task::yield_now().await;
        let inner = self.begin(Operation::Search, Some(collection), None)?;
        let docs = inner.collections.get(collection).cloned().unwrap_or_default();
        apply_queries(
            collection,
            docs,
            &[Query::Search(attribute.to_string(), term.to_string())],
        )
    }

    fn avatar_initials_url(&self, name: &str) -> String {
        let initials: String = name
            .split_whitespace()
            .filter_map(|w| w.chars().next())
            .take(2)
            .collect::<String>()
            .to_uppercase();
        format!("memory://avatars/initials/{initials}")
    }

    fn session_secret(&self) -> Option<String> {
        self.lock().current_session.as_ref().map(|id| id.to_string())
    }

    fn restore_session_secret(&self, secret: Option<String>) {
        let mut inner = self.lock();
        let restored = secret
            .map(SessionId::from)
            .filter(|id| inner.sessions.contains_key(id));
        inner.current_session = restored;
    }
}

fn not_found(collection: &str, id: &str) -> RemoteError {
    RemoteError::NotFound(format!("Document {id} not found in {collection}"))
}

/// Evaluate filters, then ordering, then cursor and limit.
fn apply_queries(
    collection: &str,
    mut docs: Vec<Document>,
    queries: &[Query],
) -> RemoteResult<DocumentList> {
    for query in queries {
        match query {
            Query::Equal(attr, value) => docs.retain(|d| attribute_matches(d, attr, value)),
            Query::Search(attr, term) => {
                let needle = term.to_lowercase();
                docs.retain(|d| {
                    d.get(attr)
                        .and_then(Value::as_str)
                        .map(|s| s.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                });
            }
            _ => {}
        }
    }

    for query in queries {
        match query {
            Query::OrderAsc(attr) => docs.sort_by(|a, b| sort_key(a, attr).cmp(&sort_key(b, attr))),
            Query::OrderDesc(attr) => docs.sort_by(|a, b| sort_key(b, attr).cmp(&sort_key(a, attr))),
            _ => {}
        }
    }

    let total = docs.len() as u64;

    if let Some(cursor) = queries.iter().find_map(|q| match q {
        Query::CursorAfter(id) => Some(id),
        _ => None,
    }) {
        let pos = docs
            .iter()
            .position(|d| d.id.as_str() == cursor)
            .ok_or_else(|| not_found(collection, cursor))?;
        docs.drain(..=pos);
    }

    let limit = queries
        .iter()
        .find_map(|q| match q {
            Query::Limit(n) => Some(*n as usize),
            _ => None,
        })
        .unwrap_or(DEFAULT_LIST_LIMIT);
    docs.truncate(limit);

    Ok(DocumentList {
        total,
        documents: docs,
    })
}

fn attribute_matches(doc: &Document, attr: &str, value: &str) -> bool {
    if attr == ATTR_ID {
        return doc.id.as_str() == value;
    }
    match doc.get(attr) {
        Some(Value::String(s)) => s == value,
        Some(Value::Object(map)) => map.get(ATTR_ID).and_then(Value::as_str) == Some(value),
        Some(Value::Array(items)) => items.iter().any(|v| v.as_str() == Some(value)),
        Some(other) => other.to_string() == value,
        None => false,
    }
}

fn sort_key(doc: &Document, attr: &str) -> String {
    match attr {
        ATTR_CREATED_AT => doc.created_at.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true),
        ATTR_UPDATED_AT => doc.updated_at.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true),
        ATTR_ID => doc.id.to_string(),
        _ => doc
            .get(attr)
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default(),
    }
}
