//! REST client for the hosted backend.
//!
//! Requests carry the project id header; the session credential returned at
//! sign-in (`X-Fallback-Cookies`) is replayed on every later request, which
//! is also what the client persists as its local session marker.

use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, IF_MATCH};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use snapgram_shared::models::{Account, FileRef, FileUpload, Session};
use snapgram_shared::types::{AccountId, DocumentId, FileId, Revision};
use snapgram_shared::{Document, DocumentList, Fields, ServiceConfig};

use super::{PreviewOptions, Query, RemoteDataService};
use crate::error::{RemoteError, RemoteResult};

const PROJECT_HEADER: &str = "X-Appwrite-Project";
const FALLBACK_COOKIES_HEADER: &str = "X-Fallback-Cookies";

/// Error body returned by the service.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct HttpRemote {
    client: Client,
    endpoint: String,
    project_id: String,
    database_id: String,
    session: RwLock<Option<String>>,
}

impl HttpRemote {
    pub fn new(config: &ServiceConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &ServiceConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            database_id: config.database_id.clone(),
            session: RwLock::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn documents_path(&self, collection: &str) -> String {
        format!(
            "/databases/{}/collections/{}/documents",
            self.database_id, collection
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self
            .client
            .request(method, self.url(path))
            .header(PROJECT_HEADER, &self.project_id);
        if let Some(cookies) = self.current_secret() {
            req = req.header(FALLBACK_COOKIES_HEADER, cookies);
        }
        req
    }

    fn current_secret(&self) -> Option<String> {
        self.session
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_secret(&self, secret: Option<String>) {
        *self
            .session
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = secret;
    }

    async fn send(&self, req: RequestBuilder) -> RemoteResult<Response> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let message = match resp.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
        };
        debug!(status = status.as_u16(), %message, "remote call failed");
        Err(RemoteError::from_status(status.as_u16(), message))
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> RemoteResult<T> {
        let resp = self.send(req).await?;
        resp.json::<T>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    fn query_params(queries: &[Query]) -> Vec<(&'static str, String)> {
        queries
            .iter()
            .map(|q| ("queries[]", q.to_query_string()))
            .collect()
    }
}

#[async_trait]
impl RemoteDataService for HttpRemote {
    async fn create_account(
        &self,
        id: &AccountId,
        email: &str,
        password: &str,
        name: &str,
    ) -> RemoteResult<Account> {
        let req = self.request(Method::POST, "/account").json(&json!({
            "userId": id,
            "email": email,
            "password": password,
            "name": name,
        }));
        self.send_json(req).await
    }

    async fn create_session(&self, email: &str, password: &str) -> RemoteResult<Session> {
        let req = self
            .request(Method::POST, "/account/sessions/email")
            .json(&json!({ "email": email, "password": password }));
        let resp = self.send(req).await?;

        match fallback_cookies(resp.headers()) {
            Some(cookies) => self.set_secret(Some(cookies)),
            None => warn!("session created without a fallback credential"),
        }

        resp.json::<Session>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn get_account(&self) -> RemoteResult<Account> {
        self.send_json(self.request(Method::GET, "/account")).await
    }

    async fn delete_session(&self) -> RemoteResult<()> {
        self.send(self.request(Method::DELETE, "/account/sessions/current"))
            .await?;
        self.set_secret(None);
        Ok(())
    }

    async fn create_document(
        &self,
        collection: &str,
        id: &DocumentId,
        data: Fields,
    ) -> RemoteResult<Document> {
        let req = self
            .request(Method::POST, &self.documents_path(collection))
            .json(&json!({ "documentId": id, "data": data }));
        self.send_json(req).await
    }

    async fn list_documents(
        &self,
        collection: &str,
        queries: &[Query],
    ) -> RemoteResult<DocumentList> {
        let req = self
            .request(Method::GET, &self.documents_path(collection))
            .query(&Self::query_params(queries));
        self.send_json(req).await
    }

    async fn get_document(&self, collection: &str, id: &str) -> RemoteResult<Document> {
        let path = format!("{}/{}", self.documents_path(collection), id);
        self.send_json(self.request(Method::GET, &path)).await
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        data: Fields,
        expected: Option<&Revision>,
    ) -> RemoteResult<Document> {
        let path = format!("{}/{}", self.documents_path(collection), id);
        let mut req = self
            .request(Method::PATCH, &path)
            .json(&json!({ "data": data }));
        if let Some(revision) = expected {
            req = req.header(IF_MATCH, format!("\"{revision}\""));
        }
        self.send_json(req).await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> RemoteResult<()> {
        let path = format!("{}/{}", self.documents_path(collection), id);
        self.send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    async fn upload_file(
        &self,
        bucket: &str,
        id: &FileId,
        file: FileUpload,
    ) -> RemoteResult<FileRef> {
        let part = Part::stream(file.data)
            .file_name(file.name)
            .mime_str(&file.mime_type)
            .map_err(|e| RemoteError::Transport(format!("Invalid mime type: {e}")))?;
        let form = Form::new()
            .text("fileId", id.to_string())
            .part("file", part);

        let path = format!("/storage/buckets/{bucket}/files");
        self.send_json(self.request(Method::POST, &path).multipart(form))
            .await
    }

    fn file_preview_url(
        &self,
        bucket: &str,
        file_id: &FileId,
        options: &PreviewOptions,
    ) -> RemoteResult<String> {
        let base = self.url(&format!("/storage/buckets/{bucket}/files/{file_id}/preview"));
        let url = Url::parse_with_params(
            &base,
            &[
                ("width", options.width.to_string()),
                ("height", options.height.to_string()),
                ("gravity", options.gravity.as_str().to_string()),
                ("quality", options.quality.to_string()),
                ("project", self.project_id.clone()),
            ],
        )
        .map_err(|e| RemoteError::Preview(e.to_string()))?;
        Ok(url.into())
    }

    async fn delete_file(&self, bucket: &str, file_id: &FileId) -> RemoteResult<()> {
        let path = format!("/storage/buckets/{bucket}/files/{file_id}");
        self.send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        attribute: &str,
        term: &str,
    ) -> RemoteResult<DocumentList> {
        let queries = [Query::Search(attribute.to_string(), term.to_string())];
        self.list_documents(collection, &queries).await
    }

    fn avatar_initials_url(&self, name: &str) -> String {
        let base = self.url("/avatars/initials");
        match Url::parse_with_params(&base, &[("name", name), ("project", &self.project_id)]) {
            Ok(url) => url.into(),
            Err(e) => {
                warn!(error = %e, "failed to build avatar url");
                base
            }
        }
    }

    fn session_secret(&self) -> Option<String> {
        self.current_secret()
    }

    fn restore_session_secret(&self, secret: Option<String>) {
        self.set_secret(secret);
    }
}

fn fallback_cookies(headers: &HeaderMap) -> Option<String> {
    headers
        .get(FALLBACK_COOKIES_HEADER)
        .and_then(|v: &HeaderValue| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
}
