//! API adapter: one method per remote operation.
//!
//! Every method returns [`ApiResult`]. Composite operations (post and avatar
//! uploads) run upload, preview and record in order and delete the uploaded
//! file again when a later step fails.

mod auth;
mod comments;
mod media;
mod posts;
mod relations;
mod saves;
mod users;

use std::sync::Arc;

use serde_json::Value;

use snapgram_shared::error::ModelError;
use snapgram_shared::{Document, DocumentList, Fields, ServiceConfig};

use crate::error::ApiResult;
use crate::remote::RemoteDataService;

pub use relations::SetEdit;

/// Handle to the remote data service with the configured collection ids.
#[derive(Clone)]
pub struct Api {
    remote: Arc<dyn RemoteDataService>,
    config: Arc<ServiceConfig>,
}

impl Api {
    pub fn new(remote: Arc<dyn RemoteDataService>, config: ServiceConfig) -> Self {
        Self {
            remote,
            config: Arc::new(config),
        }
    }

    pub fn remote(&self) -> &Arc<dyn RemoteDataService> {
        &self.remote
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

/// Decode one document into a domain model.
pub(crate) fn decode<T>(doc: &Document) -> ApiResult<T>
where
    T: for<'a> TryFrom<&'a Document, Error = ModelError>,
{
    Ok(T::try_from(doc)?)
}

pub(crate) fn decode_all<T>(list: &DocumentList) -> ApiResult<Vec<T>>
where
    T: for<'a> TryFrom<&'a Document, Error = ModelError>,
{
    list.documents.iter().map(decode).collect()
}

/// Build an attribute map from `(name, value)` pairs.
pub(crate) fn fields<const N: usize>(pairs: [(&str, Value); N]) -> Fields {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use serde_json::json;
    use snapgram_shared::models::{FileUpload, NewUser, User};
    use snapgram_shared::ServiceConfig;

    use super::Api;
    use crate::remote::MemoryRemote;

    pub fn api() -> (Api, Arc<MemoryRemote>) {
        let remote = Arc::new(MemoryRemote::new());
        let api = Api::new(remote.clone(), ServiceConfig::default());
        (api, remote)
    }

    pub fn image(name: &str) -> FileUpload {
        FileUpload::new(name, "image/png", vec![0x89, b'P', b'N', b'G'])
    }

    pub fn new_user(name: &str, username: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            username: username.to_string(),
            email: format!("{username}@x.com"),
            password: "secret1".to_string(),
        }
    }

    /// Seed a user profile document without going through sign-up.
    pub fn seed_user(remote: &MemoryRemote, id: &str) -> User {
        let doc = remote.insert_document(
            "users",
            id,
            super::fields([
                ("accountId", json!(format!("acc-{id}"))),
                ("name", json!(id)),
                ("username", json!(id)),
                ("email", json!(format!("{id}@x.com"))),
                ("imageUrl", json!("memory://avatars/initials/X")),
                ("followers", json!([])),
                ("following", json!([])),
            ]),
        );
        User::try_from(&doc).unwrap()
    }
}
