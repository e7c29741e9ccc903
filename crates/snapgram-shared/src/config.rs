//! Remote service configuration loaded from environment variables.
//!
//! All settings have defaults pointing at a local development instance so
//! that tests and offline runs need no environment at all.

/// Identifiers and endpoint of the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Base URL of the service API, including the version path.
    /// Env: `SNAPGRAM_ENDPOINT`
    /// Default: `http://localhost/v1`
    pub endpoint: String,

    /// Env: `SNAPGRAM_PROJECT_ID`
    pub project_id: String,

    /// Env: `SNAPGRAM_DATABASE_ID`
    pub database_id: String,

    /// Env: `SNAPGRAM_USER_COLLECTION_ID`
    pub user_collection_id: String,

    /// Env: `SNAPGRAM_POST_COLLECTION_ID`
    pub post_collection_id: String,

    /// Env: `SNAPGRAM_SAVES_COLLECTION_ID`
    pub saves_collection_id: String,

    /// Env: `SNAPGRAM_COMMENTS_COLLECTION_ID`
    pub comments_collection_id: String,

    /// Storage bucket holding post media and avatars.
    /// Env: `SNAPGRAM_STORAGE_ID`
    pub storage_id: String,

    /// OAuth client id for third-party sign-in. Not used by email sessions.
    /// Env: `SNAPGRAM_OAUTH_CLIENT_ID`
    pub oauth_client_id: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost/v1".to_string(),
            project_id: "snapgram".to_string(),
            database_id: "snapgram".to_string(),
            user_collection_id: "users".to_string(),
            post_collection_id: "posts".to_string(),
            saves_collection_id: "saves".to_string(),
            comments_collection_id: "comments".to_string(),
            storage_id: "media".to_string(),
            oauth_client_id: None,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Empty values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(endpoint) = get("SNAPGRAM_ENDPOINT") {
            if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
                config.endpoint = endpoint.trim_end_matches('/').to_string();
            } else {
                tracing::warn!(value = %endpoint, "Invalid SNAPGRAM_ENDPOINT, using default");
            }
        }

        let fields: [(&str, &mut String); 7] = [
            ("SNAPGRAM_PROJECT_ID", &mut config.project_id),
            ("SNAPGRAM_DATABASE_ID", &mut config.database_id),
            ("SNAPGRAM_USER_COLLECTION_ID", &mut config.user_collection_id),
            ("SNAPGRAM_POST_COLLECTION_ID", &mut config.post_collection_id),
            ("SNAPGRAM_SAVES_COLLECTION_ID", &mut config.saves_collection_id),
            ("SNAPGRAM_COMMENTS_COLLECTION_ID", &mut config.comments_collection_id),
            ("SNAPGRAM_STORAGE_ID", &mut config.storage_id),
        ];
        for (key, slot) in fields {
            if let Some(value) = get(key) {
                *slot = value;
            }
        }

        config.oauth_client_id = get("SNAPGRAM_OAUTH_CLIENT_ID");

        config
    }
}
