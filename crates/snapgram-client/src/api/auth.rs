use serde_json::json;
use tracing::{debug, info};

use snapgram_shared::models::{NewUser, Session, User};
use snapgram_shared::types::{AccountId, DocumentId};
use snapgram_shared::validation::{validate_new_user, validate_sign_in};

use super::{decode, fields, Api};
use crate::error::{ApiError, ApiResult};
use crate::remote::Query;

impl Api {
    /// Register an account and its profile document.
    ///
    /// The profile starts with a generated initials avatar and no followers.
    pub async fn create_user_account(&self, user: NewUser) -> ApiResult<User> {
        validate_new_user(&user)?;

        let account = self
            .remote
            .create_account(&AccountId::unique(), &user.email, &user.password, &user.name)
            .await?;
        let avatar_url = self.remote.avatar_initials_url(&account.name);

        let doc = self
            .remote
            .create_document(
                &self.config.user_collection_id,
                &DocumentId::unique(),
                fields([
                    ("accountId", json!(account.id)),
                    ("name", json!(account.name)),
                    ("email", json!(account.email)),
                    ("username", json!(user.username)),
                    ("imageUrl", json!(avatar_url)),
                    ("followers", json!([])),
                    ("following", json!([])),
                ]),
            )
            .await?;

        info!(account_id = %account.id, user_id = %doc.id, "User account created");
        decode(&doc)
    }

    pub async fn sign_in_account(&self, email: &str, password: &str) -> ApiResult<Session> {
        validate_sign_in(email, password)?;
        let session = self.remote.create_session(email, password).await?;
        info!(account_id = %session.account_id, "Signed in");
        Ok(session)
    }

    pub async fn sign_out_account(&self) -> ApiResult<()> {
        self.remote.delete_session().await?;
        info!("Signed out");
        Ok(())
    }

    /// The profile document of the signed-in account.
    pub async fn get_current_user(&self) -> ApiResult<User> {
        let account = self.remote.get_account().await?;
        let list = self
            .remote
            .list_documents(
                &self.config.user_collection_id,
                &[Query::equal("accountId", account.id.as_str())],
            )
            .await?;

        let doc = list.documents.first().ok_or_else(|| {
            debug!(account_id = %account.id, "account has no profile document");
            ApiError::NotFound(format!("Profile of account {}", account.id))
        })?;
        decode(doc)
    }
}
