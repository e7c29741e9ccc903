use serde_json::json;
use tracing::{error, info, warn};

use snapgram_shared::constants::{ATTR_CREATED_AT, ATTR_FOLLOWERS, ATTR_FOLLOWING};
use snapgram_shared::models::{UpdateUser, User};
use snapgram_shared::types::UserId;
use snapgram_shared::validation::validate_update_user;
use snapgram_shared::ValidationError;

use super::relations::SetEdit;
use super::{decode, decode_all, fields, Api};
use crate::error::ApiResult;
use crate::remote::Query;

impl Api {
    /// Newest users first. `None` lists without a limit clause.
    pub async fn get_users(&self, limit: Option<u32>) -> ApiResult<Vec<User>> {
        let mut queries = vec![Query::order_desc(ATTR_CREATED_AT)];
        if let Some(limit) = limit {
            queries.push(Query::Limit(limit));
        }
        let list = self
            .remote
            .list_documents(&self.config.user_collection_id, &queries)
            .await?;
        decode_all(&list)
    }

    pub async fn get_user_by_id(&self, user_id: &UserId) -> ApiResult<User> {
        let doc = self
            .remote
            .get_document(&self.config.user_collection_id, user_id.as_str())
            .await?;
        decode(&doc)
    }

    /// Update the profile fields and optionally the avatar, with the same
    /// file rules as a post update.
    pub async fn update_user(&self, user: UpdateUser) -> ApiResult<User> {
        validate_update_user(&user)?;

        let replacement = match user.file {
            Some(file) => Some(self.upload_media(file).await?),
            None => None,
        };
        let (image_id, image_url) = match &replacement {
            Some(media) => (Some(media.file_id.clone()), media.url.clone()),
            None => (user.image_id.clone(), user.image_url.clone()),
        };

        let data = fields([
            ("name", json!(user.name)),
            ("username", json!(user.username)),
            ("bio", json!(user.bio)),
            ("imageUrl", json!(image_url)),
            ("imageId", json!(image_id)),
        ]);

        let result = self
            .remote
            .update_document(&self.config.user_collection_id, user.user_id.as_str(), data, None)
            .await;

        let doc = match result {
            Ok(doc) => doc,
            Err(e) => {
                if let Some(new) = &replacement {
                    warn!(user_id = %user.user_id, file_id = %new.file_id, error = %e,
                        "Profile update failed, removing new avatar");
                    self.discard_file(&new.file_id).await;
                }
                return Err(e.into());
            }
        };

        // generated initials have no file to delete
        if let (Some(_), Some(old)) = (&replacement, &user.image_id) {
            self.discard_file(old).await;
        }

        info!(user_id = %user.user_id, "Profile updated");
        decode(&doc)
    }

    /// Add `follower` to `target`'s followers and `target` to the
    /// follower's following list. Returns the follower's updated profile.
    pub async fn follow_user(&self, follower: &UserId, target: &UserId) -> ApiResult<User> {
        self.edit_follow(follower, target, SetEdit::Add).await
    }

    pub async fn unfollow_user(&self, follower: &UserId, target: &UserId) -> ApiResult<User> {
        self.edit_follow(follower, target, SetEdit::Remove).await
    }

    async fn edit_follow(&self, follower: &UserId, target: &UserId, edit: SetEdit) -> ApiResult<User> {
        if follower == target {
            return Err(ValidationError::SelfFollow.into());
        }
        let users = &self.config.user_collection_id;

        let first = self
            .edit_relation(users, target.as_str(), ATTR_FOLLOWERS, follower.as_str(), edit)
            .await?;

        match self
            .edit_relation(users, follower.as_str(), ATTR_FOLLOWING, target.as_str(), edit)
            .await
        {
            Ok(second) => {
                info!(%follower, %target, ?edit, "Follow relation updated");
                decode(&second.doc)
            }
            Err(e) => {
                // only undo a write this call made
                if first.changed {
                    if let Err(undo) = self
                        .edit_relation(
                            users,
                            target.as_str(),
                            ATTR_FOLLOWERS,
                            follower.as_str(),
                            edit.inverse(),
                        )
                        .await
                    {
                        error!(%follower, %target, error = %undo, "Failed to revert followers edit");
                    }
                }
                Err(e)
            }
        }
    }
}
