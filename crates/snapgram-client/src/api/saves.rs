use serde_json::json;
use tracing::{debug, info};

use snapgram_shared::constants::ATTR_CREATED_AT;
use snapgram_shared::models::{SavedEntry, SavedPost};
use snapgram_shared::types::{DocumentId, PostId, SaveId, UserId};

use super::{decode, decode_all, fields, Api};
use crate::error::{ApiError, ApiResult, RemoteError};
use crate::remote::Query;

impl Api {
    pub async fn save_post(&self, post_id: &PostId, user_id: &UserId) -> ApiResult<SavedPost> {
        let doc = self
            .remote
            .create_document(
                &self.config.saves_collection_id,
                &DocumentId::unique(),
                fields([("user", json!(user_id)), ("post", json!(post_id))]),
            )
            .await?;
        info!(%post_id, %user_id, "Post saved");
        decode(&doc)
    }

    pub async fn delete_saved_post(&self, save_id: &SaveId) -> ApiResult<()> {
        self.remote
            .delete_document(&self.config.saves_collection_id, save_id.as_str())
            .await?;
        info!(%save_id, "Saved post removed");
        Ok(())
    }

    /// Bookmark records of one user, newest first.
    pub async fn get_user_saves(&self, user_id: &UserId) -> ApiResult<Vec<SavedPost>> {
        let list = self
            .remote
            .list_documents(
                &self.config.saves_collection_id,
                &[
                    Query::equal("user", user_id.as_str()),
                    Query::order_desc(ATTR_CREATED_AT),
                ],
            )
            .await?;
        decode_all(&list)
    }

    /// Bookmarks of one user with their posts. Bookmarks whose post has
    /// since been deleted are skipped.
    pub async fn get_saved_posts(&self, user_id: &UserId) -> ApiResult<Vec<SavedEntry>> {
        let saves = self.get_user_saves(user_id).await?;
        let mut entries = Vec::with_capacity(saves.len());
        for save in saves {
            match self.get_post_by_id(&save.post).await {
                Ok(post) => entries.push(SavedEntry { save, post }),
                Err(ApiError::Remote(RemoteError::NotFound(_))) => {
                    debug!(save_id = %save.id, post_id = %save.post, "Skipping bookmark of deleted post");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{api, seed_user};
    use super::*;

    fn seed_post(remote: &crate::remote::MemoryRemote, id: &str, creator: &str) {
        remote.insert_document(
            "posts",
            id,
            fields([
                ("creator", json!(creator)),
                ("caption", json!("c")),
                ("imageId", json!("f1")),
                ("imageUrl", json!("memory://f1")),
            ]),
        );
    }

    #[tokio::test]
    async fn save_list_and_remove() {
        let (api, remote) = api();
        let ann = seed_user(&remote, "ann");
        seed_post(&remote, "p1", "ann");
        seed_post(&remote, "p2", "ann");

        let first = api.save_post(&PostId::from("p1"), &ann.id).await.unwrap();
        api.save_post(&PostId::from("p2"), &ann.id).await.unwrap();

        let saved = api.get_saved_posts(&ann.id).await.unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].post.id.as_str(), "p2");

        api.delete_saved_post(&first.id).await.unwrap();
        let saved = api.get_saved_posts(&ann.id).await.unwrap();
        assert_eq!(saved.len(), 1);
    }

    #[tokio::test]
    async fn deleted_posts_are_skipped() {
        let (api, remote) = api();
        let ann = seed_user(&remote, "ann");
        api.save_post(&PostId::from("gone"), &ann.id).await.unwrap();

        let saved = api.get_saved_posts(&ann.id).await.unwrap();
        assert!(saved.is_empty());
    }
}
