use serde_json::json;
use tracing::info;

use snapgram_shared::constants::{ATTR_CREATED_AT, ATTR_LIKES};
use snapgram_shared::models::{Comment, NewComment};
use snapgram_shared::types::{CommentId, DocumentId, PostId, UserId};
use snapgram_shared::validation::validate_comment;

use super::relations::SetEdit;
use super::{decode, decode_all, fields, Api};
use crate::error::{ApiError, ApiResult};
use crate::remote::Query;

impl Api {
    pub async fn add_comment(&self, comment: NewComment) -> ApiResult<Comment> {
        validate_comment(&comment)?;
        let doc = self
            .remote
            .create_document(
                &self.config.comments_collection_id,
                &DocumentId::unique(),
                fields([
                    ("post", json!(comment.post_id)),
                    ("user", json!(comment.user_id)),
                    ("text", json!(comment.text.trim())),
                    (ATTR_LIKES, json!([])),
                ]),
            )
            .await?;
        info!(post_id = %comment.post_id, comment_id = %doc.id, "Comment added");
        decode(&doc)
    }

    /// Comments on a post, oldest first.
    pub async fn get_post_comments(&self, post_id: &PostId) -> ApiResult<Vec<Comment>> {
        let list = self
            .remote
            .list_documents(
                &self.config.comments_collection_id,
                &[
                    Query::equal("post", post_id.as_str()),
                    Query::OrderAsc(ATTR_CREATED_AT.to_string()),
                ],
            )
            .await?;
        decode_all(&list)
    }

    /// Delete a comment. Only its author may do so.
    pub async fn delete_comment(&self, comment_id: &CommentId, requester: &UserId) -> ApiResult<()> {
        let doc = self
            .remote
            .get_document(&self.config.comments_collection_id, comment_id.as_str())
            .await?;
        let comment: Comment = decode(&doc)?;
        if comment.user != *requester {
            return Err(ApiError::Forbidden(format!(
                "Comment {comment_id} belongs to another user"
            )));
        }

        self.remote
            .delete_document(&self.config.comments_collection_id, comment_id.as_str())
            .await?;
        info!(%comment_id, "Comment deleted");
        Ok(())
    }

    /// Whole-array write, same caveat as [`Api::set_post_likes`].
    pub async fn set_comment_likes(
        &self,
        comment_id: &CommentId,
        likes: Vec<UserId>,
    ) -> ApiResult<Comment> {
        let doc = self
            .remote
            .update_document(
                &self.config.comments_collection_id,
                comment_id.as_str(),
                fields([(ATTR_LIKES, json!(likes))]),
                None,
            )
            .await?;
        decode(&doc)
    }

    pub async fn like_comment(&self, comment_id: &CommentId, user_id: &UserId) -> ApiResult<Comment> {
        self.edit_comment_likes(comment_id, user_id, SetEdit::Add).await
    }

    pub async fn unlike_comment(&self, comment_id: &CommentId, user_id: &UserId) -> ApiResult<Comment> {
        self.edit_comment_likes(comment_id, user_id, SetEdit::Remove).await
    }

    async fn edit_comment_likes(
        &self,
        comment_id: &CommentId,
        user_id: &UserId,
        edit: SetEdit,
    ) -> ApiResult<Comment> {
        let edited = self
            .edit_relation(
                &self.config.comments_collection_id,
                comment_id.as_str(),
                ATTR_LIKES,
                user_id.as_str(),
                edit,
            )
            .await?;
        decode(&edited.doc)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{api, seed_user};
    use super::*;
    use crate::remote::memory::Operation;

    fn comment(post: &str, user: &UserId, text: &str) -> NewComment {
        NewComment {
            post_id: PostId::from(post),
            user_id: user.clone(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn only_author_deletes() {
        let (api, remote) = api();
        let ann = seed_user(&remote, "ann");
        let bob = seed_user(&remote, "bob");
        let c = api.add_comment(comment("p1", &ann.id, "first!")).await.unwrap();

        let err = api.delete_comment(&c.id, &bob.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert!(remote.calls_to(Operation::DeleteDocument).is_empty());

        api.delete_comment(&c.id, &ann.id).await.unwrap();
        assert!(api.get_post_comments(&PostId::from("p1")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_comment_rejected() {
        let (api, remote) = api();
        let ann = seed_user(&remote, "ann");
        let err = api.add_comment(comment("p1", &ann.id, "   ")).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn comment_likes() {
        let (api, remote) = api();
        let ann = seed_user(&remote, "ann");
        let bob = seed_user(&remote, "bob");
        let c = api.add_comment(comment("p1", &ann.id, "hi")).await.unwrap();

        api.like_comment(&c.id, &bob.id).await.unwrap();
        let liked = api.like_comment(&c.id, &ann.id).await.unwrap();
        assert_eq!(liked.likes, vec![bob.id.clone(), ann.id.clone()]);

        let cleared = api.set_comment_likes(&c.id, Vec::new()).await.unwrap();
        assert!(cleared.likes.is_empty());

        let again = api.unlike_comment(&c.id, &bob.id).await.unwrap();
        assert!(again.likes.is_empty());
    }
}
