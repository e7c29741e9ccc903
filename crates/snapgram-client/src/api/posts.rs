use std::collections::HashMap;

use futures::future::try_join_all;
use serde_json::json;
use tracing::{info, warn};

use snapgram_shared::constants::{
    ATTR_CREATED_AT, ATTR_LIKES, ATTR_UPDATED_AT, INFINITE_POSTS_PAGE_SIZE, RECENT_POSTS_LIMIT,
};
use snapgram_shared::models::{
    parse_tags, CommentThread, NewPost, Post, PostDetails, UpdatePost, User,
};
use snapgram_shared::types::{DocumentId, FileId, PostId, UserId};
use snapgram_shared::validation::{validate_new_post, validate_update_post};
use snapgram_shared::ValidationError;

use super::media::UploadedMedia;
use super::relations::SetEdit;
use super::{decode, decode_all, fields, Api};
use crate::error::ApiResult;
use crate::remote::Query;

impl Api {
    /// Upload the media, resolve its preview and write the post record.
    /// The upload is deleted again if either later step fails.
    pub async fn create_post(&self, post: NewPost) -> ApiResult<Post> {
        validate_new_post(&post)?;

        let media = self.upload_media(post.file).await?;
        let data = fields([
            ("creator", json!(post.user_id)),
            ("caption", json!(post.caption)),
            ("imageUrl", json!(media.url)),
            ("imageId", json!(media.file_id)),
            ("location", json!(post.location)),
            ("tags", json!(parse_tags(&post.tags))),
            (ATTR_LIKES, json!([])),
        ]);

        let doc = match self
            .remote
            .create_document(&self.config.post_collection_id, &DocumentId::unique(), data)
            .await
        {
            Ok(doc) => doc,
            Err(e) => {
                warn!(file_id = %media.file_id, error = %e, "Post record failed, removing upload");
                self.discard_file(&media.file_id).await;
                return Err(e.into());
            }
        };

        info!(post_id = %doc.id, creator = %post.user_id, "Post created");
        decode(&doc)
    }

    /// Update caption, location, tags and optionally the media.
    ///
    /// With a replacement file, the old file is deleted only once the record
    /// update succeeded; if the update fails the new upload is deleted and
    /// the old file stays attached.
    pub async fn update_post(&self, post: UpdatePost) -> ApiResult<Post> {
        validate_update_post(&post)?;

        let replacement = match post.file {
            Some(file) => Some(self.upload_media(file).await?),
            None => None,
        };
        let media = replacement.clone().unwrap_or_else(|| UploadedMedia {
            file_id: post.image_id.clone(),
            url: post.image_url.clone(),
        });

        let data = fields([
            ("caption", json!(post.caption)),
            ("imageUrl", json!(media.url)),
            ("imageId", json!(media.file_id)),
            ("location", json!(post.location)),
            ("tags", json!(parse_tags(&post.tags))),
        ]);

        let result = self
            .remote
            .update_document(&self.config.post_collection_id, post.post_id.as_str(), data, None)
            .await;

        let doc = match result {
            Ok(doc) => doc,
            Err(e) => {
                if let Some(new) = &replacement {
                    warn!(post_id = %post.post_id, file_id = %new.file_id, error = %e,
                        "Post update failed, removing new upload");
                    self.discard_file(&new.file_id).await;
                }
                return Err(e.into());
            }
        };

        if replacement.is_some() && !post.image_id.is_empty() {
            self.discard_file(&post.image_id).await;
        }

        info!(post_id = %post.post_id, "Post updated");
        decode(&doc)
    }

    /// Delete the post record, then its media.
    pub async fn delete_post(&self, post_id: &PostId, image_id: &FileId) -> ApiResult<()> {
        if post_id.is_empty() {
            return Err(ValidationError::Required("post id").into());
        }
        if image_id.is_empty() {
            return Err(ValidationError::Required("image id").into());
        }

        self.remote
            .delete_document(&self.config.post_collection_id, post_id.as_str())
            .await?;
        self.discard_file(image_id).await;

        info!(%post_id, "Post deleted");
        Ok(())
    }

    /// The newest posts for the home feed.
    pub async fn get_recent_posts(&self) -> ApiResult<Vec<Post>> {
        self.list_posts(vec![
            Query::order_desc(ATTR_CREATED_AT),
            Query::Limit(RECENT_POSTS_LIMIT),
        ])
        .await
    }

    /// One page of the explore feed, continuing after `cursor`.
    pub async fn get_infinite_posts(&self, cursor: Option<&PostId>) -> ApiResult<Vec<Post>> {
        let mut queries = vec![
            Query::order_desc(ATTR_UPDATED_AT),
            Query::Limit(INFINITE_POSTS_PAGE_SIZE),
        ];
        if let Some(cursor) = cursor {
            queries.push(Query::cursor_after(cursor.as_str()));
        }
        self.list_posts(queries).await
    }

    pub async fn get_post_by_id(&self, post_id: &PostId) -> ApiResult<Post> {
        let doc = self
            .remote
            .get_document(&self.config.post_collection_id, post_id.as_str())
            .await?;
        decode(&doc)
    }

    /// A post with its creator and its comments, each with its author.
    pub async fn get_post_details(&self, post_id: &PostId) -> ApiResult<PostDetails> {
        let post = self.get_post_by_id(post_id).await?;
        let (creator, comments) = futures::try_join!(
            self.get_user_by_id(&post.creator),
            self.get_post_comments(post_id),
        )?;

        let mut author_ids: Vec<&UserId> = comments.iter().map(|c| &c.user).collect();
        author_ids.sort();
        author_ids.dedup();
        let authors: HashMap<UserId, User> =
            try_join_all(author_ids.into_iter().map(|id| self.get_user_by_id(id)))
                .await?
                .into_iter()
                .map(|u| (u.id.clone(), u))
                .collect();

        let comments = comments
            .into_iter()
            .filter_map(|comment| {
                let author = authors.get(&comment.user)?.clone();
                Some(CommentThread { comment, author })
            })
            .collect();

        Ok(PostDetails {
            post,
            creator,
            comments,
        })
    }

    pub async fn get_user_posts(&self, user_id: &UserId) -> ApiResult<Vec<Post>> {
        self.list_posts(vec![
            Query::equal("creator", user_id.as_str()),
            Query::order_desc(ATTR_CREATED_AT),
        ])
        .await
    }

    pub async fn search_posts(&self, term: &str) -> ApiResult<Vec<Post>> {
        let list = self
            .remote
            .search(&self.config.post_collection_id, "caption", term)
            .await?;
        decode_all(&list)
    }

    /// Overwrite the whole likes array.
    ///
    /// Not guarded against concurrent writers: two callers starting from the
    /// same array lose one of the edits. Prefer [`Api::like_post`].
    pub async fn set_post_likes(&self, post_id: &PostId, likes: Vec<UserId>) -> ApiResult<Post> {
        let doc = self
            .remote
            .update_document(
                &self.config.post_collection_id,
                post_id.as_str(),
                fields([(ATTR_LIKES, json!(likes))]),
                None,
            )
            .await?;
        decode(&doc)
    }

    pub async fn like_post(&self, post_id: &PostId, user_id: &UserId) -> ApiResult<Post> {
        self.edit_post_likes(post_id, user_id, SetEdit::Add).await
    }

    pub async fn unlike_post(&self, post_id: &PostId, user_id: &UserId) -> ApiResult<Post> {
        self.edit_post_likes(post_id, user_id, SetEdit::Remove).await
    }

    async fn edit_post_likes(
        &self,
        post_id: &PostId,
        user_id: &UserId,
        edit: SetEdit,
    ) -> ApiResult<Post> {
        let edited = self
            .edit_relation(
                &self.config.post_collection_id,
                post_id.as_str(),
                ATTR_LIKES,
                user_id.as_str(),
                edit,
            )
            .await?;
        decode(&edited.doc)
    }

    async fn list_posts(&self, queries: Vec<Query>) -> ApiResult<Vec<Post>> {
        let list = self
            .remote
            .list_documents(&self.config.post_collection_id, &queries)
            .await?;
        decode_all(&list)
    }
}
