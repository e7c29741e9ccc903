use snapgram_shared::models::Comment;
use snapgram_shared::types::{CommentId, UserId};

use super::toast::{Toast, ACTION_FAILED};
use crate::error::ApiResult;
use crate::state::AppContext;

/// A comment like or unlike shown locally but not yet sent.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommentLike {
    comment_id: CommentId,
    user_id: UserId,
    like: bool,
    previous: Vec<UserId>,
}

impl PendingCommentLike {
    pub async fn send(&self, ctx: &AppContext) -> ApiResult<Comment> {
        let queries = ctx.queries();
        if self.like {
            queries.like_comment(&self.comment_id, &self.user_id).await
        } else {
            queries.unlike_comment(&self.comment_id, &self.user_id).await
        }
    }
}

/// Like toggle under one comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentLikes {
    comment_id: CommentId,
    user_id: UserId,
    likes: Vec<UserId>,
}

impl CommentLikes {
    pub fn new(comment: &Comment, user_id: &UserId) -> Self {
        Self {
            comment_id: comment.id.clone(),
            user_id: user_id.clone(),
            likes: comment.likes.clone(),
        }
    }

    pub fn is_liked(&self) -> bool {
        self.likes.contains(&self.user_id)
    }

    pub fn count(&self) -> usize {
        self.likes.len()
    }

    pub fn begin(&mut self) -> PendingCommentLike {
        let previous = self.likes.clone();
        let like = !self.is_liked();
        if like {
            self.likes.push(self.user_id.clone());
        } else {
            self.likes.retain(|id| *id != self.user_id);
        }
        PendingCommentLike {
            comment_id: self.comment_id.clone(),
            user_id: self.user_id.clone(),
            like,
            previous,
        }
    }

    pub fn finish(
        &mut self,
        pending: PendingCommentLike,
        result: ApiResult<Comment>,
    ) -> Result<(), Toast> {
        match result {
            Ok(comment) => {
                self.likes = comment.likes;
                Ok(())
            }
            Err(e) => {
                self.likes = pending.previous;
                Err(Toast::failure(ACTION_FAILED, &e))
            }
        }
    }

    pub async fn toggle(&mut self, ctx: &AppContext) -> Result<(), Toast> {
        let pending = self.begin();
        let result = pending.send(ctx).await;
        self.finish(pending, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapgram_shared::models::NewComment;

    use crate::views::test_support::{context_with_post, UserFixture};

    #[tokio::test]
    async fn toggle_comment_like() {
        let (ctx, _remote, post, UserFixture { user, other }) = context_with_post().await;
        let comment = ctx
            .queries()
            .add_comment(NewComment {
                post_id: post.id.clone(),
                user_id: other.id.clone(),
                text: "lovely".into(),
            })
            .await
            .unwrap();

        let mut likes = CommentLikes::new(&comment, &user.id);
        likes.toggle(&ctx).await.unwrap();
        assert!(likes.is_liked());
        assert_eq!(likes.count(), 1);

        likes.toggle(&ctx).await.unwrap();
        assert_eq!(likes.count(), 0);
    }
}
