//! Like and save toggles for one post.
//!
//! A toggle runs in three steps. `begin_*` flips the local state and returns
//! the pending request, `send` dispatches the mutation, and `finish_*`
//! settles the state from the result. Between `begin_*` and `finish_*` the
//! local state can disagree with the cache. A failed mutation reverts the
//! flip and yields a toast. `toggle_*` runs all three steps in one call.

use snapgram_shared::models::{Post, SavedEntry};
use snapgram_shared::types::{PostId, SaveId, UserId};

use super::toast::{Toast, ACTION_FAILED, POST_DELETE_FAILED};
use crate::error::{ApiError, ApiResult};
use crate::state::AppContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostStats {
    post_id: PostId,
    user_id: UserId,
    likes: Vec<UserId>,
    saved: bool,
    /// Bookmark record, unknown while a save is in flight.
    save_id: Option<SaveId>,
}

/// A like or unlike flipped locally but not yet sent.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLike {
    post_id: PostId,
    user_id: UserId,
    like: bool,
    previous: Vec<UserId>,
}

impl PendingLike {
    pub async fn send(&self, ctx: &AppContext) -> ApiResult<Post> {
        let queries = ctx.queries();
        if self.like {
            queries.like_post(&self.post_id, &self.user_id).await
        } else {
            queries.unlike_post(&self.post_id, &self.user_id).await
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SaveAction {
    Save,
    Unsave(SaveId),
}

/// A save or unsave flipped locally but not yet sent.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSave {
    post_id: PostId,
    user_id: UserId,
    action: SaveAction,
    previous: (bool, Option<SaveId>),
}

impl PendingSave {
    /// Resolves to the bookmark id after a save, `None` after an unsave.
    pub async fn send(&self, ctx: &AppContext) -> ApiResult<Option<SaveId>> {
        let queries = ctx.queries();
        match &self.action {
            SaveAction::Save => {
                let record = queries.save_post(&self.post_id, &self.user_id).await?;
                Ok(Some(record.id))
            }
            SaveAction::Unsave(save_id) => {
                queries.delete_saved_post(save_id).await?;
                Ok(None)
            }
        }
    }
}

impl PostStats {
    /// `saves` are the current user's bookmarks, used to find this post's.
    pub fn new(post: &Post, user_id: &UserId, saves: &[SavedEntry]) -> Self {
        let save_id = saves
            .iter()
            .find(|entry| entry.post.id == post.id)
            .map(|entry| entry.save.id.clone());
        Self {
            post_id: post.id.clone(),
            user_id: user_id.clone(),
            likes: post.likes.clone(),
            saved: save_id.is_some(),
            save_id,
        }
    }

    pub fn is_liked(&self) -> bool {
        self.likes.contains(&self.user_id)
    }

    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    pub fn begin_like(&mut self) -> PendingLike {
        let previous = self.likes.clone();
        let like = !self.is_liked();
        if like {
            self.likes.push(self.user_id.clone());
        } else {
            self.likes.retain(|id| *id != self.user_id);
        }
        PendingLike {
            post_id: self.post_id.clone(),
            user_id: self.user_id.clone(),
            like,
            previous,
        }
    }

    pub fn finish_like(&mut self, pending: PendingLike, result: ApiResult<Post>) -> Result<(), Toast> {
        match result {
            Ok(post) => {
                self.likes = post.likes;
                Ok(())
            }
            Err(e) => {
                self.likes = pending.previous;
                Err(Toast::failure(ACTION_FAILED, &e))
            }
        }
    }

    pub async fn toggle_like(&mut self, ctx: &AppContext) -> Result<(), Toast> {
        let pending = self.begin_like();
        let result = pending.send(ctx).await;
        self.finish_like(pending, result)
    }

    pub fn begin_save(&mut self) -> PendingSave {
        let previous = (self.saved, self.save_id.clone());
        let action = match self.save_id.take() {
            Some(save_id) => SaveAction::Unsave(save_id),
            None => SaveAction::Save,
        };
        self.saved = action == SaveAction::Save;
        PendingSave {
            post_id: self.post_id.clone(),
            user_id: self.user_id.clone(),
            action,
            previous,
        }
    }

    pub fn finish_save(
        &mut self,
        pending: PendingSave,
        result: ApiResult<Option<SaveId>>,
    ) -> Result<(), Toast> {
        match result {
            Ok(save_id) => {
                self.saved = save_id.is_some();
                self.save_id = save_id;
                Ok(())
            }
            Err(e) => {
                (self.saved, self.save_id) = pending.previous;
                Err(Toast::failure(ACTION_FAILED, &e))
            }
        }
    }

    pub async fn toggle_save(&mut self, ctx: &AppContext) -> Result<(), Toast> {
        let pending = self.begin_save();
        let result = pending.send(ctx).await;
        self.finish_save(pending, result)
    }
}

/// Delete button on the post details page. Only the creator gets one.
pub async fn delete_post(ctx: &AppContext, post: &Post, user_id: &UserId) -> Result<(), Toast> {
    if post.creator != *user_id {
        let err = ApiError::Forbidden("only the creator can delete a post".into());
        return Err(Toast::failure(POST_DELETE_FAILED, &err));
    }
    ctx.queries()
        .delete_post(&post.id, &post.image_id)
        .await
        .map_err(|e| Toast::failure(POST_DELETE_FAILED, &e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::remote::memory::Operation;
    use crate::views::test_support::{context_with_post, UserFixture};

    #[tokio::test]
    async fn like_toggle_round_trip() {
        let (ctx, remote, post, UserFixture { user, .. }) = context_with_post().await;
        let mut stats = PostStats::new(&post, &user.id, &[]);

        stats.toggle_like(&ctx).await.unwrap();
        assert!(stats.is_liked());
        assert_eq!(stats.like_count(), 1);

        stats.toggle_like(&ctx).await.unwrap();
        assert!(!stats.is_liked());
        let stored = remote.document("posts", post.id.as_str()).unwrap();
        assert!(stored.get("likes").unwrap().as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_like_reverts() {
        let (ctx, remote, post, UserFixture { user, .. }) = context_with_post().await;
        let mut stats = PostStats::new(&post, &user.id, &[]);
        remote.fail(Operation::UpdateDocument, RemoteError::RateLimited);

        let toast = stats.toggle_like(&ctx).await.unwrap_err();
        assert_eq!(toast.title, ACTION_FAILED);
        assert!(!stats.is_liked());
    }

    #[tokio::test]
    async fn like_shows_before_the_cache_catches_up() {
        let (ctx, _remote, post, UserFixture { user, .. }) = context_with_post().await;
        let mut stats = PostStats::new(&post, &user.id, &[]);

        let pending = stats.begin_like();
        assert!(stats.is_liked());
        let cached = ctx.queries().post_by_id(&post.id).await.data.unwrap();
        assert!(cached.likes.is_empty());

        let result = pending.send(&ctx).await;
        stats.finish_like(pending, result).unwrap();
        let cached = ctx.queries().post_by_id(&post.id).await.data.unwrap();
        assert_eq!(cached.likes, vec![user.id.clone()]);
    }

    #[tokio::test]
    async fn save_flips_before_the_request_and_reverts_on_failure() {
        let (ctx, remote, post, UserFixture { user, .. }) = context_with_post().await;
        let mut stats = PostStats::new(&post, &user.id, &[]);
        remote.fail(Operation::CreateDocument, RemoteError::RateLimited);

        let pending = stats.begin_save();
        assert!(stats.is_saved());
        let result = pending.send(&ctx).await;
        let toast = stats.finish_save(pending, result).unwrap_err();
        assert_eq!(toast.title, ACTION_FAILED);
        assert!(!stats.is_saved());
        assert!(remote.documents("saves").is_empty());
    }

    #[tokio::test]
    async fn save_toggle_tracks_record() {
        let (ctx, remote, post, UserFixture { user, .. }) = context_with_post().await;
        let mut stats = PostStats::new(&post, &user.id, &[]);

        stats.toggle_save(&ctx).await.unwrap();
        assert!(stats.is_saved());
        assert_eq!(remote.documents("saves").len(), 1);

        let saves = ctx.api().get_saved_posts(&user.id).await.unwrap();
        let reloaded = PostStats::new(&post, &user.id, &saves);
        assert!(reloaded.is_saved());

        stats.toggle_save(&ctx).await.unwrap();
        assert!(!stats.is_saved());
        assert!(remote.documents("saves").is_empty());
    }

    #[tokio::test]
    async fn only_creator_deletes() {
        let (ctx, remote, post, UserFixture { user, other }) = context_with_post().await;

        let toast = delete_post(&ctx, &post, &other.id).await.unwrap_err();
        assert_eq!(toast.title, POST_DELETE_FAILED);
        assert!(remote.document("posts", post.id.as_str()).is_some());

        delete_post(&ctx, &post, &user.id).await.unwrap();
        assert!(remote.document("posts", post.id.as_str()).is_none());
        assert!(!remote.file_exists("media", &post.image_id));
    }
}
