use snapgram_shared::models::User;
use snapgram_shared::types::UserId;
use snapgram_shared::ValidationError;

use super::toast::{Toast, ACTION_FAILED};
use crate::error::ApiResult;
use crate::state::AppContext;

/// A follow or unfollow shown locally but not yet sent.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFollow {
    follower: UserId,
    target: UserId,
    follow: bool,
}

impl PendingFollow {
    /// Resolves to the follower's updated profile.
    pub async fn send(&self, ctx: &AppContext) -> ApiResult<User> {
        let queries = ctx.queries();
        if self.follow {
            queries.follow_user(&self.follower, &self.target).await
        } else {
            queries.unfollow_user(&self.follower, &self.target).await
        }
    }
}

/// Follow/unfollow toggle shown on another user's card or profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowButton {
    follower: UserId,
    target: UserId,
    following: bool,
}

impl FollowButton {
    /// Users cannot follow themselves, so there is no button for one's own
    /// profile.
    pub fn new(current: &User, target: &UserId) -> Result<Self, ValidationError> {
        if current.id == *target {
            return Err(ValidationError::SelfFollow);
        }
        Ok(Self {
            follower: current.id.clone(),
            target: target.clone(),
            following: current.is_following(target),
        })
    }

    pub fn is_following(&self) -> bool {
        self.following
    }

    pub fn label(&self) -> &'static str {
        if self.following {
            "Unfollow"
        } else {
            "Follow"
        }
    }

    pub fn begin(&mut self) -> PendingFollow {
        self.following = !self.following;
        PendingFollow {
            follower: self.follower.clone(),
            target: self.target.clone(),
            follow: self.following,
        }
    }

    pub fn finish(&mut self, pending: PendingFollow, result: ApiResult<User>) -> Result<(), Toast> {
        match result {
            Ok(me) => {
                self.following = me.is_following(&self.target);
                Ok(())
            }
            Err(e) => {
                self.following = !pending.follow;
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
    use crate::error::RemoteError;
    use crate::remote::memory::Operation;
    use crate::views::test_support::{context_with_post, UserFixture};

    #[tokio::test]
    async fn follow_then_unfollow() {
        let (ctx, _remote, _post, UserFixture { user, other }) = context_with_post().await;
        let mut button = FollowButton::new(&user, &other.id).unwrap();
        assert_eq!(button.label(), "Follow");

        button.toggle(&ctx).await.unwrap();
        assert!(button.is_following());
        let target = ctx.api().get_user_by_id(&other.id).await.unwrap();
        assert_eq!(target.followers, vec![user.id.clone()]);

        button.toggle(&ctx).await.unwrap();
        assert_eq!(button.label(), "Follow");
    }

    #[tokio::test]
    async fn label_flips_before_the_request() {
        let (ctx, remote, _post, UserFixture { user, other }) = context_with_post().await;
        let mut button = FollowButton::new(&user, &other.id).unwrap();
        remote.fail(Operation::UpdateDocument, RemoteError::RateLimited);

        let pending = button.begin();
        assert_eq!(button.label(), "Unfollow");
        let result = pending.send(&ctx).await;
        assert!(button.finish(pending, result).is_err());
        assert_eq!(button.label(), "Follow");
    }

    #[tokio::test]
    async fn no_button_for_self() {
        let (_ctx, _remote, _post, UserFixture { user, .. }) = context_with_post().await;
        assert_eq!(
            FollowButton::new(&user, &user.id).unwrap_err(),
            ValidationError::SelfFollow
        );
    }
}
