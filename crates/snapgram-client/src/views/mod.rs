//! View-level state: optimistic toggles and forms.

pub mod comments;
pub mod follow;
pub mod forms;
pub mod post_stats;
pub mod toast;

pub use comments::{CommentLikes, PendingCommentLike};
pub use follow::{FollowButton, PendingFollow};
pub use forms::{FormError, PostForm, PostFormMode, ProfileForm, SigninForm, SignupForm};
pub use post_stats::{delete_post, PendingLike, PendingSave, PostStats};
pub use toast::{Toast, ToastVariant};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use snapgram_shared::models::{NewPost, Post, User};
    use snapgram_shared::ServiceConfig;
    use snapgram_store::Database;

    use crate::api::test_support::{image, seed_user};
    use crate::remote::MemoryRemote;
    use crate::state::AppContext;

    pub struct UserFixture {
        pub user: User,
        pub other: User,
    }

    pub fn context() -> (AppContext, Arc<MemoryRemote>) {
        let remote = Arc::new(MemoryRemote::new());
        let ctx = AppContext::new(
            remote.clone(),
            ServiceConfig::default(),
            Database::open_in_memory().unwrap(),
        );
        (ctx, remote)
    }

    /// Two seeded users and one post by the first.
    pub async fn context_with_post() -> (AppContext, Arc<MemoryRemote>, Post, UserFixture) {
        let (ctx, remote) = context();
        let user = seed_user(&remote, "ann");
        let other = seed_user(&remote, "bob");
        let post = ctx
            .api()
            .create_post(NewPost {
                user_id: user.id.clone(),
                caption: "first light".into(),
                file: image("a.png"),
                location: None,
                tags: "sea, sun".into(),
            })
            .await
            .unwrap();
        (ctx, remote, post, UserFixture { user, other })
    }
}
