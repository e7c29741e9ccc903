//! Form state for sign-up, sign-in, posts and profiles.
//!
//! `submit` validates first and makes no remote call when validation fails.
//! Remote failures come back as a generic [`Toast`].

use thiserror::Error;

use snapgram_shared::models::{
    FileUpload, NewPost, NewUser, Post, UpdatePost, UpdateUser, User, UserProfile,
};
use snapgram_shared::types::{FileId, PostId, UserId};
use snapgram_shared::validation::{
    validate_new_post, validate_new_user, validate_sign_in, validate_update_post,
    validate_update_user,
};
use snapgram_shared::ValidationError;

use super::toast::{
    Toast, POST_CREATE_FAILED, POST_UPDATE_FAILED, PROFILE_UPDATE_FAILED, SIGN_IN_FAILED,
    SIGN_UP_FAILED,
};
use crate::state::AppContext;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    /// Rejected before any network call; shown next to the field.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("{}", .0.title)]
    Failed(Toast),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupForm {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<NewUser, ValidationError> {
        let user = NewUser {
            name: self.name.trim().to_string(),
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        };
        validate_new_user(&user)?;
        Ok(user)
    }

    /// Create the account and sign straight in.
    pub async fn submit(&self, ctx: &AppContext) -> Result<UserProfile, FormError> {
        let user = self.validate()?;
        ctx.session()
            .sign_up(user)
            .await
            .map_err(|e| FormError::Failed(Toast::failure(SIGN_UP_FAILED, &e)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigninForm {
    pub email: String,
    pub password: String,
}

impl SigninForm {
    pub async fn submit(&self, ctx: &AppContext) -> Result<UserProfile, FormError> {
        let email = self.email.trim();
        validate_sign_in(email, &self.password)?;
        ctx.session()
            .sign_in(email, &self.password)
            .await
            .map_err(|e| FormError::Failed(Toast::failure(SIGN_IN_FAILED, &e)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFormMode {
    Create {
        user_id: UserId,
    },
    Update {
        post_id: PostId,
        image_id: FileId,
        image_url: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostForm {
    pub mode: PostFormMode,
    pub caption: String,
    /// Newly picked file. Required when creating.
    pub file: Option<FileUpload>,
    pub location: String,
    /// Comma separated.
    pub tags: String,
}

impl PostForm {
    pub fn create(user_id: &UserId) -> Self {
        Self {
            mode: PostFormMode::Create {
                user_id: user_id.clone(),
            },
            caption: String::new(),
            file: None,
            location: String::new(),
            tags: String::new(),
        }
    }

    /// Prefilled from an existing post.
    pub fn edit(post: &Post) -> Self {
        Self {
            mode: PostFormMode::Update {
                post_id: post.id.clone(),
                image_id: post.image_id.clone(),
                image_url: post.image_url.clone(),
            },
            caption: post.caption.clone(),
            file: None,
            location: post.location.clone().unwrap_or_default(),
            tags: post.tags.join(", "),
        }
    }

    fn location(&self) -> Option<String> {
        let location = self.location.trim();
        (!location.is_empty()).then(|| location.to_string())
    }

    pub async fn submit(&self, ctx: &AppContext) -> Result<Post, FormError> {
        let queries = ctx.queries();
        match &self.mode {
            PostFormMode::Create { user_id } => {
                let file = self.file.clone().ok_or(ValidationError::MissingFile)?;
                let post = NewPost {
                    user_id: user_id.clone(),
                    caption: self.caption.clone(),
                    file,
                    location: self.location(),
                    tags: self.tags.clone(),
                };
                validate_new_post(&post)?;
                queries
                    .create_post(post)
                    .await
                    .map_err(|e| FormError::Failed(Toast::failure(POST_CREATE_FAILED, &e)))
            }
            PostFormMode::Update {
                post_id,
                image_id,
                image_url,
            } => {
                let post = UpdatePost {
                    post_id: post_id.clone(),
                    caption: self.caption.clone(),
                    image_id: image_id.clone(),
                    image_url: image_url.clone(),
                    file: self.file.clone(),
                    location: self.location(),
                    tags: self.tags.clone(),
                };
                validate_update_post(&post)?;
                queries
                    .update_post(post)
                    .await
                    .map_err(|e| FormError::Failed(Toast::failure(POST_UPDATE_FAILED, &e)))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileForm {
    user_id: UserId,
    image_id: Option<FileId>,
    image_url: String,
    pub name: String,
    pub username: String,
    pub bio: String,
    pub file: Option<FileUpload>,
}

impl ProfileForm {
    pub fn new(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            image_id: user.image_id.clone(),
            image_url: user.image_url.clone(),
            name: user.name.clone(),
            username: user.username.clone(),
            bio: user.bio.clone().unwrap_or_default(),
            file: None,
        }
    }

    /// Save the profile, then refresh the signed-in user held by the
    /// session context.
    pub async fn submit(&self, ctx: &AppContext) -> Result<User, FormError> {
        let update = UpdateUser {
            user_id: self.user_id.clone(),
            name: self.name.trim().to_string(),
            username: self.username.trim().to_string(),
            bio: self.bio.clone(),
            image_id: self.image_id.clone(),
            image_url: self.image_url.clone(),
            file: self.file.clone(),
        };
        validate_update_user(&update)?;

        let user = ctx
            .queries()
            .update_user(update)
            .await
            .map_err(|e| FormError::Failed(Toast::failure(PROFILE_UPDATE_FAILED, &e)))?;
        ctx.session().check_auth_user().await;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::image;
    use crate::error::RemoteError;
    use crate::remote::memory::Operation;
    use crate::views::test_support::{context, context_with_post, UserFixture};

    fn signup() -> SignupForm {
        SignupForm {
            name: "Ann".into(),
            username: "ann1".into(),
            email: "ann@x.com".into(),
            password: "secret1".into(),
        }
    }

    #[tokio::test]
    async fn invalid_signup_makes_no_calls() {
        let (ctx, remote) = context();
        let form = SignupForm {
            password: "123".into(),
            ..signup()
        };
        let err = form.submit(&ctx).await.unwrap_err();
        assert_eq!(
            err,
            FormError::Invalid(ValidationError::TooShort {
                field: "password",
                min: 6
            })
        );
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn duplicate_signup_shows_generic_toast() {
        let (ctx, _remote) = context();
        signup().submit(&ctx).await.unwrap();
        ctx.session().sign_out().await.unwrap();

        let err = signup().submit(&ctx).await.unwrap_err();
        match err {
            FormError::Failed(toast) => assert_eq!(toast.title, SIGN_UP_FAILED),
            other => panic!("expected toast, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn signin_form_authenticates() {
        let (ctx, _remote) = context();
        signup().submit(&ctx).await.unwrap();
        ctx.session().sign_out().await.unwrap();

        let form = SigninForm {
            email: " ann@x.com ".into(),
            password: "secret1".into(),
        };
        let profile = form.submit(&ctx).await.unwrap();
        assert_eq!(profile.username, "ann1");
    }

    #[tokio::test]
    async fn create_requires_file() {
        let (ctx, remote, _post, UserFixture { user, .. }) = context_with_post().await;
        remote.clear_calls();
        let form = PostForm {
            caption: "no photo".into(),
            ..PostForm::create(&user.id)
        };
        assert_eq!(
            form.submit(&ctx).await.unwrap_err(),
            FormError::Invalid(ValidationError::MissingFile)
        );
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn edit_form_keeps_fields() {
        let (ctx, _remote, post, _) = context_with_post().await;
        let mut form = PostForm::edit(&post);
        assert_eq!(form.tags, "sea, sun");
        form.caption = "new caption".into();

        let updated = form.submit(&ctx).await.unwrap();
        assert_eq!(updated.caption, "new caption");
        assert_eq!(updated.tags, vec!["sea", "sun"]);
        assert_eq!(updated.image_id, post.image_id);
    }

    #[tokio::test]
    async fn create_failure_is_a_toast() {
        let (ctx, remote, _post, UserFixture { user, .. }) = context_with_post().await;
        remote.fail(Operation::UploadFile, RemoteError::RateLimited);
        let form = PostForm {
            file: Some(image("b.png")),
            ..PostForm::create(&user.id)
        };
        match form.submit(&ctx).await.unwrap_err() {
            FormError::Failed(toast) => assert_eq!(toast.title, POST_CREATE_FAILED),
            other => panic!("expected toast, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn profile_form_refreshes_session() {
        let (ctx, _remote) = context();
        signup().submit(&ctx).await.unwrap();
        let me = ctx.api().get_current_user().await.unwrap();

        let mut form = ProfileForm::new(&me);
        form.bio = "street photographer".into();
        form.submit(&ctx).await.unwrap();

        let profile = ctx.session().require_user().await.unwrap();
        assert_eq!(profile.bio, "street photographer");
    }
}
