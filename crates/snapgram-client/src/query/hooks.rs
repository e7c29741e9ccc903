//! Typed reads and mutations: the adapter wired to the cache.
//!
//! Reads go through [`QueryClient::query`] under their [`QueryKey`];
//! mutations go through [`QueryClient::mutate`] so the dependency table
//! decides what becomes stale.

use snapgram_shared::constants::USERS_DEFAULT_LIMIT;
use snapgram_shared::models::{
    Comment, NewComment, NewPost, NewUser, Post, PostDetails, SavedEntry, SavedPost, Session,
    UpdatePost, UpdateUser, User,
};
use snapgram_shared::types::{CommentId, FileId, PostId, SaveId, UserId};

use super::client::{QueryClient, QueryState};
use super::deps::Mutation;
use super::infinite::InfiniteData;
use super::key::QueryKey;
use crate::api::Api;
use crate::error::ApiResult;

#[derive(Clone)]
pub struct Queries {
    api: Api,
    cache: QueryClient,
}

impl Queries {
    pub fn new(api: Api, cache: QueryClient) -> Self {
        Self { api, cache }
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    pub fn cache(&self) -> &QueryClient {
        &self.cache
    }

    // -- reads ----------------------------------------------------------------

    pub async fn current_user(&self) -> QueryState<User> {
        self.cache
            .query(QueryKey::current_user(), || self.api.get_current_user())
            .await
    }

    pub async fn users(&self, limit: Option<u32>) -> QueryState<Vec<User>> {
        let limit = limit.or(Some(USERS_DEFAULT_LIMIT));
        self.cache
            .query(QueryKey::users(limit), || self.api.get_users(limit))
            .await
    }

    pub async fn user_by_id(&self, id: &UserId) -> QueryState<User> {
        self.cache
            .query(QueryKey::user_by_id(id), || self.api.get_user_by_id(id))
            .await
    }

    pub async fn user_posts(&self, id: &UserId) -> QueryState<Vec<Post>> {
        self.cache
            .query(QueryKey::user_posts(id), || self.api.get_user_posts(id))
            .await
    }

    pub async fn recent_posts(&self) -> QueryState<Vec<Post>> {
        self.cache
            .query(QueryKey::recent_posts(), || self.api.get_recent_posts())
            .await
    }

    pub async fn infinite_posts(&self) -> QueryState<InfiniteData<Post>> {
        self.cache
            .infinite_query(QueryKey::infinite_posts(), |cursor| {
                self.infinite_page(cursor)
            })
            .await
    }

    pub async fn next_posts_page(&self) -> QueryState<InfiniteData<Post>> {
        self.cache
            .fetch_next_page(QueryKey::infinite_posts(), |cursor| {
                self.infinite_page(cursor)
            })
            .await
    }

    async fn infinite_page(&self, cursor: Option<String>) -> ApiResult<Vec<Post>> {
        let cursor = cursor.map(PostId::from);
        self.api.get_infinite_posts(cursor.as_ref()).await
    }

    pub async fn post_by_id(&self, id: &PostId) -> QueryState<Post> {
        self.cache
            .query(QueryKey::post_by_id(id), || self.api.get_post_by_id(id))
            .await
    }

    pub async fn post_details(&self, id: &PostId) -> QueryState<PostDetails> {
        self.cache
            .query(QueryKey::post_details(id), || self.api.get_post_details(id))
            .await
    }

    pub async fn search_posts(&self, term: &str) -> QueryState<Vec<Post>> {
        self.cache
            .query(QueryKey::search_posts(term), || self.api.search_posts(term))
            .await
    }

    pub async fn saved_posts(&self, user: &UserId) -> QueryState<Vec<SavedEntry>> {
        self.cache
            .query(QueryKey::saved_posts(user), || self.api.get_saved_posts(user))
            .await
    }

    // -- mutations ------------------------------------------------------------

    pub async fn create_user_account(&self, user: NewUser) -> ApiResult<User> {
        self.cache
            .mutate(Mutation::CreateUserAccount, self.api.create_user_account(user))
            .await
    }

    pub async fn sign_in_account(&self, email: &str, password: &str) -> ApiResult<Session> {
        self.cache
            .mutate(Mutation::SignInAccount, self.api.sign_in_account(email, password))
            .await
    }

    pub async fn sign_out_account(&self) -> ApiResult<()> {
        self.cache
            .mutate(Mutation::SignOutAccount, self.api.sign_out_account())
            .await
    }

    pub async fn create_post(&self, post: NewPost) -> ApiResult<Post> {
        self.cache
            .mutate(Mutation::CreatePost, self.api.create_post(post))
            .await
    }

    pub async fn update_post(&self, post: UpdatePost) -> ApiResult<Post> {
        self.cache
            .mutate(Mutation::UpdatePost, self.api.update_post(post))
            .await
    }

    pub async fn delete_post(&self, post_id: &PostId, image_id: &FileId) -> ApiResult<()> {
        self.cache
            .mutate(Mutation::DeletePost, self.api.delete_post(post_id, image_id))
            .await
    }

    pub async fn set_post_likes(&self, post_id: &PostId, likes: Vec<UserId>) -> ApiResult<Post> {
        self.cache
            .mutate(Mutation::SetPostLikes, self.api.set_post_likes(post_id, likes))
            .await
    }

    pub async fn like_post(&self, post_id: &PostId, user_id: &UserId) -> ApiResult<Post> {
        self.cache
            .mutate(Mutation::LikePost, self.api.like_post(post_id, user_id))
            .await
    }

    pub async fn unlike_post(&self, post_id: &PostId, user_id: &UserId) -> ApiResult<Post> {
        self.cache
            .mutate(Mutation::UnlikePost, self.api.unlike_post(post_id, user_id))
            .await
    }

    pub async fn save_post(&self, post_id: &PostId, user_id: &UserId) -> ApiResult<SavedPost> {
        self.cache
            .mutate(Mutation::SavePost, self.api.save_post(post_id, user_id))
            .await
    }

    pub async fn delete_saved_post(&self, save_id: &SaveId) -> ApiResult<()> {
        self.cache
            .mutate(Mutation::DeleteSavedPost, self.api.delete_saved_post(save_id))
            .await
    }

    pub async fn update_user(&self, user: UpdateUser) -> ApiResult<User> {
        self.cache
            .mutate(Mutation::UpdateUser, self.api.update_user(user))
            .await
    }

    pub async fn follow_user(&self, follower: &UserId, target: &UserId) -> ApiResult<User> {
        self.cache
            .mutate(Mutation::FollowUser, self.api.follow_user(follower, target))
            .await
    }

    pub async fn unfollow_user(&self, follower: &UserId, target: &UserId) -> ApiResult<User> {
        self.cache
            .mutate(Mutation::UnfollowUser, self.api.unfollow_user(follower, target))
            .await
    }

    pub async fn add_comment(&self, comment: NewComment) -> ApiResult<Comment> {
        self.cache
            .mutate(Mutation::AddComment, self.api.add_comment(comment))
            .await
    }

    pub async fn delete_comment(&self, comment_id: &CommentId, requester: &UserId) -> ApiResult<()> {
        self.cache
            .mutate(Mutation::DeleteComment, self.api.delete_comment(comment_id, requester))
            .await
    }

    pub async fn set_comment_likes(
        &self,
        comment_id: &CommentId,
        likes: Vec<UserId>,
    ) -> ApiResult<Comment> {
        self.cache
            .mutate(Mutation::SetCommentLikes, self.api.set_comment_likes(comment_id, likes))
            .await
    }

    pub async fn like_comment(&self, comment_id: &CommentId, user_id: &UserId) -> ApiResult<Comment> {
        self.cache
            .mutate(Mutation::LikeComment, self.api.like_comment(comment_id, user_id))
            .await
    }

    pub async fn unlike_comment(
        &self,
        comment_id: &CommentId,
        user_id: &UserId,
    ) -> ApiResult<Comment> {
        self.cache
            .mutate(Mutation::UnlikeComment, self.api.unlike_comment(comment_id, user_id))
            .await
    }
}
