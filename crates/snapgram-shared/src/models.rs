//! Domain models decoded from remote documents.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be cached
//! and handed to the view layer unchanged.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::ModelError;
use crate::types::{AccountId, CommentId, FileId, PostId, SaveId, SessionId, UserId};

// ---------------------------------------------------------------------------
// Account / session
// ---------------------------------------------------------------------------

/// An authentication principal held by the remote account service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    #[serde(rename = "$id")]
    pub id: AccountId,
    pub name: String,
    pub email: String,
    #[serde(rename = "$createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    #[serde(rename = "$id")]
    pub id: SessionId,
    #[serde(rename = "userId")]
    pub account_id: AccountId,
    pub expire: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Metadata of a file held in object storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRef {
    #[serde(rename = "$id")]
    pub id: FileId,
    #[serde(rename = "bucketId")]
    pub bucket_id: String,
    pub name: String,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
    #[serde(rename = "sizeOriginal", default)]
    pub size: u64,
}

/// A file selected by the user, ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub account_id: AccountId,
    pub name: String,
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    pub image_url: String,
    /// Set once the user uploads an avatar; generated initials have no file.
    pub image_id: Option<FileId>,
    pub followers: Vec<UserId>,
    pub following: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            image_url: self.image_url.clone(),
            bio: self.bio.clone().unwrap_or_default(),
        }
    }

    pub fn is_following(&self, other: &UserId) -> bool {
        self.following.contains(other)
    }
}

impl TryFrom<&Document> for User {
    type Error = ModelError;

    fn try_from(doc: &Document) -> Result<Self, Self::Error> {
        Ok(Self {
            id: doc.id.as_str().into(),
            account_id: doc.str_attr("accountId")?.into(),
            name: doc.str_attr("name")?.to_string(),
            username: doc.opt_str_attr("username")?.unwrap_or_default().to_string(),
            email: doc.str_attr("email")?.to_string(),
            bio: doc.opt_str_attr("bio")?.map(String::from),
            image_url: doc.opt_str_attr("imageUrl")?.unwrap_or_default().to_string(),
            image_id: doc.opt_str_attr("imageId")?.map(FileId::from),
            followers: doc.ref_list("followers")?,
            following: doc.ref_list("following")?,
            created_at: doc.created_at,
        })
    }
}

/// The signed-in user as exposed by the session context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub username: String,
    pub email: String,
    pub image_url: String,
    pub bio: String,
}

// ---------------------------------------------------------------------------
// Post
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: PostId,
    pub creator: UserId,
    pub caption: String,
    pub image_id: FileId,
    pub image_url: String,
    pub location: Option<String>,
    pub tags: Vec<String>,
    pub likes: Vec<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn is_liked_by(&self, user: &UserId) -> bool {
        self.likes.contains(user)
    }
}

impl TryFrom<&Document> for Post {
    type Error = ModelError;

    fn try_from(doc: &Document) -> Result<Self, Self::Error> {
        Ok(Self {
            id: doc.id.as_str().into(),
            creator: doc.ref_attr("creator")?,
            caption: doc.opt_str_attr("caption")?.unwrap_or_default().to_string(),
            image_id: doc.str_attr("imageId")?.into(),
            image_url: doc.str_attr("imageUrl")?.to_string(),
            location: doc.opt_str_attr("location")?.map(String::from),
            tags: doc.str_list("tags")?,
            likes: doc.ref_list("likes")?,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: CommentId,
    pub post: PostId,
    pub user: UserId,
    pub text: String,
    pub likes: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<&Document> for Comment {
    type Error = ModelError;

    fn try_from(doc: &Document) -> Result<Self, Self::Error> {
        Ok(Self {
            id: doc.id.as_str().into(),
            post: doc.ref_attr("post")?,
            user: doc.ref_attr("user")?,
            text: doc.str_attr("text")?.to_string(),
            likes: doc.ref_list("likes")?,
            created_at: doc.created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Saved post
// ---------------------------------------------------------------------------

/// Bookmark join record between a user and a post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SavedPost {
    pub id: SaveId,
    pub user: UserId,
    pub post: PostId,
}

impl TryFrom<&Document> for SavedPost {
    type Error = ModelError;

    fn try_from(doc: &Document) -> Result<Self, Self::Error> {
        Ok(Self {
            id: doc.id.as_str().into(),
            user: doc.ref_attr("user")?,
            post: doc.ref_attr("post")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub user_id: UserId,
    pub caption: String,
    pub file: FileUpload,
    pub location: Option<String>,
    /// Comma separated, as typed into the form.
    pub tags: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePost {
    pub post_id: PostId,
    pub caption: String,
    /// Media currently attached to the post.
    pub image_id: FileId,
    pub image_url: String,
    /// Replacement media, if the user picked a new file.
    pub file: Option<FileUpload>,
    pub location: Option<String>,
    pub tags: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateUser {
    pub user_id: UserId,
    pub name: String,
    pub username: String,
    pub bio: String,
    pub image_id: Option<FileId>,
    pub image_url: String,
    pub file: Option<FileUpload>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub post_id: PostId,
    pub user_id: UserId,
    pub text: String,
}

// ---------------------------------------------------------------------------
// Composite views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommentThread {
    pub comment: Comment,
    pub author: User,
}

/// A post with its creator and comments resolved, as shown on the detail page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostDetails {
    pub post: Post,
    pub creator: User,
    pub comments: Vec<CommentThread>,
}

/// A bookmark with the post it points at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SavedEntry {
    pub save: SavedPost,
    pub post: Post,
}

/// Split the comma separated tag input, dropping whitespace and empties.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|t| t.chars().filter(|c| !c.is_whitespace()).collect::<String>())
        .filter(|t| !t.is_empty())
        .collect()
}
