use crate::types::Gravity;

/// Application name
pub const APP_NAME: &str = "Snapgram";

/// Number of posts returned by the recent-posts feed
pub const RECENT_POSTS_LIMIT: u32 = 20;

/// Page size of the infinite explore feed
pub const INFINITE_POSTS_PAGE_SIZE: u32 = 9;

/// Default number of users listed by the people page
pub const USERS_DEFAULT_LIMIT: u32 = 10;

/// Preview rendering parameters for post media
pub const PREVIEW_WIDTH: u32 = 2000;
pub const PREVIEW_HEIGHT: u32 = 2000;
pub const PREVIEW_GRAVITY: Gravity = Gravity::Top;
pub const PREVIEW_QUALITY: u8 = 100;

/// Maximum upload size accepted by the storage bucket (50 MiB)
pub const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;

/// Attempts made by a version-checked relationship edit before giving up
pub const RELATIONSHIP_RETRY_LIMIT: usize = 5;

/// System attribute names on remote documents
pub const ATTR_ID: &str = "$id";
pub const ATTR_CREATED_AT: &str = "$createdAt";
pub const ATTR_UPDATED_AT: &str = "$updatedAt";

/// Relationship attribute names
pub const ATTR_LIKES: &str = "likes";
pub const ATTR_FOLLOWERS: &str = "followers";
pub const ATTR_FOLLOWING: &str = "following";
