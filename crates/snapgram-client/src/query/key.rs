use std::fmt;

use serde::Serialize;

use snapgram_shared::types::{PostId, UserId};

/// The read operation a cache entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryTag {
    CurrentUser,
    Users,
    UserById,
    UserPosts,
    RecentPosts,
    InfinitePosts,
    PostById,
    PostDetails,
    SearchPosts,
    SavedPosts,
}

impl QueryTag {
    pub const ALL: [QueryTag; 10] = [
        QueryTag::CurrentUser,
        QueryTag::Users,
        QueryTag::UserById,
        QueryTag::UserPosts,
        QueryTag::RecentPosts,
        QueryTag::InfinitePosts,
        QueryTag::PostById,
        QueryTag::PostDetails,
        QueryTag::SearchPosts,
        QueryTag::SavedPosts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryTag::CurrentUser => "current-user",
            QueryTag::Users => "users",
            QueryTag::UserById => "user-by-id",
            QueryTag::UserPosts => "user-posts",
            QueryTag::RecentPosts => "recent-posts",
            QueryTag::InfinitePosts => "infinite-posts",
            QueryTag::PostById => "post-by-id",
            QueryTag::PostDetails => "post-details",
            QueryTag::SearchPosts => "search-posts",
            QueryTag::SavedPosts => "saved-posts",
        }
    }
}

impl fmt::Display for QueryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache key: the operation tag plus its parameters.
///
/// A key with fewer parameters acts as a prefix when invalidating, so
/// `QueryKey::tag(QueryTag::PostById)` covers every cached post.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QueryKey {
    tag: QueryTag,
    params: Vec<String>,
}

impl QueryKey {
    pub fn tag(tag: QueryTag) -> Self {
        Self {
            tag,
            params: Vec::new(),
        }
    }

    pub fn with_param(tag: QueryTag, param: impl Into<String>) -> Self {
        Self {
            tag,
            params: vec![param.into()],
        }
    }

    pub fn current_user() -> Self {
        Self::tag(QueryTag::CurrentUser)
    }

    pub fn users(limit: Option<u32>) -> Self {
        match limit {
            Some(limit) => Self::with_param(QueryTag::Users, limit.to_string()),
            None => Self::tag(QueryTag::Users),
        }
    }

    pub fn user_by_id(id: &UserId) -> Self {
        Self::with_param(QueryTag::UserById, id.as_str())
    }

    pub fn user_posts(id: &UserId) -> Self {
        Self::with_param(QueryTag::UserPosts, id.as_str())
    }

    pub fn recent_posts() -> Self {
        Self::tag(QueryTag::RecentPosts)
    }

    pub fn infinite_posts() -> Self {
        Self::tag(QueryTag::InfinitePosts)
    }

    pub fn post_by_id(id: &PostId) -> Self {
        Self::with_param(QueryTag::PostById, id.as_str())
    }

    pub fn post_details(id: &PostId) -> Self {
        Self::with_param(QueryTag::PostDetails, id.as_str())
    }

    pub fn search_posts(term: &str) -> Self {
        Self::with_param(QueryTag::SearchPosts, term)
    }

    pub fn saved_posts(user: &UserId) -> Self {
        Self::with_param(QueryTag::SavedPosts, user.as_str())
    }

    pub fn query_tag(&self) -> QueryTag {
        self.tag
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// A query with an empty parameter never fetches.
    pub fn is_enabled(&self) -> bool {
        self.params.iter().all(|p| !p.trim().is_empty())
    }

    /// Whether `self` is covered by `prefix` (same tag, leading params equal).
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.tag == prefix.tag && self.params.starts_with(&prefix.params)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag.as_str())?;
        for param in &self.params {
            write!(f, "/{param}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_matching() {
        let p1 = QueryKey::post_by_id(&PostId::from("p1"));
        assert!(p1.starts_with(&QueryKey::tag(QueryTag::PostById)));
        assert!(p1.starts_with(&p1));
        assert!(!p1.starts_with(&QueryKey::post_by_id(&PostId::from("p2"))));
        assert!(!p1.starts_with(&QueryKey::tag(QueryTag::PostDetails)));
    }

    #[test]
    fn empty_params_disable() {
        assert!(!QueryKey::search_posts("").is_enabled());
        assert!(!QueryKey::post_by_id(&PostId::default()).is_enabled());
        assert!(QueryKey::recent_posts().is_enabled());
    }

    #[test]
    fn display() {
        assert_eq!(
            QueryKey::user_posts(&UserId::from("u1")).to_string(),
            "user-posts/u1"
        );
        assert_eq!(QueryKey::current_user().to_string(), "current-user");
    }
}
