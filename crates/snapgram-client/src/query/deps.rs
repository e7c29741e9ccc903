//! Dependency table between mutations and cached reads.
//!
//! Every mutation declares the remote collections it writes and the query
//! tags it invalidates on success. Every query tag declares the collections
//! its data is built from. The tests check that a mutation invalidates every
//! tag reading a collection it writes.

use super::key::QueryTag;

/// Remote data a read depends on or a mutation changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// Accounts and sessions.
    Account,
    Users,
    Posts,
    Saves,
    Comments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutation {
    CreateUserAccount,
    SignInAccount,
    SignOutAccount,
    CreatePost,
    UpdatePost,
    DeletePost,
    SetPostLikes,
    LikePost,
    UnlikePost,
    SavePost,
    DeleteSavedPost,
    UpdateUser,
    FollowUser,
    UnfollowUser,
    AddComment,
    DeleteComment,
    SetCommentLikes,
    LikeComment,
    UnlikeComment,
}

use Mutation::*;
use QueryTag::*;

const POST_READS: &[QueryTag] = &[
    CurrentUser,
    RecentPosts,
    InfinitePosts,
    PostById,
    PostDetails,
    UserPosts,
    SearchPosts,
    SavedPosts,
];

impl QueryTag {
    pub fn reads(&self) -> &'static [Resource] {
        match self {
            // The signed-in user's view carries its liked and saved posts.
            CurrentUser => &[
                Resource::Account,
                Resource::Users,
                Resource::Posts,
                Resource::Saves,
            ],
            Users | UserById => &[Resource::Users],
            UserPosts | RecentPosts | InfinitePosts | PostById | SearchPosts => &[Resource::Posts],
            PostDetails => &[Resource::Posts, Resource::Users, Resource::Comments],
            SavedPosts => &[Resource::Saves, Resource::Posts],
        }
    }
}

impl Mutation {
    pub const ALL: [Mutation; 19] = [
        CreateUserAccount,
        SignInAccount,
        SignOutAccount,
        CreatePost,
        UpdatePost,
        DeletePost,
        SetPostLikes,
        LikePost,
        UnlikePost,
        SavePost,
        DeleteSavedPost,
        UpdateUser,
        FollowUser,
        UnfollowUser,
        AddComment,
        DeleteComment,
        SetCommentLikes,
        LikeComment,
        UnlikeComment,
    ];

    pub fn writes(&self) -> &'static [Resource] {
        match self {
            CreateUserAccount => &[Resource::Account, Resource::Users],
            SignInAccount | SignOutAccount => &[Resource::Account],
            CreatePost | UpdatePost | DeletePost | SetPostLikes | LikePost | UnlikePost => {
                &[Resource::Posts]
            }
            SavePost | DeleteSavedPost => &[Resource::Saves],
            UpdateUser | FollowUser | UnfollowUser => &[Resource::Users],
            AddComment | DeleteComment | SetCommentLikes | LikeComment | UnlikeComment => {
                &[Resource::Comments]
            }
        }
    }

    /// Tags marked stale once the mutation succeeds.
    pub fn invalidates(&self) -> &'static [QueryTag] {
        match self {
            CreateUserAccount => &[CurrentUser, Users, UserById, PostDetails],
            SignInAccount | SignOutAccount => &[CurrentUser],
            CreatePost | UpdatePost | DeletePost | SetPostLikes | LikePost | UnlikePost => {
                POST_READS
            }
            SavePost | DeleteSavedPost => &[CurrentUser, SavedPosts],
            UpdateUser | FollowUser | UnfollowUser => {
                &[CurrentUser, Users, UserById, PostDetails]
            }
            AddComment | DeleteComment | SetCommentLikes | LikeComment | UnlikeComment => {
                &[PostDetails]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlaps(a: &[Resource], b: &[Resource]) -> bool {
        a.iter().any(|r| b.contains(r))
    }

    #[test]
    fn every_affected_read_is_invalidated() {
        for mutation in Mutation::ALL {
            for tag in QueryTag::ALL {
                if overlaps(tag.reads(), mutation.writes()) {
                    assert!(
                        mutation.invalidates().contains(&tag),
                        "{mutation:?} writes data read by {tag} but does not invalidate it"
                    );
                }
            }
        }
    }

    #[test]
    fn no_spurious_invalidations() {
        for mutation in Mutation::ALL {
            for tag in mutation.invalidates() {
                assert!(
                    overlaps(tag.reads(), mutation.writes()),
                    "{mutation:?} invalidates {tag} which reads nothing it writes"
                );
            }
        }
    }

    #[test]
    fn likes_and_saves_refresh_current_user() {
        for mutation in [LikePost, UnlikePost, SetPostLikes, SavePost, DeleteSavedPost] {
            assert!(mutation.invalidates().contains(&CurrentUser), "{mutation:?}");
        }
    }

    #[test]
    fn every_tag_is_reachable() {
        for tag in QueryTag::ALL {
            assert!(
                Mutation::ALL.iter().any(|m| m.invalidates().contains(&tag)),
                "{tag} is never invalidated"
            );
        }
    }
}
