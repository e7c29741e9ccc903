use serde::Serialize;
use tracing::warn;

use crate::error::ApiError;

pub const SIGN_UP_FAILED: &str = "Sign up failed. Please try again.";
pub const SIGN_IN_FAILED: &str = "Sign in failed. Please try again.";
pub const POST_CREATE_FAILED: &str = "Post not created. Please try again.";
pub const POST_UPDATE_FAILED: &str = "Post not updated. Please try again.";
pub const POST_DELETE_FAILED: &str = "Post not deleted. Please try again.";
pub const PROFILE_UPDATE_FAILED: &str = "Profile update failed. Please try again.";
pub const ACTION_FAILED: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    Default,
    Destructive,
}

/// Transient notification shown by the view layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub title: String,
    pub description: Option<String>,
    pub variant: ToastVariant,
}

impl Toast {
    /// Generic failure toast. The error itself is only logged.
    pub fn failure(title: &str, error: &ApiError) -> Self {
        warn!(%error, toast = title, "Action failed");
        Self {
            title: title.to_string(),
            description: None,
            variant: ToastVariant::Destructive,
        }
    }
}
