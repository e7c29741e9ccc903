//! Form validation run before any mutation is dispatched.

use crate::constants::MAX_FILE_SIZE;
use crate::error::ValidationError;
use crate::models::{FileUpload, NewComment, NewPost, NewUser, UpdatePost, UpdateUser};

pub const NAME_MIN: usize = 2;
pub const USERNAME_MIN: usize = 2;
pub const PASSWORD_MIN: usize = 6;
pub const CAPTION_MAX: usize = 2200;
pub const LOCATION_MAX: usize = 100;
pub const BIO_MAX: usize = 2200;
pub const COMMENT_MAX: usize = 2200;

pub fn validate_new_user(user: &NewUser) -> Result<(), ValidationError> {
    min_len("name", &user.name, NAME_MIN)?;
    min_len("username", &user.username, USERNAME_MIN)?;
    validate_email(&user.email)?;
    min_len("password", &user.password, PASSWORD_MIN)
}

pub fn validate_sign_in(email: &str, password: &str) -> Result<(), ValidationError> {
    validate_email(email)?;
    min_len("password", password, PASSWORD_MIN)
}

pub fn validate_new_post(post: &NewPost) -> Result<(), ValidationError> {
    max_len("caption", &post.caption, CAPTION_MAX)?;
    validate_location(post.location.as_deref())?;
    validate_file(&post.file)
}

pub fn validate_update_post(post: &UpdatePost) -> Result<(), ValidationError> {
    if post.post_id.is_empty() {
        return Err(ValidationError::Required("post id"));
    }
    max_len("caption", &post.caption, CAPTION_MAX)?;
    validate_location(post.location.as_deref())?;
    match &post.file {
        Some(file) => validate_file(file),
        None => Ok(()),
    }
}

pub fn validate_update_user(user: &UpdateUser) -> Result<(), ValidationError> {
    min_len("name", &user.name, NAME_MIN)?;
    min_len("username", &user.username, USERNAME_MIN)?;
    max_len("bio", &user.bio, BIO_MAX)?;
    match &user.file {
        Some(file) => validate_file(file),
        None => Ok(()),
    }
}

pub fn validate_comment(comment: &NewComment) -> Result<(), ValidationError> {
    if comment.text.trim().is_empty() {
        return Err(ValidationError::Required("comment"));
    }
    max_len("comment", &comment.text, COMMENT_MAX)
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::InvalidEmail);
    };
    if local.is_empty()
        || domain.is_empty()
        || domain.starts_with('.')
        || domain.ends_with('.')
        || !domain.contains('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

fn validate_location(location: Option<&str>) -> Result<(), ValidationError> {
    match location {
        Some(l) => max_len("location", l, LOCATION_MAX),
        None => Ok(()),
    }
}

fn validate_file(file: &FileUpload) -> Result<(), ValidationError> {
    if file.data.is_empty() {
        return Err(ValidationError::MissingFile);
    }
    if file.data.len() > MAX_FILE_SIZE {
        return Err(ValidationError::FileTooLarge {
            size: file.data.len(),
            max: MAX_FILE_SIZE,
        });
    }
    Ok(())
}

fn min_len(field: &'static str, value: &str, min: usize) -> Result<(), ValidationError> {
    if value.trim().chars().count() < min {
        return Err(ValidationError::TooShort { field, min });
    }
    Ok(())
}

fn max_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}
