use thiserror::Error;

/// A remote document could not be mapped onto a domain model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Missing attribute `{attribute}` on {collection} document")]
    MissingAttribute {
        collection: String,
        attribute: String,
    },

    #[error("Attribute `{attribute}` on {collection} document has the wrong type")]
    InvalidAttribute {
        collection: String,
        attribute: String,
    },

    #[error("Invalid document payload: {0}")]
    Payload(String),
}

/// Form input rejected before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("A file is required")]
    MissingFile,

    #[error("File too large: {size} bytes (max {max})")]
    FileTooLarge { size: usize, max: usize },

    #[error("You cannot follow yourself")]
    SelfFollow,

    #[error("{0} is required")]
    Required(&'static str),
}
