//! # snapgram-shared
//!
//! Types shared by every Snapgram crate: identifiers, remote documents and
//! the domain models decoded from them, service configuration and form
//! validation.

pub mod config;
pub mod constants;
pub mod document;
pub mod error;
pub mod models;
pub mod types;
pub mod validation;

pub use config::ServiceConfig;
pub use document::{Document, DocumentList, Fields};
pub use error::{ModelError, ValidationError};
