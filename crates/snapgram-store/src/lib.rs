//! # snapgram-store
//!
//! On-device storage for the Snapgram client, backed by SQLite.
//!
//! Everything authoritative lives in the remote service; the local database
//! only keeps what must survive a restart before the service is reachable,
//! namely the session marker.

pub mod database;
pub mod migrations;
pub mod models;
pub mod session;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
