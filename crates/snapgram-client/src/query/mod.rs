//! Query/cache layer between the adapter and the views.

pub mod client;
pub mod deps;
pub mod hooks;
pub mod infinite;
pub mod key;

pub use client::{QueryClient, QueryState, QueryStatus};
pub use deps::{Mutation, Resource};
pub use hooks::Queries;
pub use infinite::{InfiniteData, PageCursor};
pub use key::{QueryKey, QueryTag};
