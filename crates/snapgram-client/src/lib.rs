//! # snapgram-client
//!
//! Client data layer of Snapgram: the remote data service seam, the API
//! adapter, the query cache, the session context and the view-level state
//! helpers built on them.

pub mod api;
pub mod error;
pub mod events;
pub mod query;
pub mod remote;
pub mod session;
pub mod state;
pub mod views;

use tracing_subscriber::{fmt, EnvFilter};

pub use api::Api;
pub use error::{ApiError, ApiResult, RemoteError};
pub use query::{Queries, QueryClient, QueryKey};
pub use remote::{HttpRemote, MemoryRemote, RemoteDataService};
pub use session::{SessionContext, SessionState};
pub use state::AppContext;

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default
/// filter. Calling it twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("snapgram_client=debug,snapgram_store=info,warn"));

    let result = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();

    if result.is_ok() {
        tracing::info!("Starting {} client", snapgram_shared::constants::APP_NAME);
    }
}
