//! Application context shared by every view.
//!
//! [`AppContext`] owns the adapter, the query cache and the session context.
//! It is cheap to clone and replaces any process-wide globals: views receive
//! it explicitly and the host calls [`AppContext::init`] and
//! [`AppContext::teardown`] around the app's lifetime.

use std::sync::{Arc, Mutex};

use snapgram_shared::ServiceConfig;
use snapgram_store::Database;

use crate::api::Api;
use crate::error::ApiResult;
use crate::query::{Queries, QueryClient};
use crate::remote::{HttpRemote, RemoteDataService};
use crate::session::{InitOutcome, SessionContext};

#[derive(Clone)]
pub struct AppContext {
    queries: Queries,
    session: SessionContext,
}

impl AppContext {
    pub fn new(
        remote: Arc<dyn RemoteDataService>,
        config: ServiceConfig,
        database: Database,
    ) -> Self {
        let api = Api::new(remote, config);
        let queries = Queries::new(api, QueryClient::new());
        let session = SessionContext::new(queries.clone(), Arc::new(Mutex::new(database)));
        Self { queries, session }
    }

    /// Talk to the hosted service over HTTP and keep local state in the
    /// default on-device database.
    pub fn connect(config: ServiceConfig) -> ApiResult<Self> {
        let remote = Arc::new(HttpRemote::new(&config));
        let database = Database::new()?;
        Ok(Self::new(remote, config, database))
    }

    /// [`Self::connect`] with configuration read from the environment.
    pub fn from_env() -> ApiResult<Self> {
        Self::connect(ServiceConfig::from_env())
    }

    pub fn api(&self) -> &Api {
        self.queries.api()
    }

    pub fn config(&self) -> &ServiceConfig {
        self.queries.api().config()
    }

    pub fn queries(&self) -> &Queries {
        &self.queries
    }

    pub fn cache(&self) -> &QueryClient {
        self.queries.cache()
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub async fn init(&self) -> ApiResult<InitOutcome> {
        self.session.init().await
    }

    pub async fn teardown(&self) {
        self.session.teardown().await;
    }
}
