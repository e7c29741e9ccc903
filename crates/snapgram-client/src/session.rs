//! Who is signed in.
//!
//! [`SessionContext`] moves between `Unauthenticated`, `Checking` and
//! `Authenticated`. The remote account check is the only thing that makes a
//! session authenticated; the local marker in [`Database`] only decides
//! whether start-up should send the user to the sign-in view.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use snapgram_shared::models::{NewUser, UserProfile};
use snapgram_store::{Database, LocalSession, StoreError};

use crate::error::{ApiError, ApiResult};
use crate::events::{emit_event, SessionEvent};
use crate::query::{Queries, QueryKey};
use crate::remote::RemoteDataService;

const EVENT_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Checking,
    Authenticated(UserProfile),
}

/// Result of [`SessionContext::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitOutcome {
    /// No local marker was found; the sign-in view should be shown.
    pub redirect_to_sign_in: bool,
    pub authenticated: bool,
}

#[derive(Clone)]
pub struct SessionContext {
    queries: Queries,
    store: Arc<Mutex<Database>>,
    state: Arc<RwLock<SessionState>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionContext {
    pub fn new(queries: Queries, store: Arc<Mutex<Database>>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            queries,
            store,
            state: Arc::new(RwLock::new(SessionState::Unauthenticated)),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn user(&self) -> Option<UserProfile> {
        match &*self.state.read().await {
            SessionState::Authenticated(profile) => Some(profile.clone()),
            _ => None,
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        matches!(*self.state.read().await, SessionState::Authenticated(_))
    }

    pub async fn is_loading(&self) -> bool {
        matches!(*self.state.read().await, SessionState::Checking)
    }

    /// Start-up: resume the stored credential if there is one, otherwise
    /// ask for a redirect. The account check runs either way.
    pub async fn init(&self) -> ApiResult<InitOutcome> {
        let marker = match self.with_store(|db| db.load_session_marker())? {
            Some(marker) if marker.is_expired(Utc::now()) => {
                info!(account_id = %marker.account_id, "Local session expired");
                self.with_store(|db| db.clear_session_marker())?;
                None
            }
            other => other,
        };

        let redirect_to_sign_in = match marker {
            Some(marker) => {
                debug!(session_id = %marker.session_id, "Resuming local session");
                self.remote().restore_session_secret(marker.fallback_cookies);
                false
            }
            None => {
                emit_event(&self.events, SessionEvent::RedirectToSignIn);
                true
            }
        };

        let authenticated = self.check_auth_user().await;
        Ok(InitOutcome {
            redirect_to_sign_in,
            authenticated,
        })
    }

    /// Ask the service who is signed in. Any failure leaves the context
    /// unauthenticated. Safe to call repeatedly.
    pub async fn check_auth_user(&self) -> bool {
        self.set_state(SessionState::Checking).await;

        let api = self.queries.api();
        let state = self
            .queries
            .cache()
            .refetch(QueryKey::current_user(), || api.get_current_user())
            .await;

        let user = if state.is_success() { state.data } else { None };
        match user {
            Some(user) => {
                self.set_state(SessionState::Authenticated(user.profile()))
                    .await;
                emit_event(
                    &self.events,
                    SessionEvent::Authenticated {
                        user_id: user.id.clone(),
                    },
                );
                true
            }
            None => {
                if let Some(e) = &state.error {
                    debug!(error = %e, "Auth check failed");
                }
                self.become_unauthenticated().await;
                false
            }
        }
    }

    /// Create the account, then sign in with the same credentials.
    pub async fn sign_up(&self, user: NewUser) -> ApiResult<UserProfile> {
        let email = user.email.clone();
        let password = user.password.clone();
        self.queries.create_user_account(user).await?;
        self.sign_in(&email, &password).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ApiResult<UserProfile> {
        let session = self.queries.sign_in_account(email, password).await?;

        let marker = LocalSession::from_session(&session, self.remote().session_secret());
        self.with_store(|db| db.save_session_marker(&marker))?;

        if self.check_auth_user().await {
            self.require_user().await
        } else {
            warn!(account_id = %session.account_id, "Signed in but no profile found");
            self.with_store(|db| db.clear_session_marker())?;
            Err(ApiError::Unauthenticated)
        }
    }

    /// Delete the remote session, the local marker and every cached read.
    pub async fn sign_out(&self) -> ApiResult<()> {
        self.queries.sign_out_account().await?;
        self.with_store(|db| db.clear_session_marker())?;
        self.queries.cache().clear().await;
        self.become_unauthenticated().await;
        Ok(())
    }

    /// Drop in-memory session state. The local marker is kept so the next
    /// [`Self::init`] resumes the session.
    pub async fn teardown(&self) {
        self.remote().restore_session_secret(None);
        self.queries.cache().clear().await;
        self.become_unauthenticated().await;
        debug!("Session context torn down");
    }

    /// Route guard for pages that need a signed-in user.
    pub async fn require_user(&self) -> ApiResult<UserProfile> {
        self.user().await.ok_or(ApiError::Unauthenticated)
    }

    fn remote(&self) -> &Arc<dyn RemoteDataService> {
        self.queries.api().remote()
    }

    async fn set_state(&self, state: SessionState) {
        *self.state.write().await = state;
    }

    async fn become_unauthenticated(&self) {
        self.set_state(SessionState::Unauthenticated).await;
        emit_event(&self.events, SessionEvent::Unauthenticated);
    }

    fn with_store<T>(
        &self,
        f: impl FnOnce(&Database) -> Result<T, StoreError>,
    ) -> ApiResult<T> {
        let db = self
            .store
            .lock()
            .map_err(|e| ApiError::Store(format!("Lock poisoned: {e}")))?;
        Ok(f(&*db)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{api, new_user};
    use crate::query::QueryClient;
    use crate::remote::memory::Operation;
    use crate::remote::MemoryRemote;
    use snapgram_shared::types::AccountId;

    fn context(remote: Arc<MemoryRemote>, store: Arc<Mutex<Database>>) -> SessionContext {
        let api = crate::api::Api::new(remote, Default::default());
        SessionContext::new(Queries::new(api, QueryClient::new()), store)
    }

    fn store() -> Arc<Mutex<Database>> {
        Arc::new(Mutex::new(Database::open_in_memory().unwrap()))
    }

    #[tokio::test]
    async fn init_without_marker_redirects_and_still_checks() {
        let (_, remote) = api();
        let ctx = context(remote.clone(), store());
        let mut events = ctx.subscribe();

        let outcome = ctx.init().await.unwrap();
        assert!(outcome.redirect_to_sign_in);
        assert!(!outcome.authenticated);
        assert_eq!(remote.calls_to(Operation::GetAccount).len(), 1);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::RedirectToSignIn);
        assert_eq!(ctx.state().await, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn sign_up_authenticates() {
        let (_, remote) = api();
        let ctx = context(remote, store());

        let profile = ctx.sign_up(new_user("Ann", "ann1")).await.unwrap();
        assert_eq!(profile.username, "ann1");
        assert_eq!(profile.email, "ann1@x.com");
        assert!(ctx.is_authenticated().await);
        assert_eq!(ctx.require_user().await.unwrap(), profile);
    }

    #[tokio::test]
    async fn sign_in_without_profile_leaves_no_marker() {
        let (_, remote) = api();
        let db = store();
        let ctx = context(remote.clone(), db.clone());
        // an account with no profile document behind it
        remote
            .create_account(&AccountId::unique(), "ann@x.com", "secret1", "Ann")
            .await
            .unwrap();

        let err = ctx.sign_in("ann@x.com", "secret1").await.unwrap_err();
        assert_eq!(err, ApiError::Unauthenticated);
        assert!(db.lock().unwrap().load_session_marker().unwrap().is_none());

        let outcome = ctx.init().await.unwrap();
        assert!(outcome.redirect_to_sign_in);
    }

    #[tokio::test]
    async fn recheck_is_idempotent() {
        let (_, remote) = api();
        let ctx = context(remote, store());
        ctx.sign_up(new_user("Ann", "ann1")).await.unwrap();

        let first = ctx.check_auth_user().await;
        let state_after_first = ctx.state().await;
        let second = ctx.check_auth_user().await;
        assert_eq!(first, second);
        assert_eq!(ctx.state().await, state_after_first);
    }

    #[tokio::test]
    async fn marker_resumes_after_teardown() {
        let (_, remote) = api();
        let db = store();
        let ctx = context(remote.clone(), db.clone());
        ctx.sign_up(new_user("Ann", "ann1")).await.unwrap();
        ctx.teardown().await;
        assert!(!ctx.is_authenticated().await);

        let restarted = context(remote, db);
        let outcome = restarted.init().await.unwrap();
        assert!(!outcome.redirect_to_sign_in);
        assert!(outcome.authenticated);
        assert_eq!(restarted.user().await.unwrap().username, "ann1");
    }

    #[tokio::test]
    async fn sign_out_clears_marker_and_cache() {
        let (_, remote) = api();
        let db = store();
        let ctx = context(remote, db.clone());
        ctx.sign_up(new_user("Ann", "ann1")).await.unwrap();

        ctx.sign_out().await.unwrap();
        assert!(db.lock().unwrap().load_session_marker().unwrap().is_none());
        assert!(ctx.queries.cache().keys().await.is_empty());
        assert!(matches!(ctx.require_user().await, Err(ApiError::Unauthenticated)));
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let (_, remote) = api();
        let db = store();
        let ctx = context(remote, db.clone());
        ctx.sign_up(new_user("Ann", "ann1")).await.unwrap();
        ctx.sign_out().await.unwrap();

        let err = ctx.sign_in("ann1@x.com", "wrong-pass").await.unwrap_err();
        assert!(err.is_unauthenticated());
        assert!(db.lock().unwrap().load_session_marker().unwrap().is_none());
    }
}
