//! Cached authentication state.
//!
//! [`AuthState`] holds the signed-in [`Identity`] (if any) and whether the
//! first session check is still running. [`AuthState::initialize`] runs at
//! most once per state, however often or concurrently it is called. After
//! a configured initialization a background task follows the backend's
//! session-change notifications for the rest of the process.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use straywatch_backend::{Backend, SessionEvent};
use straywatch_report_models::Identity;
use tokio::sync::{OnceCell, broadcast};

#[derive(Debug, Clone, PartialEq, Eq)]
struct AuthSnapshot {
    identity: Option<Identity>,
    loading: bool,
}

/// Shared handle to the auth state. Clones share the same state.
#[derive(Clone)]
pub struct AuthState {
    backend: Arc<dyn Backend>,
    inner: Arc<RwLock<AuthSnapshot>>,
    initialized: Arc<OnceCell<()>>,
}

impl AuthState {
    /// Creates a state that is loading and has no identity.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            inner: Arc::new(RwLock::new(AuthSnapshot {
                identity: None,
                loading: true,
            })),
            initialized: Arc::new(OnceCell::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, AuthSnapshot> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, AuthSnapshot> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.read().identity.clone()
    }

    /// `true` until the first session check has finished.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    /// Replaces the cached identity and ends the loading phase.
    pub fn set_identity(&self, identity: Option<Identity>) {
        let mut state = self.write();
        state.identity = identity;
        state.loading = false;
    }

    /// Resolves the current session once.
    ///
    /// Failures are logged and leave the state signed out; they are never
    /// returned. Must be called from within a tokio runtime.
    pub async fn initialize(&self) {
        self.initialized
            .get_or_init(|| async { self.resolve_session().await })
            .await;
    }

    async fn resolve_session(&self) {
        if !self.backend.is_configured() {
            log::debug!("Backend not configured, skipping session check");
            self.set_identity(None);
            return;
        }

        // Subscribe before querying so no change between the two is missed.
        let events = self.backend.subscribe();

        match self.backend.current_identity().await {
            Ok(identity) => {
                log::debug!(
                    "Session resolved: {}",
                    identity.as_ref().map_or("signed out", |i| i.email.as_str())
                );
                self.set_identity(identity);
            }
            Err(e) => {
                log::error!("Failed to get session: {e}");
                self.set_identity(None);
            }
        }

        tokio::spawn(follow_session(events, Arc::clone(&self.inner)));
    }
}

async fn follow_session(
    mut events: broadcast::Receiver<SessionEvent>,
    inner: Arc<RwLock<AuthSnapshot>>,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                log::debug!("Session changed: {event:?}");
                let mut state = inner.write().unwrap_or_else(PoisonError::into_inner);
                state.identity = event.identity().cloned();
                state.loading = false;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log::warn!("Missed {skipped} session notifications");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
