use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::api::{ApiError, RequestGateway};
use crate::config::Config;
use crate::endpoint::{BackoffPolicy, EndpointResolver};
use crate::models::User;

use super::store::SessionStore;

/// The session at one instant. Exactly one state holds at any time;
/// transitions are published through a watch channel for the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Initializing,
    Unauthenticated,
    Authenticating,
    Authenticated(User),
    /// Credentials exist but could not be validated because the backend was
    /// unreachable; the app proceeds optimistically with the stored user.
    Degraded(User),
}

/// What to do when a restored session cannot be validated for any reason
/// other than an explicit authorization rejection. An offline backend gives
/// no evidence the token is bad, so the default keeps the credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OfflinePolicy {
    /// Keep the stored credential and enter [`SessionState::Degraded`].
    #[default]
    KeepDegraded,
    /// Clear the credential and require a fresh login.
    ForceLogin,
}

/// Top-level session state machine.
///
/// Owns the store, the resolver and the gateway; `restore`, `login`,
/// `register`, `logout` and `reset_auth` serialize on one lock so no two
/// session-mutating operations ever interleave. Ordinary CRUD traffic goes
/// through [`RequestGateway`] clones and is not serialized.
pub struct SessionController {
    store: Arc<SessionStore>,
    gateway: RequestGateway,
    state_tx: Arc<watch::Sender<SessionState>>,
    offline_policy: OfflinePolicy,
    op_lock: Mutex<()>,
}

impl SessionController {
    /// Build the full stack from configuration: shared HTTP client, endpoint
    /// resolver over the configured candidates, session store in the data
    /// directory.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let resolver = EndpointResolver::new(client.clone(), config.endpoints.clone())
            .with_probe_timeout(Duration::from_secs(config.probe_timeout_secs))
            .with_backoff(BackoffPolicy {
                attempts: config.probe_attempts,
                interval: Duration::from_secs(config.probe_interval_secs),
            });
        let store = SessionStore::new(Config::data_dir()?);
        Ok(Self::with_parts(Arc::new(store), Arc::new(resolver), client))
    }

    /// Dependency-injection constructor. Tests build independent stacks with
    /// their own store directories and resolvers through this.
    pub fn with_parts(
        store: Arc<SessionStore>,
        resolver: Arc<EndpointResolver>,
        client: Client,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Initializing);
        let state_tx = Arc::new(state_tx);
        let gateway = RequestGateway::new(client, resolver, store.clone(), state_tx.clone());
        Self {
            store,
            gateway,
            state_tx,
            offline_policy: OfflinePolicy::default(),
            op_lock: Mutex::new(()),
        }
    }

    pub fn with_offline_policy(mut self, policy: OfflinePolicy) -> Self {
        self.offline_policy = policy;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    /// Reactive session-state contract for the UI layer.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(
            self.state(),
            SessionState::Authenticated(_) | SessionState::Degraded(_)
        )
    }

    /// Hand domain screens their request entry point.
    pub fn gateway(&self) -> RequestGateway {
        self.gateway.clone()
    }

    /// Restore the persisted session at startup and validate it against the
    /// whoami endpoint. Idempotent: repeating it with no intervening login
    /// lands in the same terminal state.
    pub async fn restore(&self) -> Result<SessionState, ApiError> {
        let _guard = self.op_lock.lock().await;

        let credential = match self.store.load() {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                debug!("no stored session");
                self.transition(SessionState::Unauthenticated);
                return Ok(self.state());
            }
            Err(e) => {
                warn!(error = %e, "session store unreadable, treating as logged out");
                if let Err(e) = self.store.clear() {
                    warn!(error = %e, "failed to clear stored session");
                }
                self.transition(SessionState::Unauthenticated);
                return Ok(self.state());
            }
        };

        match self.gateway.profile().await {
            Ok(user) => {
                info!(user = %user.email, "restored session validated");
                self.transition(SessionState::Authenticated(user));
            }
            Err(ApiError::AuthExpired) => {
                // The gateway has already cleared the store; clearing again
                // is a no-op.
                info!("stored token rejected, session cleared");
                if let Err(e) = self.store.clear() {
                    warn!(error = %e, "failed to clear stored session");
                }
                self.transition(SessionState::Unauthenticated);
            }
            Err(e) => match self.offline_policy {
                OfflinePolicy::KeepDegraded => {
                    warn!(error = %e, "could not validate restored session, entering degraded mode");
                    self.transition(SessionState::Degraded(credential.user));
                }
                OfflinePolicy::ForceLogin => {
                    warn!(error = %e, "could not validate restored session, forcing login");
                    if let Err(e) = self.store.clear() {
                        warn!(error = %e, "failed to clear stored session");
                    }
                    self.transition(SessionState::Unauthenticated);
                }
            },
        }
        Ok(self.state())
    }

    /// Exchange credentials for a session. Failures surface as typed errors
    /// and leave the state machine in `Unauthenticated`.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let _guard = self.op_lock.lock().await;
        self.transition(SessionState::Authenticating);

        match self.gateway.login(email, password).await {
            Ok(credential) => {
                // A full save replaces any stale credential wholesale; there
                // is no mixed-user intermediate state to observe.
                if let Err(e) = self.store.save(&credential) {
                    warn!(error = %e, "failed to persist session, continuing in memory");
                }
                info!(user = %credential.user.email, "login succeeded");
                self.transition(SessionState::Authenticated(credential.user.clone()));
                Ok(credential.user)
            }
            Err(e) => {
                debug!(error = %e, "login failed");
                self.transition(SessionState::Unauthenticated);
                Err(e)
            }
        }
    }

    /// Create an account; same transition shape as `login`.
    pub async fn register(&self, email: &str, password: &str, name: &str) -> Result<User, ApiError> {
        let _guard = self.op_lock.lock().await;
        self.transition(SessionState::Authenticating);

        match self.gateway.register(email, password, name).await {
            Ok(credential) => {
                if let Err(e) = self.store.save(&credential) {
                    warn!(error = %e, "failed to persist session, continuing in memory");
                }
                info!(user = %credential.user.email, "registration succeeded");
                self.transition(SessionState::Authenticated(credential.user.clone()));
                Ok(credential.user)
            }
            Err(e) => {
                debug!(error = %e, "registration failed");
                self.transition(SessionState::Unauthenticated);
                Err(e)
            }
        }
    }

    /// Best-effort remote invalidation, then an unconditional local clear.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let _guard = self.op_lock.lock().await;

        if let Err(e) = self.gateway.logout().await {
            debug!(error = %e, "remote logout failed, ignoring");
        }
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to clear stored session");
        }
        info!("logged out");
        self.transition(SessionState::Unauthenticated);
        Ok(())
    }

    /// Administrative escape hatch: drop the session from any state without
    /// touching the network.
    pub async fn reset_auth(&self) -> Result<(), ApiError> {
        let _guard = self.op_lock.lock().await;

        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to clear stored session");
        }
        info!("session reset");
        self.transition(SessionState::Unauthenticated);
        Ok(())
    }

    fn transition(&self, next: SessionState) {
        self.state_tx.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            debug!(from = ?state, to = ?next, "session transition");
            *state = next;
            true
        });
    }
}
