use std::sync::Arc;

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::auth::store::SessionStore;
use crate::auth::SessionState;
use crate::endpoint::EndpointResolver;
use crate::models::{AuthResponse, Credential, ProfileResponse, User};

use super::ApiError;

/// Issues every HTTP call the app makes against the resolved endpoint.
///
/// The credential is read from the store fresh on each call - never cached
/// in the gateway - so a logout concurrent with an in-flight call cannot
/// leave a later call dispatched under a header the session no longer owns.
///
/// Clone is cheap: reqwest::Client pools connections behind an Arc, and the
/// resolver, store and state channel are shared.
#[derive(Clone)]
pub struct RequestGateway {
    client: Client,
    resolver: Arc<EndpointResolver>,
    store: Arc<SessionStore>,
    state_tx: Arc<watch::Sender<SessionState>>,
}

impl RequestGateway {
    pub fn new(
        client: Client,
        resolver: Arc<EndpointResolver>,
        store: Arc<SessionStore>,
        state_tx: Arc<watch::Sender<SessionState>>,
    ) -> Self {
        Self {
            client,
            resolver,
            store,
            state_tx,
        }
    }

    /// Generic entry point for domain screens: decoded JSON on success, one
    /// of the typed [`ApiError`] variants otherwise.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, ApiError> {
        self.dispatch(method, path, body, true).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, ApiError> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, ApiError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::DELETE, path, None).await
    }

    /// Exchange credentials for a session. No bearer header is attached even
    /// if a stale credential is still stored.
    pub async fn login(&self, email: &str, password: &str) -> Result<Credential, ApiError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let response: AuthResponse = self
            .dispatch(Method::POST, "/auth/login", Some(&body), false)
            .await?;
        Ok(Credential {
            token: response.token,
            user: response.user,
        })
    }

    /// Create an account and receive a session in one step.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Credential, ApiError> {
        let body = serde_json::json!({ "email": email, "password": password, "name": name });
        let response: AuthResponse = self
            .dispatch(Method::POST, "/auth/register", Some(&body), false)
            .await?;
        Ok(Credential {
            token: response.token,
            user: response.user,
        })
    }

    /// Remote session invalidation. Callers treat failure as best-effort.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let _: Value = self.dispatch(Method::POST, "/auth/logout", None, true).await?;
        Ok(())
    }

    /// Lightweight whoami used to validate a restored token.
    pub async fn profile(&self) -> Result<User, ApiError> {
        let response: ProfileResponse = self.get("/api/profile").await?;
        Ok(response.user)
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        with_auth: bool,
    ) -> Result<T, ApiError> {
        let endpoint = self.resolver.resolve().await;
        let url = format!("{}{}", endpoint.base_url.trim_end_matches('/'), path);

        let mut request = self.client.request(method, &url);
        if with_auth {
            match self.store.load() {
                Ok(Some(credential)) => request = request.bearer_auth(credential.token),
                Ok(None) => {}
                Err(e) => {
                    // Unreadable store counts as "no credential"; the server
                    // will answer 401 if the call actually needed one.
                    warn!(error = %e, "credential read failed, sending unauthenticated");
                }
            }
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!(url = %url, error = %e, "transport failure");
            ApiError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|e| {
                warn!(url = %url, error = %e, "failed to decode response body");
                ApiError::Server {
                    status: status.as_u16(),
                    message: "invalid response body".to_string(),
                }
            });
        }

        let body_text = response.text().await.unwrap_or_default();
        // Only a rejection of an attached session token expires the session;
        // a 401 on the credential-submission endpoints is a failed attempt
        // and must not disturb whatever session is stored.
        let err = if with_auth {
            ApiError::from_protected_status(status, &body_text)
        } else {
            ApiError::from_status(status, &body_text)
        };
        debug!(url = %url, status = status.as_u16(), "request failed: {err}");
        if matches!(err, ApiError::AuthExpired) {
            self.expire_session();
        }
        Err(err)
    }

    /// Side effect of an observed 401/403: drop the stored credential and
    /// publish `Unauthenticated`. Idempotent, so N concurrent rejections
    /// produce one observable transition and no duplicate clear failure.
    fn expire_session(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to clear stored session");
        }
        let transitioned = self.state_tx.send_if_modified(|state| {
            if matches!(state, SessionState::Unauthenticated) {
                return false;
            }
            *state = SessionState::Unauthenticated;
            true
        });
        if transitioned {
            warn!("authorization rejected, session invalidated");
        }
    }
}
