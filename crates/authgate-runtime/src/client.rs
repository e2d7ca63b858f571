use std::sync::Arc;

use authgate_api::{
    CAN_ACCESS_PATH, CSRF_COOKIE_PATH, Credentials, GuardConfig, GuardError, LOGIN_PATH,
    LOGOUT_PATH, SessionState, Transport, TransportFactory, TransportRequest, TransportResponse,
    USER_PATH, User,
};
use authgate_connectors::DefaultTransportFactory;
use authgate_core::{RoleQuery, has_role, validate_config};
use serde_json::Value;
use tokio::sync::watch;

/// Source of truth for the current user and route access.
///
/// Reads (`fetch_user`, `can_access`) absorb failures into session state or
/// `false`; writes (`login`, `logout`) return them to the caller. The
/// `try_*` variants expose the typed result of the reads.
pub struct GuardClient {
    config: GuardConfig,
    transport: Arc<dyn Transport>,
    state: watch::Sender<SessionState>,
}

impl std::fmt::Debug for GuardClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardClient")
            .field("config", &self.config)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl GuardClient {
    pub fn new(config: GuardConfig, transport: Arc<dyn Transport>) -> Result<Self, GuardError> {
        validate_config(&config)?;
        let (state, _) = watch::channel(SessionState::default());
        Ok(Self {
            config,
            transport,
            state,
        })
    }

    /// Build a client over the default HTTP transport.
    pub fn from_config(config: GuardConfig) -> Result<Self, GuardError> {
        Self::from_config_with_factory(config, &DefaultTransportFactory)
    }

    pub fn from_config_with_factory(
        config: GuardConfig,
        factory: &dyn TransportFactory,
    ) -> Result<Self, GuardError> {
        validate_config(&config)?;
        let transport = factory.build(&config)?;
        Self::new(config, transport)
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn last_error(&self) -> Option<GuardError> {
        self.state.borrow().error.clone()
    }

    /// Receiver that observes every session state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn has_role(&self, roles: impl Into<RoleQuery>) -> bool {
        has_role(self.state.borrow().user.as_ref(), &roles.into())
    }

    /// Fetch the current user, recording failures in session state.
    ///
    /// Returns `None` on any failure.
    pub async fn fetch_user(&self) -> Option<User> {
        self.try_fetch_user().await.ok()
    }

    pub async fn try_fetch_user(&self) -> Result<User, GuardError> {
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });

        let result = match self.send(TransportRequest::get(USER_PATH)).await {
            Ok(resp) => User::from_value(resp.data),
            Err(e) => Err(e),
        };

        match &result {
            Ok(user) => {
                tracing::debug!(user_id = ?user.id(), "current user loaded");
                self.state.send_modify(|s| {
                    s.user = Some(user.clone());
                    s.is_loading = false;
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load current user");
                self.state.send_modify(|s| {
                    s.user = None;
                    s.error = Some(e.clone());
                    s.is_loading = false;
                });
            }
        }
        result
    }

    /// CSRF bootstrap, credential submission, then a user refresh.
    pub async fn login(&self, credentials: &Credentials) -> Result<TransportResponse, GuardError> {
        self.send(TransportRequest::get(CSRF_COOKIE_PATH)).await?;

        let body = serde_json::to_value(credentials)?;
        let resp = self.send(TransportRequest::post(LOGIN_PATH, body)).await?;
        tracing::debug!(status = resp.status, "login accepted");

        self.fetch_user().await;
        Ok(resp)
    }

    /// Log out remotely, then forget the stored user.
    pub async fn logout(&self) -> Result<TransportResponse, GuardError> {
        let resp = self
            .send(TransportRequest::post(LOGOUT_PATH, Value::Object(serde_json::Map::new())))
            .await?;
        self.state.send_modify(|s| s.user = None);
        tracing::debug!("logged out");
        Ok(resp)
    }

    /// Ask the backend whether `route` is reachable. Fails closed.
    pub async fn can_access(&self, route: &str, middleware: Option<&str>) -> bool {
        match self.try_can_access(route, middleware).await {
            Ok(allowed) => allowed,
            Err(e) => {
                tracing::warn!(route, error = %e, "access check failed; denying");
                false
            }
        }
    }

    pub async fn try_can_access(
        &self,
        route: &str,
        middleware: Option<&str>,
    ) -> Result<bool, GuardError> {
        let mut request = TransportRequest::get(CAN_ACCESS_PATH).query("route", route);
        if let Some(mw) = middleware.filter(|m| !m.is_empty()) {
            request = request.query("middleware", mw);
        }

        let resp = self.send(request).await?;
        resp.data
            .get("allowed")
            .and_then(Value::as_bool)
            .ok_or_else(|| GuardError::Decode("access check response has no boolean `allowed`".to_string()))
    }

    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, GuardError> {
        self.transport.send(request).await?.error_for_status()
    }
}
