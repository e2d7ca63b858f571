use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use authgate_api::{GuardError, User};
use authgate_runtime::GuardContext;

/// How long a fetched user is served from cache.
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// What a view sees of the current-user query.
#[derive(Debug, Clone, Default)]
pub struct QueryState {
    pub user: Option<User>,
    pub is_loading: bool,
    pub error: Option<GuardError>,
    pub is_authenticated: bool,
}

/// Cached "who is signed in" query over a guard client.
///
/// The cache only decides whether `load` may skip a fetch; the user itself
/// is always read from the client's session, so logins and logouts made
/// elsewhere show up immediately. Failures are never retried; a failed fetch
/// counts as fresh like any other result.
#[derive(Debug)]
pub struct UserQuery {
    ctx: GuardContext,
    stale_time: Duration,
    fetched_at: Mutex<Option<Instant>>,
}

impl UserQuery {
    pub fn new(ctx: GuardContext) -> Self {
        Self {
            ctx,
            stale_time: DEFAULT_STALE_TIME,
            fetched_at: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn context(&self) -> &GuardContext {
        &self.ctx
    }

    /// Serve a fresh cached result, or fetch.
    pub async fn load(&self) -> QueryState {
        if self.is_fresh() {
            return self.state();
        }
        self.refetch().await
    }

    /// Fetch regardless of cache age.
    pub async fn refetch(&self) -> QueryState {
        self.ctx.fetch_user().await;
        *self.fetched_at.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        self.state()
    }

    pub fn invalidate(&self) {
        *self.fetched_at.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_fresh(&self) -> bool {
        self.fetched_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some_and(|at| at.elapsed() < self.stale_time)
    }

    /// Current view without fetching. `is_loading` is true until the first
    /// fetch has finished.
    pub fn state(&self) -> QueryState {
        let session = self.ctx.snapshot();
        let never_fetched = self
            .fetched_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none();
        QueryState {
            is_authenticated: session.is_authenticated(),
            user: session.user,
            is_loading: session.is_loading || never_fetched,
            error: session.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use authgate_api::{GuardConfig, LOGOUT_PATH, Method, TransportResponse, USER_PATH};
    use authgate_connectors::RecordingTransport;
    use authgate_runtime::GuardClient;
    use serde_json::json;

    fn query_over(transport: &Arc<RecordingTransport>) -> UserQuery {
        let client = GuardClient::new(GuardConfig::with_base_url("/api"), transport.clone()).unwrap();
        UserQuery::new(GuardContext::new(client))
    }

    #[tokio::test]
    async fn fresh_result_is_served_from_cache() {
        let transport = Arc::new(RecordingTransport::new());
        transport.ok(Method::Get, USER_PATH, json!({"id": 1}));
        let query = query_over(&transport);

        assert!(query.state().is_loading);
        let first = query.load().await;
        let second = query.load().await;

        assert!(first.is_authenticated && second.is_authenticated);
        assert!(!second.is_loading);
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn refetch_and_invalidate_hit_the_backend() {
        let transport = Arc::new(RecordingTransport::new());
        transport
            .ok(Method::Get, USER_PATH, json!({"id": 1}))
            .respond(Method::Get, USER_PATH, TransportResponse::empty(401));
        let query = query_over(&transport);

        assert!(query.load().await.is_authenticated);
        let after = query.refetch().await;
        assert!(!after.is_authenticated);
        assert_eq!(after.error.and_then(|e| e.status()), Some(401));

        query.invalidate();
        assert!(!query.is_fresh());
        query.load().await;
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test]
    async fn zero_stale_time_always_fetches() {
        let transport = Arc::new(RecordingTransport::new());
        transport.ok(Method::Get, USER_PATH, json!({"id": 1}));
        let query = query_over(&transport).with_stale_time(Duration::ZERO);

        query.load().await;
        query.load().await;
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn logout_is_visible_without_refetch() {
        let transport = Arc::new(RecordingTransport::new());
        transport
            .ok(Method::Get, USER_PATH, json!({"id": 1}))
            .respond(Method::Post, LOGOUT_PATH, TransportResponse::empty(204));
        let query = query_over(&transport);

        assert!(query.load().await.is_authenticated);
        query.context().logout().await.unwrap();

        let after = query.load().await;
        assert!(query.is_fresh());
        assert!(!after.is_authenticated);
        assert!(after.user.is_none());
        assert_eq!(after.is_authenticated, query.context().is_authenticated());
        assert_eq!(transport.calls().len(), 2);
    }
}
