use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use authgate_api::{GuardMode, Navigator};
use authgate_core::{BackendCheck, GateInput, GateOutcome, RoleQuery, decide};

use crate::navigator::navigate;
use crate::query::UserQuery;

/// Guards a view behind sign-in, roles and optionally a backend check.
///
/// Clones share the mounted flag, so a clone held by the view can
/// [`unmount`](Gate::unmount) while an evaluation is in flight; the late
/// result is then dropped instead of applied.
#[derive(Clone)]
pub struct Gate {
    query: Arc<UserQuery>,
    navigator: Arc<dyn Navigator>,
    roles: RoleQuery,
    backend_check: bool,
    route: Option<String>,
    middleware: Option<String>,
    redirect_to: Option<String>,
    mode: Option<GuardMode>,
    mounted: Arc<AtomicBool>,
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate")
            .field("roles", &self.roles)
            .field("backend_check", &self.backend_check)
            .field("route", &self.route)
            .field("middleware", &self.middleware)
            .field("redirect_to", &self.redirect_to)
            .field("mode", &self.mode)
            .field("mounted", &self.is_mounted())
            .finish_non_exhaustive()
    }
}

impl Gate {
    pub fn new(query: Arc<UserQuery>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            query,
            navigator,
            roles: RoleQuery::Any,
            backend_check: false,
            route: None,
            middleware: None,
            redirect_to: None,
            mode: None,
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    #[must_use]
    pub fn roles(mut self, roles: impl Into<RoleQuery>) -> Self {
        self.roles = roles.into();
        self
    }

    /// Also ask the backend; the route defaults to the navigator's current one.
    #[must_use]
    pub fn backend_check(mut self, enabled: bool) -> Self {
        self.backend_check = enabled;
        self
    }

    #[must_use]
    pub fn route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    #[must_use]
    pub fn middleware(mut self, middleware: impl Into<String>) -> Self {
        self.middleware = Some(middleware.into());
        self
    }

    #[must_use]
    pub fn redirect_to(mut self, target: impl Into<String>) -> Self {
        self.redirect_to = Some(target.into());
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: GuardMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }

    /// Decide what the view shows. Performs no navigation.
    pub async fn evaluate(&self) -> GateOutcome {
        self.query.load().await;

        let backend = if self.backend_check {
            let allowed = self.check_backend().await;
            if !self.is_mounted() {
                return GateOutcome::Pending;
            }
            BackendCheck::from_allowed(allowed)
        } else {
            BackendCheck::NotRequested
        };

        let ctx = self.query.context();
        let session = ctx.snapshot();
        let config = ctx.config();
        decide(&GateInput {
            session: &session,
            roles: &self.roles,
            backend,
            redirect_to: self.redirect_to.as_deref(),
            redirects: &config.redirects,
            mode: self.mode.unwrap_or(config.mode),
        })
    }

    /// Evaluate and carry out a redirect if the view is blocked.
    pub async fn enforce(&self) -> GateOutcome {
        let outcome = self.evaluate().await;
        if let GateOutcome::Redirect {
            target, navigation, ..
        } = &outcome
        {
            if self.is_mounted() {
                navigate(self.navigator.as_ref(), target, *navigation);
            }
        }
        outcome
    }

    async fn check_backend(&self) -> bool {
        let route = self
            .route
            .clone()
            .unwrap_or_else(|| self.navigator.current_route());
        if route.is_empty() {
            tracing::debug!("no route to check; denying");
            return false;
        }
        self.query
            .context()
            .can_access(&route, self.middleware.as_deref())
            .await
    }
}
