//! Login and logout as UI actions with callbacks and a post-success redirect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use authgate_api::{Credentials, GuardError, Navigator, TransportResponse};
use authgate_runtime::GuardContext;

use crate::navigator::navigate_for_mode;

type SuccessHook = Box<dyn Fn(&TransportResponse) + Send + Sync>;
type ErrorHook = Box<dyn Fn(&GuardError) + Send + Sync>;

/// Callbacks and redirect shared by both actions.
#[derive(Default)]
pub struct ActionOptions {
    on_success: Option<SuccessHook>,
    on_error: Option<ErrorHook>,
    redirect_to: Option<String>,
}

impl std::fmt::Debug for ActionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionOptions")
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("redirect_to", &self.redirect_to)
            .finish()
    }
}

impl ActionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_success(mut self, hook: impl Fn(&TransportResponse) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn on_error(mut self, hook: impl Fn(&GuardError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn redirect_to(mut self, target: impl Into<String>) -> Self {
        self.redirect_to = Some(target.into());
        self
    }
}

// Loading flag, last error and the completion handling both actions share.
struct Tracker {
    ctx: GuardContext,
    navigator: Arc<dyn Navigator>,
    options: ActionOptions,
    loading: AtomicBool,
    error: Mutex<Option<GuardError>>,
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("options", &self.options)
            .field("loading", &self.loading)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl Tracker {
    fn new(ctx: GuardContext, navigator: Arc<dyn Navigator>, options: ActionOptions) -> Self {
        Self {
            ctx,
            navigator,
            options,
            loading: AtomicBool::new(false),
            error: Mutex::new(None),
        }
    }

    fn start(&self) {
        self.loading.store(true, Ordering::SeqCst);
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn finish(
        &self,
        result: Result<TransportResponse, GuardError>,
    ) -> Result<TransportResponse, GuardError> {
        self.loading.store(false, Ordering::SeqCst);
        match &result {
            Ok(resp) => {
                if let Some(hook) = &self.options.on_success {
                    hook(resp);
                }
                if let Some(target) = self.options.redirect_to.as_deref() {
                    navigate_for_mode(self.navigator.as_ref(), target, self.ctx.config().mode);
                }
            }
            Err(e) => {
                *self.error.lock().unwrap_or_else(PoisonError::into_inner) = Some(e.clone());
                if let Some(hook) = &self.options.on_error {
                    hook(e);
                }
            }
        }
        result
    }

    fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    fn error(&self) -> Option<GuardError> {
        self.error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Submits credentials through the guard client.
#[derive(Debug)]
pub struct LoginAction {
    tracker: Tracker,
}

impl LoginAction {
    pub fn new(ctx: GuardContext, navigator: Arc<dyn Navigator>, options: ActionOptions) -> Self {
        Self {
            tracker: Tracker::new(ctx, navigator, options),
        }
    }

    /// Log in. Errors reach `on_error` and are then returned.
    pub async fn login(&self, credentials: &Credentials) -> Result<TransportResponse, GuardError> {
        self.tracker.start();
        let result = self.tracker.ctx.login(credentials).await;
        self.tracker.finish(result)
    }

    pub fn is_loading(&self) -> bool {
        self.tracker.is_loading()
    }

    pub fn error(&self) -> Option<GuardError> {
        self.tracker.error()
    }
}

/// Ends the session through the guard client.
#[derive(Debug)]
pub struct LogoutAction {
    tracker: Tracker,
}

impl LogoutAction {
    pub fn new(ctx: GuardContext, navigator: Arc<dyn Navigator>, options: ActionOptions) -> Self {
        Self {
            tracker: Tracker::new(ctx, navigator, options),
        }
    }

    pub async fn logout(&self) -> Result<TransportResponse, GuardError> {
        self.tracker.start();
        let result = self.tracker.ctx.logout().await;
        self.tracker.finish(result)
    }

    pub fn is_loading(&self) -> bool {
        self.tracker.is_loading()
    }

    pub fn error(&self) -> Option<GuardError> {
        self.tracker.error()
    }
}
