use std::sync::{Mutex, PoisonError};

use authgate_api::{GuardMode, Navigator, Route};
use authgate_core::Navigation;

/// Send `navigator` to `target` the way `navigation` asks for.
pub fn navigate(navigator: &dyn Navigator, target: &str, navigation: Navigation) {
    tracing::debug!(to = target, ?navigation, "guard redirect");
    match navigation {
        Navigation::ClientRoute => navigator.push(target),
        Navigation::FullPage => navigator.assign(target),
    }
}

/// Redirect after a successful action, following the configured mode.
pub fn navigate_for_mode(navigator: &dyn Navigator, target: &str, mode: GuardMode) {
    navigate(navigator, target, mode.into());
}

/// A navigation recorded by [`MemoryNavigator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visit {
    Push(Route),
    Assign(Route),
}

/// Headless navigator that tracks the current route in memory.
#[derive(Debug)]
pub struct MemoryNavigator {
    current: Mutex<Route>,
    history: Mutex<Vec<Visit>>,
}

impl MemoryNavigator {
    pub fn new(current: impl Into<Route>) -> Self {
        Self {
            current: Mutex::new(current.into()),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn history(&self) -> Vec<Visit> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn visit(&self, target: &str, visit: Visit) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = target.to_string();
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(visit);
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn current_route(&self) -> Route {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, target: &str) {
        self.visit(target, Visit::Push(target.to_string()));
    }

    fn assign(&self, target: &str) {
        self.visit(target, Visit::Assign(target.to_string()));
    }
}
