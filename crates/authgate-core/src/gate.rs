//! Render/redirect decision for a guarded view.

use authgate_api::{GuardMode, Redirects, SessionState};
use serde::Serialize;

use crate::roles::{RoleQuery, has_role};

/// Fallback redirect target when nothing else is configured.
pub const DEFAULT_FAIL_REDIRECT: &str = "/login";

/// State of the server-side access check for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendCheck {
    NotRequested,
    Pending,
    Allowed,
    Denied,
}

impl BackendCheck {
    pub fn from_allowed(allowed: bool) -> Self {
        if allowed {
            BackendCheck::Allowed
        } else {
            BackendCheck::Denied
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    Unauthenticated,
    MissingRole,
    BackendDenied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Session or backend check still loading.
    Pending,
    Granted,
    Denied(BlockReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Navigation {
    /// Client-side route change.
    ClientRoute,
    /// Full page load.
    FullPage,
}

impl From<GuardMode> for Navigation {
    fn from(mode: GuardMode) -> Self {
        match mode {
            GuardMode::Spa => Navigation::ClientRoute,
            GuardMode::Mpa => Navigation::FullPage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GateOutcome {
    /// Render nothing yet.
    Pending,
    Render,
    Redirect {
        target: String,
        navigation: Navigation,
        reason: BlockReason,
    },
    Fallback {
        reason: BlockReason,
    },
}

impl GateOutcome {
    pub fn is_render(&self) -> bool {
        matches!(self, GateOutcome::Render)
    }

    pub fn block_reason(&self) -> Option<BlockReason> {
        match self {
            GateOutcome::Redirect { reason, .. } | GateOutcome::Fallback { reason } => {
                Some(*reason)
            }
            GateOutcome::Pending | GateOutcome::Render => None,
        }
    }
}

/// Local check: signed in, and holding a requested role when any are requested.
pub fn local_access(session: &SessionState, roles: &RoleQuery) -> Result<(), BlockReason> {
    if !session.is_authenticated() {
        return Err(BlockReason::Unauthenticated);
    }
    if !roles.is_empty() && !has_role(session.user.as_ref(), roles) {
        return Err(BlockReason::MissingRole);
    }
    Ok(())
}

/// Combine the session, the role requirement and the backend check.
///
/// A denial from either the local check or the backend blocks access.
pub fn check_access(session: &SessionState, roles: &RoleQuery, backend: BackendCheck) -> Access {
    if session.is_loading || backend == BackendCheck::Pending {
        return Access::Pending;
    }
    if let Err(reason) = local_access(session, roles) {
        return Access::Denied(reason);
    }
    match backend {
        BackendCheck::Denied => Access::Denied(BlockReason::BackendDenied),
        BackendCheck::NotRequested | BackendCheck::Allowed | BackendCheck::Pending => {
            Access::Granted
        }
    }
}

/// Pick the redirect target for a blocked view.
///
/// An explicit target wins over `redirects.on_fail`. An empty result means
/// the fallback view is rendered instead.
pub fn redirect_target<'a>(explicit: Option<&'a str>, redirects: &'a Redirects) -> &'a str {
    explicit.unwrap_or(&redirects.on_fail)
}

pub fn resolve(
    access: Access,
    explicit_target: Option<&str>,
    redirects: &Redirects,
    mode: GuardMode,
) -> GateOutcome {
    match access {
        Access::Pending => GateOutcome::Pending,
        Access::Granted => GateOutcome::Render,
        Access::Denied(reason) => {
            let target = redirect_target(explicit_target, redirects);
            if target.is_empty() {
                GateOutcome::Fallback { reason }
            } else {
                GateOutcome::Redirect {
                    target: target.to_string(),
                    navigation: mode.into(),
                    reason,
                }
            }
        }
    }
}

/// Everything needed to decide what a guarded view shows.
#[derive(Debug, Clone)]
pub struct GateInput<'a> {
    pub session: &'a SessionState,
    pub roles: &'a RoleQuery,
    pub backend: BackendCheck,
    pub redirect_to: Option<&'a str>,
    pub redirects: &'a Redirects,
    pub mode: GuardMode,
}

pub fn decide(input: &GateInput<'_>) -> GateOutcome {
    let access = check_access(input.session, input.roles, input.backend);
    resolve(access, input.redirect_to, input.redirects, input.mode)
}
