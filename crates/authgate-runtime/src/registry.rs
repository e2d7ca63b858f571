//! Process-wide guard client lookup.
//!
//! Prefer passing a [`GuardContext`] explicitly. The registry exists for call
//! sites that cannot be threaded a handle; it holds at most one client and
//! creating another replaces it.

use std::sync::{Arc, PoisonError, RwLock};

use authgate_api::{GuardConfig, GuardError, Transport};

use crate::client::GuardClient;
use crate::context::GuardContext;

static GLOBAL: RwLock<Option<GuardContext>> = RwLock::new(None);

/// Build a client over `transport` and make it the global one.
pub fn create_guard_client(
    config: GuardConfig,
    transport: Arc<dyn Transport>,
) -> Result<GuardContext, GuardError> {
    let ctx = GuardContext::new(GuardClient::new(config, transport)?);
    install(ctx.clone());
    Ok(ctx)
}

/// Make `ctx` the global client, returning the one it replaced.
pub fn install(ctx: GuardContext) -> Option<GuardContext> {
    let previous = GLOBAL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(ctx);
    if previous.is_some() {
        tracing::debug!("replaced global guard client");
    }
    previous
}

/// The global client, or `GuardError::NotInitialized` if none was created.
pub fn global_guard_client() -> Result<GuardContext, GuardError> {
    GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .ok_or(GuardError::NotInitialized)
}
