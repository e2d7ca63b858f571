use std::ops::Deref;
use std::sync::Arc;

use crate::client::GuardClient;

/// Shared handle to one [`GuardClient`].
///
/// Build it once at startup and hand clones to whatever needs the guard.
#[derive(Debug, Clone)]
pub struct GuardContext {
    client: Arc<GuardClient>,
}

impl GuardContext {
    pub fn new(client: GuardClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn client(&self) -> &Arc<GuardClient> {
        &self.client
    }

    /// True if both handles point at the same client.
    pub fn same_client(&self, other: &GuardContext) -> bool {
        Arc::ptr_eq(&self.client, &other.client)
    }
}

impl Deref for GuardContext {
    type Target = GuardClient;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl From<GuardClient> for GuardContext {
    fn from(client: GuardClient) -> Self {
        Self::new(client)
    }
}

impl From<Arc<GuardClient>> for GuardContext {
    fn from(client: Arc<GuardClient>) -> Self {
        Self { client }
    }
}
