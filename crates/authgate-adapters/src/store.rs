use authgate_api::{SessionState, User};
use authgate_runtime::GuardClient;
use tokio::sync::watch;

/// Minimal observable user store.
///
/// Independent of any client: callers set and clear the user themselves,
/// or copy it over from a client with [`AuthStore::sync_from`].
#[derive(Debug)]
pub struct AuthStore {
    user: watch::Sender<Option<User>>,
}

impl Default for AuthStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthStore {
    pub fn new() -> Self {
        let (user, _) = watch::channel(None);
        Self { user }
    }

    pub fn user(&self) -> Option<User> {
        self.user.borrow().clone()
    }

    pub fn set_user(&self, user: User) {
        self.user.send_replace(Some(user));
    }

    pub fn clear_user(&self) {
        self.user.send_replace(None);
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.user.subscribe()
    }

    pub fn sync_from(&self, client: &GuardClient) {
        self.user.send_replace(client.user());
    }
}

/// Signal-style view over a client's session state.
#[derive(Debug, Clone)]
pub struct SessionWatch {
    rx: watch::Receiver<SessionState>,
}

impl SessionWatch {
    pub fn new(client: &GuardClient) -> Self {
        Self {
            rx: client.subscribe(),
        }
    }

    pub fn get(&self) -> SessionState {
        self.rx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.rx.borrow().is_authenticated()
    }

    /// Wait for the next change and return the new state.
    ///
    /// Returns `None` once the client is gone.
    pub async fn changed(&mut self) -> Option<SessionState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}
