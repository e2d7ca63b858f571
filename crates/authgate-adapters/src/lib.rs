//! authgate-adapters
//!
//! UI-facing wrappers over the guard client: an observable user store, a
//! cached current-user query, login/logout actions, and the view gate.
//! Navigation goes through the [`authgate_api::Navigator`] seam so the same
//! pieces work in a browser shell or headless.

#![forbid(unsafe_code)]

pub mod actions;
pub mod gate;
pub mod navigator;
pub mod query;
pub mod store;

pub use actions::{ActionOptions, LoginAction, LogoutAction};
pub use gate::Gate;
pub use navigator::{MemoryNavigator, Visit, navigate, navigate_for_mode};
pub use query::{DEFAULT_STALE_TIME, QueryState, UserQuery};
pub use store::{AuthStore, SessionWatch};
