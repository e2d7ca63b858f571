//! authgate-runtime
//!
//! The guard client: who is signed in, which roles they hold, and whether
//! the backend lets them reach a route. Session state is published over a
//! `tokio::sync::watch` channel so adapters can observe it.

#![forbid(unsafe_code)]

mod client;
mod context;
mod registry;

pub use client::GuardClient;
pub use context::GuardContext;
pub use registry::{create_guard_client, global_guard_client, install};
