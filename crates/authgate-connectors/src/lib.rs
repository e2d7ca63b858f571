//! authgate-connectors
//!
//! Transports the guard client sends its requests through:
//!
//! - [`ReqwestTransport`]: HTTP with a cookie jar, XSRF header echo, timeouts
//!   and configured extra headers.
//! - [`RecordingTransport`] (feature `testing`): scripted replies for tests.

#![forbid(unsafe_code)]

mod http;
#[cfg(any(test, feature = "testing"))]
mod recording;
pub mod xsrf;

pub use http::{DefaultTransportFactory, ReqwestTransport};
#[cfg(any(test, feature = "testing"))]
pub use recording::RecordingTransport;
