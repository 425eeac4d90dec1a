//! Transport to the Defer backend.
//!
//! The runtime talks to the backend only through the [`Transport`] trait.
//! [`HttpTransport`] is the reqwest implementation used when a credential is
//! configured.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod http;
pub mod transport;

pub use config::{ClientConfig, DEFAULT_ENDPOINT, ENDPOINT_ENV, TOKEN_ENV};
pub use error::{ClientError, Result};
pub use http::HttpTransport;
pub use transport::Transport;
