//! Authenticated HTTP transport for the GOG Galaxy content-system.
//!
//! A [`Session`] owns a reusable `reqwest` connection pool, a fixed user-agent, and
//! an optional [`CredentialProvider`] consulted before every authenticated request.
//! Retries are applied uniformly to every GET: connection reset/abort, timeout, DNS
//! failure, or HTTP 5xx are retried with exponential backoff; 4xx responses are
//! never retried.

mod credentials;
mod error;
mod session;

pub use credentials::{BearerToken, CredentialProvider, StaticTokenProvider};
pub use error::{Error, Result};
pub use session::{HeadInfo, Session, SessionBuilder};
