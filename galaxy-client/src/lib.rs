//! Typed client for GOG's content-system API.
//!
//! Covers builds enumeration (with the generation-merge quirk from spec §4.3),
//! secure-link issuance and caching, V1/V2 manifest fetch, manifest
//! auto-detection, and patch availability queries. OAuth2 token acquisition is
//! explicitly out of scope — see [`galaxy_http::CredentialProvider`].

mod cache;
mod client;
mod error;
mod types;

pub use cache::SecureLinkCache;
pub use client::ContentSystemClient;
pub use error::{Error, Result};
pub use types::{
    BuildSummary, CdnEndpoint, DepotDescriptorV1, DepotDescriptorV2, DepotManifestRefV2,
    ManifestKind, PatchDepotRef, PatchRoot, Platform, Repository, SecureLink,
};
