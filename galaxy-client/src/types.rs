//! Wire types for the content-system API.
//!
//! These mirror the JSON shapes described in spec.md §3/§4.3. Dynamic/optional
//! fields in the original Python models become explicit `Option<T>` here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A platform a build is published for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    #[serde(alias = "mac")]
    Osx,
    Linux,
}

impl Platform {
    /// The path segment used in content-system URLs (`windows`, `osx`, `linux`).
    pub fn as_path_segment(self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Osx => "osx",
            Platform::Linux => "linux",
        }
    }

    /// All platforms, in the order V1 repository auto-detection probes them.
    pub const ALL: [Platform; 3] = [Platform::Windows, Platform::Osx, Platform::Linux];
}

/// One row of the builds list endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildSummary {
    pub build_id: String,
    pub product_id: String,
    #[serde(default)]
    pub generation: Option<u8>,
    pub date_published: String,
    #[serde(default)]
    pub legacy_build_id: Option<String>,
    #[serde(default)]
    pub version_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BuildsResponse {
    #[serde(default)]
    pub items: Vec<BuildSummary>,
}

/// One CDN endpoint entry from a secure-link response.
#[derive(Debug, Clone, Deserialize)]
pub struct CdnEndpoint {
    pub endpoint_name: String,
    pub url_format: String,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

/// The secure-link response body: an ordered array of CDN endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct SecureLinkResponse {
    pub urls: Vec<CdnEndpoint>,
}

/// A materialized secure link, with `{GALAXY_PATH}` left unexpanded for the
/// download engine to fill in per-chunk.
#[derive(Debug, Clone)]
pub struct SecureLink {
    /// URL templates in priority order, each still containing `{GALAXY_PATH}`.
    pub templates: Vec<String>,
}

/// A V1 depot descriptor, as found in `repository.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct DepotDescriptorV1 {
    pub languages: Vec<String>,
    pub manifest: String,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// A decompressed `repository.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub build_id: Option<String>,
    pub depots: Vec<DepotDescriptorV1>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// A single depot manifest reference inside a V2 depot descriptor.
#[derive(Debug, Clone, Deserialize)]
pub struct DepotManifestRefV2 {
    pub product_id: String,
    pub languages: Vec<String>,
    pub manifest: String,
}

/// A decompressed V2 depot descriptor (`v2/meta/aa/bb/<depot_hash>`).
#[derive(Debug, Clone, Deserialize)]
pub struct DepotDescriptorV2 {
    #[serde(default)]
    pub build_id: Option<String>,
    pub depots: Vec<DepotManifestRefV2>,
    #[serde(default)]
    pub offline_depot: Option<DepotManifestRefV2>,
}

/// The root patch document returned by the patches endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PatchRoot {
    pub algorithm: String,
    #[serde(default)]
    pub error: Option<String>,
    pub depots: Vec<PatchDepotRef>,
}

/// A single per-depot patch manifest reference inside [`PatchRoot`].
#[derive(Debug, Clone, Deserialize)]
pub struct PatchDepotRef {
    pub product_id: String,
    pub languages: Vec<String>,
    pub manifest: String,
}

/// The result of auto-detecting a manifest by identifier alone (spec §4.3).
#[derive(Debug, Clone)]
pub enum ManifestKind {
    V1(Box<Repository>),
    V2(Box<DepotDescriptorV2>),
}
