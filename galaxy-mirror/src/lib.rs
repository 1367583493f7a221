//! On-disk CDN mirror archiving and validation (spec §3, §4.6, §4.7).
//!
//! [`archiver::MirrorWriter`] faithfully reproduces a build's manifests,
//! depot descriptors, and content (blob or chunks) under a [`tree::MirrorTree`]
//! rooted at some local directory, using a caller-supplied
//! `galaxy_client::ContentSystemClient`. [`validator::MirrorValidator`] then
//! walks that tree offline, re-hashing everything it finds.

mod archiver;
mod decode;
mod error;
mod tree;
mod validator;

pub use archiver::{ArchiveStats, MirrorWriter};
pub use decode::decode_bytes;
pub use error::{Error, Result};
pub use tree::MirrorTree;
pub use validator::{MirrorValidator, Sample, ValidationEntry, ValidationReport};
