//! Verification and restoration of RGOG binary archives (spec.md §4.9, §9).
//!
//! [`verify`] re-hashes every record an archive claims without writing
//! anything back to disk; [`unpack`] restores a full `MirrorTree` from one,
//! fanning chunk extraction out across a worker pool. Both auto-redirect to
//! part 0 of a multi-part archive by filename convention (spec §6) through
//! [`discover_parts`].

mod error;
mod parts;
mod unpack;
mod verify;

pub use error::{Error, Result};
pub use parts::{discover_parts, read_at, read_part, PartContents};
pub use unpack::{list_parts, unpack, UnpackOptions, UnpackReport};
pub use verify::{verify, Mismatch, VerifyOptions, VerifyReport};
