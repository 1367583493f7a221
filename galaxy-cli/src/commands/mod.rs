//! Subcommand handlers, one module per top-level command, grounded on
//! `ngdp-client`'s `commands/` layout (one file per subcommand, each
//! exposing a `handle` entry point the dispatcher in `main.rs` calls).

pub mod extract;
pub mod info;
pub mod list;
pub mod mirror;
pub mod pack;
pub mod unpack;
pub mod verify;
