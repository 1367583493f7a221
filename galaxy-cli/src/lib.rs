//! Library half of the `galaxy-dl` CLI: command handlers and shared output
//! formatting, grounded on `ngdp-client`'s `lib.rs`/`output.rs` split.

pub mod commands;
pub mod config;
pub mod output;

/// Output format selected via the global `-o/--format` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
