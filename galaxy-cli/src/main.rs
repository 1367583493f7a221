//! `galaxy-dl`: packs, unpacks, verifies, and mirrors GOG Galaxy content-system
//! builds, grounded on `ngdp-client`'s `main.rs` (global flags, tracing init,
//! subcommand dispatch, exit-code mapping).

use clap::{Parser, Subcommand};
use galaxy_cli::output::OutputStyle;
use galaxy_cli::{commands, OutputFormat};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "galaxy-dl",
    about = "Mirrors, packs, and verifies GOG Galaxy content-system builds",
    version
)]
struct Cli {
    /// Logging verbosity.
    #[arg(short = 'l', long, value_enum, global = true, default_value = "info")]
    log_level: LogLevel,

    /// Output format.
    #[arg(short = 'o', long, value_enum, global = true, default_value = "text")]
    format: OutputFormat,

    /// Disable colored output (equivalent to setting `NO_COLOR`).
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Pack an archived mirror tree into an RGOG binary archive.
    Pack {
        /// Root of the archived mirror tree (contains `v2/meta`, `v2/store`).
        mirror_root: PathBuf,
        /// Output archive path (`.rgog`).
        out: PathBuf,
        /// Numeric GOG product id to pack.
        #[arg(long)]
        product_id: u64,
        /// Display name stored in the archive's ProductMetadata.
        #[arg(long)]
        product_name: Option<String>,
        /// Platform tag applied to every build this pack writes.
        #[arg(long, default_value = "windows")]
        os: String,
        /// Maximum size in bytes of a single archive part.
        #[arg(long, default_value_t = rgog_pack::DEFAULT_MAX_PART_SIZE)]
        max_part_size: u64,
    },

    /// Restore a mirror tree from an RGOG archive.
    Unpack {
        /// Path to the archive (or its first part).
        archive: PathBuf,
        /// Directory to restore the mirror tree into.
        out_dir: PathBuf,
        /// Skip writing decompressed debug copies of manifests/repositories.
        #[arg(long)]
        no_debug: bool,
        /// Number of concurrent chunk-extraction workers.
        #[arg(long)]
        workers: Option<usize>,
    },

    /// List the builds recorded in an archive.
    List {
        /// Path to the archive (or its first part).
        archive: PathBuf,
        /// Show repository id and manifest count per build.
        #[arg(long)]
        detailed: bool,
    },

    /// Extract only an archive's content-addressed chunk store.
    Extract {
        /// Path to the archive (or its first part).
        archive: PathBuf,
        /// Directory to restore the chunk store into.
        out_dir: PathBuf,
    },

    /// Verify an archive's declared checksums against its own bytes.
    Verify {
        /// Path to the archive (or its first part).
        archive: PathBuf,
        /// Also inflate every chunk and check its uncompressed MD5.
        #[arg(long)]
        full: bool,
        /// Number of worker threads used to re-hash chunks.
        #[arg(long)]
        threads: Option<usize>,
    },

    /// Print an archive's header and product summary.
    Info {
        /// Path to the archive (or its first part).
        archive: PathBuf,
    },

    /// Mirror a build directly from GOG's content-system API.
    #[command(subcommand)]
    Mirror(MirrorCommands),
}

#[derive(Subcommand)]
enum MirrorCommands {
    /// Archive a build's manifests and content to a local mirror tree.
    Build {
        /// Root directory the mirror tree is rooted at.
        mirror_root: PathBuf,
        /// Numeric GOG product id.
        product_id: String,
        /// Build identifier: a V1 timestamp or a V2 depot descriptor hash.
        identifier: String,
        /// Platform to archive (V1 only; auto-detected when omitted).
        #[arg(long)]
        platform: Option<String>,
        /// Manifest generation to archive (1 or 2).
        #[arg(long, default_value_t = 2)]
        generation: u8,
    },

    /// Validate an already-archived mirror tree offline.
    Validate {
        /// Root directory the mirror tree is rooted at.
        mirror_root: PathBuf,
        /// Numeric GOG product id.
        product_id: String,
        /// Build identifier: a V1 timestamp or a V2 depot descriptor hash.
        identifier: String,
        /// Platform to validate (required for generation 1).
        #[arg(long)]
        platform: Option<String>,
        /// Manifest generation to validate (1 or 2).
        #[arg(long, default_value_t = 2)]
        generation: u8,
        /// Validate a random sample of this size instead of every entry.
        #[arg(long)]
        sample: Option<usize>,
        /// Seed for `--sample`'s random selection.
        #[arg(long, default_value_t = 0)]
        sample_seed: u64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(Level::from(cli.log_level))
        .with_target(false)
        .init();

    if cli.no_color {
        // SAFETY: single-threaded at this point, before any command runs.
        unsafe {
            std::env::set_var("NO_COLOR", "1");
        }
    }

    let style = OutputStyle::new();
    let format = cli.format;

    let run = run_command(cli.command, format, &style);
    tokio::select! {
        result = run => {
            match result {
                Ok(true) => std::process::exit(0),
                Ok(false) => std::process::exit(1),
                Err(err) => {
                    eprintln!("Error: {err:#}");
                    std::process::exit(1);
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("interrupted");
            std::process::exit(130);
        }
    }
}

/// Dispatches to the selected subcommand's handler, returning whether the
/// operation's own outcome was successful (distinct from a hard error: a
/// clean `verify`/`mirror validate` failure still exits 1 without panicking).
async fn run_command(command: Commands, format: OutputFormat, style: &OutputStyle) -> anyhow::Result<bool> {
    match command {
        Commands::Pack {
            mirror_root,
            out,
            product_id,
            product_name,
            os,
            max_part_size,
        } => {
            commands::pack::handle(mirror_root, out, product_id, product_name, os, max_part_size, format, style).await?;
            Ok(true)
        }
        Commands::Unpack {
            archive,
            out_dir,
            no_debug,
            workers,
        } => {
            commands::unpack::handle(archive, out_dir, no_debug, workers, format, style).await?;
            Ok(true)
        }
        Commands::List { archive, detailed } => {
            commands::list::handle(archive, detailed, format, style)?;
            Ok(true)
        }
        Commands::Extract { archive, out_dir } => {
            commands::extract::handle(archive, out_dir, format, style).await?;
            Ok(true)
        }
        Commands::Verify { archive, full, threads } => Ok(commands::verify::handle(archive, full, threads, format, style).await?),
        Commands::Info { archive } => {
            commands::info::handle(archive, format, style)?;
            Ok(true)
        }
        Commands::Mirror(MirrorCommands::Build {
            mirror_root,
            product_id,
            identifier,
            platform,
            generation,
        }) => {
            commands::mirror::build(product_id, identifier, platform, generation, mirror_root, format, style).await?;
            Ok(true)
        }
        Commands::Mirror(MirrorCommands::Validate {
            mirror_root,
            product_id,
            identifier,
            platform,
            generation,
            sample,
            sample_seed,
        }) => Ok(commands::mirror::validate(
            mirror_root,
            product_id,
            identifier,
            platform,
            generation,
            sample,
            sample_seed,
            format,
            style,
        )?),
    }
}
