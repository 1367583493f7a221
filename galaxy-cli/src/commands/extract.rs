//! `galaxy-dl extract`: a thin wrapper over [`rgog_unpack::unpack`] for
//! callers who only want the store (chunk) tree, skipping the pretty-printed
//! debug copies of each manifest/repository.
//!
//! Per-build or chunks-only filtering is not offered here: an RGOG archive's
//! ChunkMetadata section dedupes chunks across the whole archive (see
//! DESIGN.md), so there is no per-build subset to select without re-reading
//! every build's manifests and that belongs in `rgog-unpack`, not the CLI.

use crate::output::{self, OutputStyle};
use crate::OutputFormat;
use rgog_unpack::UnpackOptions;
use std::path::PathBuf;

pub async fn handle(archive: PathBuf, out_dir: PathBuf, format: OutputFormat, style: &OutputStyle) -> anyhow::Result<()> {
    let opts = UnpackOptions {
        write_debug: false,
        ..UnpackOptions::default()
    };
    let report = rgog_unpack::unpack(&archive, &out_dir, &opts).await?;

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "chunks_restored": report.chunks_restored,
                "warnings": report.warnings,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            println!(
                "{}",
                output::format_success(&format!("{} extracted {} chunks to {}", output::glyph_ok(style), report.chunks_restored, out_dir.display()), style)
            );
        }
    }

    Ok(())
}
