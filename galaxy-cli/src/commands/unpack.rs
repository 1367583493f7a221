//! `galaxy-dl unpack`: restores a mirror tree from an RGOG archive (spec.md
//! §4.9), wrapping [`rgog_unpack::unpack`].

use crate::output::{self, OutputStyle};
use crate::OutputFormat;
use rgog_unpack::UnpackOptions;
use std::path::PathBuf;

pub async fn handle(
    archive: PathBuf,
    out_dir: PathBuf,
    no_debug: bool,
    workers: Option<usize>,
    format: OutputFormat,
    style: &OutputStyle,
) -> anyhow::Result<()> {
    let opts = UnpackOptions {
        write_debug: !no_debug,
        workers: workers.unwrap_or_else(|| UnpackOptions::default().workers),
    };

    let report = rgog_unpack::unpack(&archive, &out_dir, &opts).await?;

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "builds_restored": report.builds_restored,
                "manifests_restored": report.manifests_restored,
                "chunks_restored": report.chunks_restored,
                "warnings": report.warnings,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            output::print_section_header("Unpack report", style);
            println!("{}", output::format_key_value("builds", &report.builds_restored.to_string(), style));
            println!("{}", output::format_key_value("manifests", &report.manifests_restored.to_string(), style));
            println!("{}", output::format_key_value("chunks", &report.chunks_restored.to_string(), style));
            for warning in &report.warnings {
                println!("{}", output::format_warning(&format!("{} {warning}", output::glyph_warn(style)), style));
            }
        }
    }

    Ok(())
}
