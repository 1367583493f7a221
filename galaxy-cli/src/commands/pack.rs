//! `galaxy-dl pack`: builds an RGOG archive from an archived mirror tree
//! (spec.md §4.8), wrapping [`rgog_pack::pack`].

use crate::output::{self, OutputStyle};
use crate::OutputFormat;
use rgog_pack::PackOptions;
use std::path::PathBuf;

pub async fn handle(
    mirror_root: PathBuf,
    out: PathBuf,
    product_id: u64,
    product_name: Option<String>,
    os: String,
    max_part_size: u64,
    format: OutputFormat,
    style: &OutputStyle,
) -> anyhow::Result<()> {
    let opts = PackOptions {
        os: rgog_format::OsCode::from_platform_segment(&os),
        product_name,
        max_part_size,
        ..PackOptions::new(product_id)
    };

    let report = tokio::task::spawn_blocking({
        let mirror_root = mirror_root.clone();
        let out = out.clone();
        move || rgog_pack::pack(&mirror_root, &out, &opts)
    })
    .await??;

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "parts_written": report.parts_written,
                "total_builds": report.total_builds,
                "total_chunks": report.total_chunks,
                "warnings": report.warnings,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            output::print_section_header("Pack report", style);
            println!("{}", output::format_key_value("builds", &report.total_builds.to_string(), style));
            println!("{}", output::format_key_value("chunks", &report.total_chunks.to_string(), style));
            for part in &report.parts_written {
                println!("{}", output::format_key_value("part", &part.display().to_string(), style));
            }
            if report.warnings.is_empty() {
                println!("{}", output::format_success(&format!("{} no warnings", output::glyph_ok(style)), style));
            } else {
                for warning in &report.warnings {
                    println!("{}", output::format_warning(&format!("{} {warning}", output::glyph_warn(style)), style));
                }
            }
        }
    }

    Ok(())
}
