//! `galaxy-dl info`: prints an RGOG archive's header and product summary
//! without restoring or verifying anything (spec.md §3 "Header").

use crate::output::{self, OutputStyle};
use crate::OutputFormat;
use std::path::PathBuf;

pub fn handle(archive: PathBuf, format: OutputFormat, style: &OutputStyle) -> anyhow::Result<()> {
    let part_paths = rgog_unpack::discover_parts(&archive)?;
    let part0 = rgog_unpack::read_part(&part_paths[0])?;

    let product_id = part0.product_metadata.as_ref().map(|p| p.product_id);
    let product_name = part0.product_metadata.as_ref().map(|p| p.name.clone());
    let total_chunks: usize = part_paths
        .iter()
        .map(|p| rgog_unpack::read_part(p).map(|c| c.chunks.len()))
        .collect::<rgog_unpack::Result<Vec<_>>>()?
        .into_iter()
        .sum();

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "version": part0.header.version,
                "archive_type": format!("{:?}", part0.header.archive_type),
                "total_parts": part0.header.total_parts,
                "total_builds": part0.header.total_builds,
                "total_chunks_header": part0.header.total_chunks,
                "total_chunks_observed": total_chunks,
                "product_id": product_id,
                "product_name": product_name,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            output::print_section_header(&format!("Info for {}", archive.display()), style);
            println!("{}", output::format_key_value("version", &part0.header.version.to_string(), style));
            println!("{}", output::format_key_value("archive type", &format!("{:?}", part0.header.archive_type), style));
            println!("{}", output::format_key_value("parts", &part0.header.total_parts.to_string(), style));
            println!("{}", output::format_key_value("builds", &part0.header.total_builds.to_string(), style));
            println!("{}", output::format_key_value("chunks", &total_chunks.to_string(), style));
            if let Some(id) = product_id {
                println!("{}", output::format_key_value("product id", &id.to_string(), style));
            }
            if let Some(name) = product_name {
                println!("{}", output::format_key_value("product name", &name, style));
            }
        }
    }

    Ok(())
}
