//! `galaxy-dl list`: lists the builds recorded in an RGOG archive's
//! BuildMetadata section (spec.md §3 "BuildMetadata"), without extracting
//! anything.

use crate::output::{self, OutputStyle};
use crate::OutputFormat;
use std::path::PathBuf;

pub fn handle(archive: PathBuf, detailed: bool, format: OutputFormat, style: &OutputStyle) -> anyhow::Result<()> {
    let part_paths = rgog_unpack::discover_parts(&archive)?;
    let part0 = rgog_unpack::read_part(&part_paths[0])?;

    match format {
        OutputFormat::Json => {
            let builds: Vec<_> = part0
                .builds
                .iter()
                .map(|build| {
                    serde_json::json!({
                        "build_id": build.build_id,
                        "os": format!("{:?}", build.os),
                        "repository_id": hex::encode(build.repository_id),
                        "manifest_count": build.manifests.len(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&builds)?);
        }
        OutputFormat::Text => {
            output::print_section_header(&format!("Builds in {}", archive.display()), style);
            let mut table = output::create_table(style);
            if detailed {
                table.set_header(vec![
                    output::header_cell("Build ID", style),
                    output::header_cell("OS", style),
                    output::header_cell("Repository", style),
                    output::header_cell("Manifests", style),
                ]);
            } else {
                table.set_header(vec![output::header_cell("Build ID", style), output::header_cell("OS", style)]);
            }
            for build in &part0.builds {
                if detailed {
                    table.add_row(vec![
                        output::numeric_cell(&build.build_id.to_string()),
                        output::regular_cell(&format!("{:?}", build.os)),
                        output::regular_cell(&hex::encode(build.repository_id)),
                        output::numeric_cell(&build.manifests.len().to_string()),
                    ]);
                } else {
                    table.add_row(vec![
                        output::numeric_cell(&build.build_id.to_string()),
                        output::regular_cell(&format!("{:?}", build.os)),
                    ]);
                }
            }
            println!("{table}");
            println!(
                "\n{}",
                output::format_key_value("parts", &part_paths.len().to_string(), style)
            );
        }
    }

    Ok(())
}
