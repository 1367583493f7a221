//! `galaxy-dl verify`: checks an RGOG archive's integrity against its own
//! declared metadata (spec.md §4.9, §8), without writing anything to disk.
//!
//! Returns `Ok(true)` when every check passed, `Ok(false)` when at least one
//! mismatch was found, so `main.rs` can map a clean failure to exit code 1
//! without treating it as an error.

use crate::output::{self, OutputStyle};
use crate::OutputFormat;
use rgog_unpack::VerifyOptions;
use std::path::PathBuf;

pub async fn handle(
    archive: PathBuf,
    full: bool,
    threads: Option<usize>,
    format: OutputFormat,
    style: &OutputStyle,
) -> anyhow::Result<bool> {
    let opts = VerifyOptions {
        full,
        threads: threads.unwrap_or_else(|| VerifyOptions::default().threads),
    };

    let archive_for_blocking = archive.clone();
    let report = tokio::task::spawn_blocking(move || rgog_unpack::verify(&archive_for_blocking, &opts)).await??;

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "ok": report.ok(),
                "parts_checked": report.parts_checked,
                "builds_checked": report.builds_checked,
                "manifests_checked": report.manifests_checked,
                "chunks_checked": report.chunks_checked,
                "mismatches": report.mismatches.iter().map(|m| serde_json::json!({"what": m.what, "detail": m.detail})).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            output::print_section_header(&format!("Verifying {}", archive.display()), style);
            println!("{}", output::format_key_value("parts", &report.parts_checked.to_string(), style));
            println!("{}", output::format_key_value("builds", &report.builds_checked.to_string(), style));
            println!("{}", output::format_key_value("manifests", &report.manifests_checked.to_string(), style));
            println!("{}", output::format_key_value("chunks", &report.chunks_checked.to_string(), style));
            if report.ok() {
                println!("\n{}", output::format_success(&format!("{} archive is intact", output::glyph_ok(style)), style));
            } else {
                for mismatch in &report.mismatches {
                    println!(
                        "{}",
                        output::format_error(&format!("{} {}: {}", output::glyph_fail(style), mismatch.what, mismatch.detail), style)
                    );
                }
            }
        }
    }

    Ok(report.ok())
}
