//! `galaxy-dl mirror build`/`mirror validate`: the networked half of the CLI,
//! wrapping `galaxy-mirror`'s [`MirrorWriter`] and [`MirrorValidator`] against
//! a session authenticated via [`crate::config::FileCredentialProvider`]
//! (spec.md §4.6, §4.7).

use crate::output::{self, OutputStyle};
use crate::OutputFormat;
use galaxy_client::{ContentSystemClient, Platform};
use galaxy_http::Session;
use galaxy_mirror::{MirrorValidator, MirrorWriter, Sample};
use std::path::PathBuf;
use std::sync::Arc;

fn parse_platform(value: &str) -> anyhow::Result<Platform> {
    match value.to_ascii_lowercase().as_str() {
        "windows" | "win" => Ok(Platform::Windows),
        "osx" | "mac" => Ok(Platform::Osx),
        "linux" => Ok(Platform::Linux),
        other => anyhow::bail!("unrecognized platform '{other}', expected windows/osx/linux"),
    }
}

fn build_session() -> anyhow::Result<Session> {
    let builder = Session::builder().user_agent("galaxy-dl/0.1");
    let builder = match crate::config::FileCredentialProvider::load() {
        Ok(provider) => builder.credentials(Arc::new(provider)),
        Err(err) => {
            tracing::debug!("no stored credentials, continuing unauthenticated: {err}");
            builder
        }
    };
    Ok(builder.build()?)
}

#[allow(clippy::too_many_arguments)]
pub async fn build(
    product_id: String,
    identifier: String,
    platform: Option<String>,
    generation: u8,
    mirror_root: PathBuf,
    format: OutputFormat,
    style: &OutputStyle,
) -> anyhow::Result<()> {
    let session = build_session()?;
    let client = ContentSystemClient::new(session);
    let writer = MirrorWriter::new(&client, mirror_root.clone());

    let stats = if generation == 1 {
        let platform = match platform {
            Some(p) => Some(parse_platform(&p)?),
            None => None,
        };
        writer.archive_v1_build(&product_id, &identifier, platform).await?
    } else {
        writer.archive_v2_build(&product_id, &identifier).await?
    };

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "downloaded": stats.downloaded,
                "skipped": stats.skipped,
                "failed": stats.failed,
                "failures": stats.failures,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            output::print_section_header(&format!("Archived build {identifier}"), style);
            println!("{}", output::format_key_value("downloaded", &stats.downloaded.to_string(), style));
            println!("{}", output::format_key_value("skipped", &stats.skipped.to_string(), style));
            println!("{}", output::format_key_value("failed", &stats.failed.to_string(), style));
            for failure in &stats.failures {
                println!("{}", output::format_error(&format!("{} {failure}", output::glyph_fail(style)), style));
            }
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn validate(
    mirror_root: PathBuf,
    product_id: String,
    identifier: String,
    platform: Option<String>,
    generation: u8,
    sample_count: Option<usize>,
    sample_seed: u64,
    format: OutputFormat,
    style: &OutputStyle,
) -> anyhow::Result<bool> {
    let validator = MirrorValidator::new(mirror_root.clone());
    let sample = sample_count.map(|count| Sample { count, seed: sample_seed });

    let report = if generation == 1 {
        let platform = platform.ok_or_else(|| anyhow::anyhow!("--platform is required for generation 1 validation"))?;
        validator.validate_v1_sample(&product_id, &platform, &identifier, sample)?
    } else {
        validator.validate_v2_sample(&product_id, &identifier, sample)?
    };

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "passed": report.passed,
                "failed": report.failed,
                "entries": report.entries.iter().map(|e| serde_json::json!({
                    "what": e.what, "ok": e.ok, "detail": e.detail,
                })).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            output::print_section_header(&format!("Validating {}", mirror_root.display()), style);
            println!("{}", output::format_key_value("passed", &report.passed.to_string(), style));
            println!("{}", output::format_key_value("failed", &report.failed.to_string(), style));
            for entry in report.entries.iter().filter(|e| !e.ok) {
                println!(
                    "{}",
                    output::format_error(
                        &format!("{} {}: {}", output::glyph_fail(style), entry.what, entry.detail.as_deref().unwrap_or("")),
                        style
                    )
                );
            }
            if report.failed == 0 {
                println!("\n{}", output::format_success(&format!("{} mirror is intact", output::glyph_ok(style)), style));
            }
        }
    }

    Ok(report.failed == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_platform_accepts_known_aliases() {
        assert_eq!(parse_platform("windows").unwrap(), Platform::Windows);
        assert_eq!(parse_platform("WIN").unwrap(), Platform::Windows);
        assert_eq!(parse_platform("mac").unwrap(), Platform::Osx);
        assert_eq!(parse_platform("osx").unwrap(), Platform::Osx);
        assert_eq!(parse_platform("linux").unwrap(), Platform::Linux);
    }

    #[test]
    fn parse_platform_rejects_unknown_values() {
        assert!(parse_platform("amiga").is_err());
    }
}
