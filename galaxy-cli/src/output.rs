//! Output formatting utilities for the CLI, grounded on
//! `ngdp-client::output`'s table/color helpers.
//!
//! Adds the spec's `FORCE_ASCII` environment switch (spec §6) on top of the
//! teacher's `NO_COLOR` convention.

use comfy_table::{presets, Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use owo_colors::OwoColorize;

/// True if `FORCE_ASCII` is set to `1`, `true`, or `yes` (case-insensitive),
/// per spec §6.
fn force_ascii() -> bool {
    std::env::var("FORCE_ASCII")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Style configuration for output formatting.
pub struct OutputStyle {
    pub use_color: bool,
    pub use_unicode: bool,
}

impl Default for OutputStyle {
    fn default() -> Self {
        Self {
            use_color: std::env::var("NO_COLOR").is_err(),
            use_unicode: !force_ascii(),
        }
    }
}

impl OutputStyle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn no_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

/// A pass/fail (or informational) glyph, ASCII when `FORCE_ASCII` is set.
pub fn glyph_ok(style: &OutputStyle) -> &'static str {
    if style.use_unicode { "✓" } else { "OK" }
}

pub fn glyph_fail(style: &OutputStyle) -> &'static str {
    if style.use_unicode { "✗" } else { "FAILED" }
}

pub fn glyph_warn(style: &OutputStyle) -> &'static str {
    if style.use_unicode { "⚠" } else { "WARN" }
}

pub fn format_header(text: &str, style: &OutputStyle) -> String {
    if style.use_color {
        text.bold().bright_blue().to_string()
    } else {
        text.to_string()
    }
}

pub fn format_success(text: &str, style: &OutputStyle) -> String {
    if style.use_color {
        text.green().to_string()
    } else {
        text.to_string()
    }
}

pub fn format_warning(text: &str, style: &OutputStyle) -> String {
    if style.use_color {
        text.yellow().to_string()
    } else {
        text.to_string()
    }
}

pub fn format_error(text: &str, style: &OutputStyle) -> String {
    if style.use_color {
        text.red().to_string()
    } else {
        text.to_string()
    }
}

pub fn format_key_value(key: &str, value: &str, style: &OutputStyle) -> String {
    if style.use_color {
        format!("{}: {}", key.cyan(), value)
    } else {
        format!("{key}: {value}")
    }
}

/// Creates a styled table, ASCII-bordered under `FORCE_ASCII`.
pub fn create_table(style: &OutputStyle) -> Table {
    let mut table = Table::new();
    if style.use_unicode {
        table
            .load_preset(presets::UTF8_FULL)
            .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    } else {
        table.load_preset(presets::ASCII_FULL);
    }
    table.set_content_arrangement(ContentArrangement::Dynamic).set_width(140);
    table
}

pub fn header_cell(text: &str, style: &OutputStyle) -> Cell {
    let cell = Cell::new(text);
    if style.use_color {
        cell.fg(Color::Cyan).add_attribute(Attribute::Bold).set_alignment(CellAlignment::Left)
    } else {
        cell.add_attribute(Attribute::Bold).set_alignment(CellAlignment::Left)
    }
}

pub fn regular_cell(text: &str) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Left)
}

pub fn numeric_cell(text: &str) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Styles a status cell, recognizing both the Unicode and ASCII glyph forms.
pub fn status_cell(text: &str, style: &OutputStyle) -> Cell {
    let cell = Cell::new(text);
    if style.use_color {
        match text {
            "✓" | "OK" | "Success" => cell.fg(Color::Green),
            "✗" | "FAILED" | "Failed" | "Error" => cell.fg(Color::Red),
            "⚠" | "WARN" | "Warning" => cell.fg(Color::Yellow),
            _ => cell,
        }
    } else {
        cell
    }
}

pub fn print_section_header(title: &str, style: &OutputStyle) {
    if style.use_color {
        println!("\n{}", title.bold().bright_blue());
    } else {
        println!("\n{title}");
    }
    let rule = if style.use_unicode { "═" } else { "=" };
    println!("{}", rule.repeat(title.chars().count()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_style_uses_ascii_glyphs() {
        let style = OutputStyle { use_color: false, use_unicode: false };
        assert_eq!(glyph_ok(&style), "OK");
        assert_eq!(glyph_fail(&style), "FAILED");
    }

    #[test]
    fn unicode_style_uses_unicode_glyphs() {
        let style = OutputStyle { use_color: false, use_unicode: true };
        assert_eq!(glyph_ok(&style), "✓");
    }
}
