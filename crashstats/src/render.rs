//! Text renderings of flat records.

use std::fmt;

use comfy_table::{presets, ContentArrangement, Table};
use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::error::{Error, Result};
use crate::table::{FlatRecord, FlatTables};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// Aligned, bordered columns
    Table,
    /// Tab-delimited, whitespace escaped
    Tab,
    Csv,
    Markdown,
    Json,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Table => "table",
            Format::Tab => "tab",
            Format::Csv => "csv",
            Format::Markdown => "markdown",
            Format::Json => "json",
        };
        f.write_str(name)
    }
}

/// Escape tabs and line breaks so a value stays on one line in one column.
pub fn escape_whitespace(text: &str) -> String {
    text.replace('\t', "\\t")
        .replace('\r', "\\r")
        .replace('\n', "\\n")
}

pub fn escape_pipes(text: &str) -> String {
    text.replace('|', "\\|")
}

fn rows(headers: &[String], records: &[FlatRecord]) -> Vec<Vec<String>> {
    records.iter().map(|record| record.cells(headers)).collect()
}

pub fn tableize_tab(headers: &[String], rows: &[Vec<String>], show_headers: bool) -> Result<String> {
    let mut builder = WriterBuilder::new();
    builder.delimiter(b'\t').quote_style(QuoteStyle::Never);
    write_delimited(builder, headers, rows, show_headers, escape_whitespace)
}

pub fn tableize_csv(headers: &[String], rows: &[Vec<String>], show_headers: bool) -> Result<String> {
    write_delimited(WriterBuilder::new(), headers, rows, show_headers, str::to_string)
}

fn write_delimited(
    mut builder: WriterBuilder,
    headers: &[String],
    rows: &[Vec<String>],
    show_headers: bool,
    escape: impl Fn(&str) -> String,
) -> Result<String> {
    let mut writer = builder
        .terminator(Terminator::Any(b'\n'))
        .flexible(true)
        .from_writer(Vec::new());
    if show_headers {
        writer.write_record(headers.iter().map(|cell| escape(cell)))?;
    }
    for row in rows {
        writer.write_record(row.iter().map(|cell| escape(cell)))?;
    }
    let bytes = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;

    let mut output = String::from_utf8_lossy(&bytes).into_owned();
    if output.ends_with('\n') {
        output.pop();
    }
    Ok(output)
}

pub fn tableize_markdown(headers: &[String], rows: &[Vec<String>], show_headers: bool) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 2);
    if show_headers {
        lines.push(headers.join(" | "));
        let rule: Vec<String> = headers
            .iter()
            .map(|h| "-".repeat(h.chars().count()))
            .collect();
        lines.push(rule.join(" | "));
    }
    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| escape_pipes(&escape_whitespace(cell)))
            .collect();
        lines.push(cells.join(" | "));
    }
    lines.join("\n")
}

/// Left-aligned columns padded to the widest cell.
pub fn tableize_table(headers: &[String], rows: &[Vec<String>], show_headers: bool) -> String {
    let mut table = Table::new();
    table
        .load_preset(presets::ASCII_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Disabled);
    if show_headers {
        table.set_header(headers.iter().map(|h| escape_whitespace(h)));
    }
    for row in rows {
        table.add_row(row.iter().map(|cell| escape_whitespace(cell)));
    }
    table.to_string()
}

/// Render `records` in `headers` column order.
pub fn render_records(
    format: Format,
    headers: &[String],
    records: &[FlatRecord],
    show_headers: bool,
) -> Result<String> {
    let output = match format {
        Format::Json => serde_json::to_string_pretty(records)?,
        Format::Tab => tableize_tab(headers, &rows(headers, records), show_headers)?,
        Format::Csv => tableize_csv(headers, &rows(headers, records), show_headers)?,
        Format::Markdown => tableize_markdown(headers, &rows(headers, records), show_headers),
        Format::Table => tableize_table(headers, &rows(headers, records), show_headers),
    };
    Ok(output)
}

/// Render every table under its name; JSON renders one object keyed by name.
pub fn render_tables(format: Format, tables: &FlatTables) -> Result<String> {
    if format == Format::Json {
        return Ok(serde_json::to_string_pretty(tables)?);
    }

    let mut sections = Vec::with_capacity(tables.len());
    for (name, table) in tables.iter() {
        let body = render_records(format, &table.headers(), &table.records, true)?;
        sections.push(format!("{}\n{}", name, body));
    }
    Ok(sections.join("\n\n"))
}
