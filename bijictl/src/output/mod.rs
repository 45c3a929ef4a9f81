//! Printing rows of locations and colors
use clap::ValueEnum;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

pub(crate) mod rows;

/// Data format for printing rows
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub(crate) enum OutputFormat {
    /// Human readable table followed by a count
    Table,
    /// A JSON array
    Json,
    /// A YAML sequence
    Yaml,
}

/// A printable row that knows what it is a row of
pub(crate) trait Record: Tabled + Serialize {
    /// What a single row is called in the count under a table
    const NOUN: &'static str;
}

fn table<R: Record>(rows: &[R]) -> String {
    Table::new(rows).with(Style::psql()).to_string()
}

fn count<R: Record>(n: usize) -> String {
    match n {
        0 => format!("No {}s found", R::NOUN),
        1 => format!("1 {}", R::NOUN),
        n => format!("{n} {}s", R::NOUN),
    }
}

/// Format `rows` in the given data format. Tables end with a count line; an
/// empty table is only the count line.
pub(crate) fn format_records<R: Record>(rows: &[R], fmt: OutputFormat) -> anyhow::Result<String> {
    let text = match fmt {
        OutputFormat::Table if rows.is_empty() => count::<R>(0),
        OutputFormat::Table => format!("{}\n{}", table(rows), count::<R>(rows.len())),
        OutputFormat::Json => serde_json::to_string_pretty(rows)?,
        OutputFormat::Yaml => serde_yaml::to_string(rows)?,
    };
    Ok(text)
}

/// A single row as a table, without a count
pub(crate) fn format_record<R: Record>(row: &R) -> String {
    table(std::slice::from_ref(row))
}
