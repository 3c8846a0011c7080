use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use fhirview_core::grid::{Column, Grid};
use fhirview_core::normalize::DisplayRecord;
use serde_json::json;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::OutputFormat;

/// Longest photo cell shown before it is cut; inline image data runs to kilobytes.
const PHOTO_CELL_WIDTH: usize = 48;

pub fn print_grid(grid: &Grid, response_time: Option<Duration>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", grid_json(grid, response_time)?),
        OutputFormat::Table => print_table(grid, response_time),
    }
    Ok(())
}

pub fn grid_json(grid: &Grid, response_time: Option<Duration>) -> Result<String> {
    let value = json!({
        "total": grid.len(),
        "shown": grid.view().len(),
        "responseTimeMs": response_time.map(|d| d.as_millis() as u64),
        "patients": grid.view(),
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

fn print_table(grid: &Grid, response_time: Option<Duration>) {
    let rows = grid.rows();
    if rows.is_empty() {
        println!("No patients found.");
    } else {
        println!("{}", render_table(&rows));
    }

    println!("{}", footer(grid, rows.len()));
    if let Some(elapsed) = response_time {
        println!("{}: {} ms", "Response time".cyan(), elapsed.as_millis());
    }
}

fn footer(grid: &Grid, shown: usize) -> String {
    let mut footer = format!("Total: {}", grid.len());
    if !grid.filter().is_empty() {
        footer.push_str(&format!(" (showing {shown})"));
    }
    if let Some(sort) = grid.sort() {
        footer.push_str(&format!(" | sorted by {} {}", sort.column, sort.direction));
    }
    footer
}

pub fn render_table(rows: &[Vec<String>]) -> String {
    let mut builder = Builder::default();
    builder.push_record(std::iter::once("#").chain(Column::ALL.iter().map(Column::header)));
    for (index, row) in rows.iter().enumerate() {
        let cells = row.iter().zip(Column::ALL).map(|(cell, column)| match column {
            Column::Photo => shorten(cell, PHOTO_CELL_WIDTH),
            _ => cell.clone(),
        });
        builder.push_record(std::iter::once((index + 1).to_string()).chain(cells));
    }
    builder.build().with(Style::rounded()).to_string()
}

fn shorten(cell: &str, width: usize) -> String {
    if cell.chars().count() <= width {
        return cell.to_string();
    }
    let mut short: String = cell.chars().take(width.saturating_sub(1)).collect();
    short.push('…');
    short
}

/// Expanded row: the resource exactly as the registry sent it.
pub fn print_detail(record: &DisplayRecord) -> Result<()> {
    let rt = record
        .raw
        .get("resourceType")
        .and_then(|v| v.as_str())
        .unwrap_or("Patient");
    let id = record.id.as_deref().unwrap_or("-");
    println!("{} {}/{}", "Resource:".cyan(), rt.cyan(), id.cyan());
    println!("{}", serde_json::to_string_pretty(&record.raw)?);
    Ok(())
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}
