//! Output formatters for tables, stored files and operation outcomes

use anyhow::Result;
use colored::*;
use serde::Serialize;
use sheetchat_core::preview::render_markdown;
use sheetchat_core::session::{ChatMessage, Role};
use sheetchat_core::storage::{FileSummary, StoredFile};
use sheetchat_core::table::{WorkbookTables, count_tables, table_headers};
use sheetchat_core::{Outcome, UploadOutcome};
use std::path::Path;

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the extracted tables of a workbook, sheet by sheet
pub fn print_tables(source: &Path, tables: &WorkbookTables, preview_rows: usize) {
    println!("{}", format!("Extracted: {}", source.display()).bold());
    println!();

    if tables.is_empty() {
        println!("{}", "No tables found.".yellow());
        return;
    }

    for (sheet_name, sheet_tables) in tables.iter() {
        println!("{} {}", "Sheet:".bold(), sheet_name.cyan().bold());
        for (table_name, records) in sheet_tables.iter() {
            println!(
                "  {} {} {}",
                "Table:".bold(),
                table_name.yellow(),
                format!(
                    "({} rows, {} columns)",
                    records.len(),
                    table_headers(records).len()
                )
                .bright_black()
            );
            for line in render_markdown(records, preview_rows).lines() {
                println!("    {}", line);
            }
        }
        println!();
    }

    println!(
        "{} {} tables in {} sheets",
        "Summary:".bold().underline(),
        count_tables(tables),
        tables.len()
    );
}

pub fn print_upload(outcome: &UploadOutcome) {
    if !outcome.success {
        println!("{} {}", "✗".red().bold(), outcome.message);
        return;
    }
    println!("{} {}", "✓".green().bold(), outcome.message.green());
    if let Some(file_id) = outcome.file_id {
        println!("  {} {}", "File ID:".bold(), file_id);
    }
    for (sheet_name, sheet_tables) in outcome.tables.iter() {
        let names: Vec<&str> = sheet_tables.keys().map(String::as_str).collect();
        println!("  {} {}", sheet_name.cyan(), names.join(", "));
    }
}

pub fn print_outcome(outcome: &Outcome) {
    if outcome.success {
        println!("{} {}", "✓".green().bold(), outcome.message.green());
    } else {
        println!("{} {}", "✗".red().bold(), outcome.message);
    }
}

pub fn print_file_list(files: &[FileSummary]) {
    if files.is_empty() {
        println!("{}", "No files uploaded yet.".yellow());
        return;
    }
    println!(
        "{}",
        format!("{:>5}  {:<40} {:<20} {:>6}", "ID", "File", "Uploaded", "Tables").bold()
    );
    for file in files {
        println!(
            "{:>5}  {:<40} {:<20} {:>6}",
            file.id,
            file.file_name,
            file.uploaded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            file.table_count
        );
    }
}

pub fn print_stored_file(file: &StoredFile, sheet_filter: Option<&str>, preview_rows: usize) {
    println!("{} {}", "File:".bold(), file.file_name.cyan().bold());
    println!("  {} {}", "ID:".bold(), file.id);
    println!("  {} {}", "Path:".bold(), file.file_path.display());
    println!(
        "  {} {}",
        "Uploaded:".bold(),
        file.uploaded_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!();

    let mut shown = 0;
    for (sheet_name, sheet_tables) in file.tables.iter() {
        if sheet_filter.is_some_and(|s| s != sheet_name.as_str()) {
            continue;
        }
        shown += 1;
        println!("{} {}", "Sheet:".bold(), sheet_name.cyan().bold());
        if sheet_tables.is_empty() {
            println!("  No tables found in this sheet.");
        }
        for (table_name, records) in sheet_tables.iter() {
            println!("  {} {}", "Table:".bold(), table_name.yellow());
            for line in render_markdown(records, preview_rows).lines() {
                println!("    {}", line);
            }
        }
        println!();
    }
    if shown == 0 {
        if let Some(sheet) = sheet_filter {
            println!("{}", format!("Sheet '{}' not found.", sheet).yellow());
        }
    }
}

pub fn print_transcript(messages: &[ChatMessage]) {
    for message in messages {
        let speaker = match message.role {
            Role::User => "You:".green().bold(),
            Role::Assistant => "Assistant:".blue().bold(),
        };
        println!("{} {}", speaker, message.content);
    }
}
