use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use sheetchat_core::assistant::answerer_from_config;
use sheetchat_core::export::{export_file_name, write_csv};
use sheetchat_core::session::ChatKey;
use sheetchat_core::{Extractor, Session, SheetChatConfig, Storage, upload_file};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

mod formatter;
mod logging;

#[derive(Parser)]
#[command(name = "sheetchat")]
#[command(about = "Extract tables from Excel workbooks, store them and ask questions about them", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON output for scripting
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Extract and print the tables of one or more workbooks without storing them
    Extract {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Rows shown per table in human output
        #[arg(long, value_name = "N")]
        rows: Option<usize>,
    },
    /// Upload a workbook: store a copy, extract its tables and persist them
    Upload {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// List stored files, newest first
    List,
    /// Show the tables of a stored file
    Show {
        #[arg(value_name = "ID")]
        id: i64,

        /// Only show this sheet
        #[arg(long)]
        sheet: Option<String>,

        /// Rows shown per table in human output
        #[arg(long, value_name = "N")]
        rows: Option<usize>,
    },
    /// Delete a stored file and renumber the remaining ones
    Delete {
        #[arg(value_name = "ID")]
        id: i64,
    },
    /// Duplicate a stored file under the next sequential name
    Duplicate {
        #[arg(value_name = "ID")]
        id: i64,
    },
    /// Rename every stored file to file1..fileN by upload order
    Renumber,
    /// Export one table of a stored file as CSV
    Export {
        #[arg(value_name = "ID")]
        id: i64,

        #[arg(long)]
        sheet: String,

        #[arg(long)]
        table: String,

        /// Output file (defaults to <file>_<sheet>_<table>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Ask a question about one table of a stored file
    Ask {
        #[arg(value_name = "ID")]
        id: i64,

        #[arg(long)]
        sheet: String,

        #[arg(long)]
        table: String,

        #[arg(value_name = "QUESTION", required = true, num_args = 1..)]
        question: Vec<String>,
    },
}

fn load_config(path: Option<&Path>) -> Result<SheetChatConfig> {
    let config = if let Some(config_path) = path {
        SheetChatConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        // Try to load default config from current directory if it exists
        let default_config_path = PathBuf::from("sheetchat.toml");
        if default_config_path.exists() {
            SheetChatConfig::from_file(&default_config_path).with_context(|| {
                format!(
                    "Failed to load config from {}",
                    default_config_path.display()
                )
            })?
        } else {
            SheetChatConfig::default()
        }
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn open_storage(config: &SheetChatConfig) -> Result<Storage> {
    Storage::open_path(&config.storage.database).with_context(|| {
        format!(
            "Failed to open database {}",
            config.storage.database.display()
        )
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let json = matches!(cli.format, OutputFormat::Json);

    let success = match cli.command {
        Command::Extract { files, rows } => run_extract(&config, &files, rows, json)?,
        Command::Upload { file } => {
            let storage = open_storage(&config)?;
            let content =
                std::fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let original_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());

            let outcome = upload_file(&storage, &config, &original_name, &content);
            if json {
                formatter::print_json(&outcome)?;
            } else {
                formatter::print_upload(&outcome);
            }
            outcome.success
        }
        Command::List => {
            let files = open_storage(&config)?.list_excel_files()?;
            if json {
                formatter::print_json(&files)?;
            } else {
                formatter::print_file_list(&files);
            }
            true
        }
        Command::Show { id, sheet, rows } => {
            let storage = open_storage(&config)?;
            let file = storage
                .get_excel_file(id)?
                .with_context(|| format!("File not found: {}", id))?;
            if json {
                formatter::print_json(&file)?;
            } else {
                let rows = rows.unwrap_or(config.assistant.preview_rows);
                formatter::print_stored_file(&file, sheet.as_deref(), rows);
            }
            true
        }
        Command::Delete { id } => {
            let storage = open_storage(&config)?;
            let mut session = Session::new();
            session.request_delete(id);
            let outcome = session
                .confirm_delete(&storage)
                .context("No delete was pending")?;
            report_outcome(&outcome, json)?
        }
        Command::Duplicate { id } => {
            let outcome = open_storage(&config)?.duplicate_excel_file(id);
            report_outcome(&outcome, json)?
        }
        Command::Renumber => {
            let renamed = open_storage(&config)?.renumber_files()?;
            if json {
                formatter::print_json(&serde_json::json!({ "renamed": renamed }))?;
            } else {
                println!("Renamed {} files", renamed);
            }
            true
        }
        Command::Export {
            id,
            sheet,
            table,
            output,
        } => {
            let storage = open_storage(&config)?;
            let file = storage
                .get_excel_file(id)?
                .with_context(|| format!("File not found: {}", id))?;
            let records = file
                .tables
                .get(&sheet)
                .and_then(|tables| tables.get(&table))
                .with_context(|| format!("Table '{}' not found in sheet '{}'", table, sheet))?;

            let output = output
                .unwrap_or_else(|| PathBuf::from(export_file_name(&file.file_name, &sheet, &table)));
            let writer = BufWriter::new(
                File::create(&output)
                    .with_context(|| format!("Failed to create {}", output.display()))?,
            );
            write_csv(records, writer, config.export.delimiter_byte()?)?;
            log::info!("Exported {} records to {}", records.len(), output.display());

            if json {
                formatter::print_json(&serde_json::json!({
                    "file": output.display().to_string(),
                    "records": records.len(),
                }))?;
            } else {
                println!("Output: {}", output.display());
            }
            true
        }
        Command::Ask {
            id,
            sheet,
            table,
            question,
        } => {
            let storage = open_storage(&config)?;
            let file = storage
                .get_excel_file(id)?
                .with_context(|| format!("File not found: {}", id))?;
            let records = file
                .tables
                .get(&sheet)
                .and_then(|tables| tables.get(&table))
                .with_context(|| format!("Table '{}' not found in sheet '{}'", table, sheet))?;
            let answerer = answerer_from_config(&config.assistant)?;

            let mut session = Session::new();
            session.select_file(id);
            session.select_sheet(sheet.clone());
            let key = ChatKey::browse(id, sheet, table);
            session.ask(
                &key,
                &question.join(" "),
                answerer.as_ref(),
                records,
                config.assistant.preview_rows,
            );

            let transcript = session.transcript(&key);
            if json {
                formatter::print_json(transcript)?;
            } else {
                formatter::print_transcript(transcript);
            }
            true
        }
    };

    std::process::exit(if success { 0 } else { 1 });
}

fn report_outcome(outcome: &sheetchat_core::Outcome, json: bool) -> Result<bool> {
    if json {
        formatter::print_json(outcome)?;
    } else {
        formatter::print_outcome(outcome);
    }
    Ok(outcome.success)
}

/// Extract every file in parallel and print the results in argument order
fn run_extract(
    config: &SheetChatConfig,
    files: &[PathBuf],
    rows: Option<usize>,
    json: bool,
) -> Result<bool> {
    let extractor = Extractor::with_config(config.clone());
    let results: Vec<_> = files
        .par_iter()
        .map(|path| (path, extractor.extract_file(path)))
        .collect();

    let rows = rows.unwrap_or(config.assistant.preview_rows);
    let mut all_ok = true;
    let mut json_output = serde_json::Map::new();
    for (path, result) in results {
        match result {
            Ok(tables) => {
                if json {
                    json_output.insert(path.display().to_string(), serde_json::to_value(&tables)?);
                } else {
                    formatter::print_tables(path, &tables, rows);
                    println!();
                }
            }
            Err(e) => {
                all_ok = false;
                log::error!("{}", e);
                if json {
                    json_output.insert(
                        path.display().to_string(),
                        serde_json::json!({ "error": e.to_string() }),
                    );
                }
            }
        }
    }

    if json {
        formatter::print_json(&json_output)?;
    }
    Ok(all_ok)
}
