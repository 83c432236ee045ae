// src/main.rs
mod documents;
mod extractors;
mod pipeline;
mod storage;
mod utils;

use clap::Parser;
use documents::PdfTextSource;
use pipeline::BatchProcessor;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use storage::StorageManager;
use utils::AppError;

/// Sorts a folder of contract PDFs into category folders under descriptive names
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Folder with the contracts to process (prompted for when omitted)
    #[arg(short, long)]
    input_dir: Option<PathBuf>,

    /// Output folder; one sub-folder per category is created inside it
    #[arg(short, long, default_value = "processed_contracts")]
    output_dir: PathBuf,

    /// Do not write processing_report.json into the output folder
    #[arg(long)]
    no_report: bool,

    /// Debug mode - save recovered text and extracted fields per document
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting processing for args: {:?}", args);

    // 3. Resolve and validate the input folder before touching anything else
    let input_dir = match args.input_dir.clone() {
        Some(dir) => dir,
        None => prompt_input_dir()?,
    };
    if !input_dir.is_dir() {
        return Err(AppError::Config(format!(
            "Input folder {} does not exist",
            input_dir.display()
        )));
    }

    // 4. Initialize storage (creates the category tree)
    let storage = StorageManager::new(&args.output_dir)?;
    tracing::info!("Filing into {}", storage.base_dir().display());
    let existing = storage.existing_file_count();
    if existing > 0 {
        tracing::warn!(
            "Output folder already holds {} filed documents; re-processed files will be added as suffixed copies",
            existing
        );
    }

    // 5. Process the batch
    let mut processor = BatchProcessor::new(Arc::new(PdfTextSource::new()), storage);
    if args.debug {
        let debug_dir = args.output_dir.join("debug");
        tracing::info!("Debug dumps go to {}", debug_dir.display());
        processor = processor.with_debug_dir(debug_dir);
    }

    let summary = processor.run(&input_dir).await?;

    // 6. Persist the run report
    if !args.no_report {
        if let Err(e) = processor.storage().save_run_report(&summary) {
            tracing::error!("Failed to save run report: {}", e);
        }
    }

    println!(
        "\nProcessing finished. Success: {}, with errors: {}",
        summary.processed, summary.errors
    );

    Ok(())
}

/// Asks for the input folder on stdin.
fn prompt_input_dir() -> Result<PathBuf, AppError> {
    print!("Enter the path to the folder with PDF files: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;

    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(AppError::Config("No input folder given".to_string()));
    }
    Ok(PathBuf::from(trimmed))
}
