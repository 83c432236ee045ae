// src/utils/debug_dump.rs
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::extractors::category::Classification;
use crate::extractors::metadata::ContractMetadata;
use crate::utils::error::AppError;

/// How many non-empty lines of the recovered text go into a dump. The
/// widest extraction window is 20 lines; the rest is kept for context.
const DUMP_LINE_LIMIT: usize = 60;

/// Writes `<dir>/<document file name>.txt` with the extracted record, the
/// classification and the top of the recovered text. Lines are numbered the
/// way the extractor counts them (trimmed, empty lines skipped), so a line
/// number can be compared directly with the 5/10/20 line search windows.
pub fn save_debug_dump(
    dir: &Path,
    document: &Path,
    text: &str,
    metadata: &ContractMetadata,
    classification: &Classification,
) -> Result<PathBuf, AppError> {
    fs::create_dir_all(dir)?;

    let name = document
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| AppError::Processing(format!("No file name in {}", document.display())))?;
    let path = dir.join(format!("{}.txt", name));

    let record = serde_json::to_string_pretty(&serde_json::json!({
        "metadata": metadata,
        "classification": classification,
    }))
    .map_err(|e| AppError::Processing(format!("Failed to serialize debug record: {}", e)))?;

    let mut dump = String::new();
    dump.push_str("=== extracted ===\n");
    dump.push_str(&record);
    dump.push_str("\n=== text ===\n");

    let lines = text.split('\n').map(str::trim).filter(|line| !line.is_empty());
    for (index, line) in lines.take(DUMP_LINE_LIMIT).enumerate() {
        // writing to a String cannot fail
        let _ = writeln!(dump, "{:>3} | {}", index + 1, line);
    }

    fs::write(&path, dump)?;
    tracing::debug!("Saved debug dump to {}", path.display());
    Ok(path)
}
