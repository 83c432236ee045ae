// src/storage/mod.rs
use crate::extractors::category::Category;
use crate::extractors::metadata::ContractMetadata;
use crate::pipeline::BatchSummary;
use crate::utils::error::StorageError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

const REPORT_FILE_NAME: &str = "processing_report.json";

static ILLEGAL_FILENAME_CHARS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[\\/*?:"<>|]"#).expect("Failed to compile ILLEGAL_FILENAME_CHARS_RE")
});

static UNDERSCORES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"_+").expect("Failed to compile UNDERSCORES_RE")
});

/// Owns the output tree: one directory per [`Category`] under `base_dir`.
pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates the base directory and every category directory under it.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        for category in Category::ALL {
            let dir = base_path.join(category.label());
            if !dir.exists() {
                fs::create_dir_all(&dir).map_err(StorageError::IoError)?;
                tracing::debug!("Created category directory {}", dir.display());
            }
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.base_dir.join(category.label())
    }

    /// Number of files already filed by earlier runs.
    pub fn existing_file_count(&self) -> usize {
        Category::ALL
            .iter()
            .filter_map(|category| fs::read_dir(self.category_dir(*category)).ok())
            .flat_map(|entries| entries.flatten())
            .filter(|entry| entry.path().is_file())
            .count()
    }

    /// Copies `source` into the directory of `category` as `file_name`,
    /// suffixing the name if it is already taken. Returns the final path.
    pub fn place(&self, source: &Path, category: Category, file_name: &str) -> Result<PathBuf, StorageError> {
        let destination = unique_destination(&self.category_dir(category), file_name);
        fs::copy(source, &destination).map_err(StorageError::IoError)?;
        tracing::debug!("Copied {} -> {}", source.display(), destination.display());
        Ok(destination)
    }

    /// Copies `source` into the catch-all directory under its own name.
    pub fn place_untouched(&self, source: &Path) -> Result<PathBuf, StorageError> {
        let file_name = source
            .file_name()
            .ok_or_else(|| StorageError::MissingFileName(source.to_path_buf()))?
            .to_string_lossy()
            .into_owned();
        self.place(source, Category::Other, &file_name)
    }

    /// Writes the summary of a run as pretty JSON next to the category directories.
    pub fn save_run_report(&self, summary: &BatchSummary) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(REPORT_FILE_NAME);

        let report = serde_json::json!({
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "processed": summary.processed,
            "errors": summary.errors,
            "documents": summary.outcomes,
        });

        let report_str = serde_json::to_string_pretty(&report)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(&file_path, report_str).map_err(StorageError::IoError)?;

        tracing::info!("Saved run report to {}", file_path.display());
        Ok(file_path)
    }
}

/// Builds the destination file name from the recognized fields:
/// `type_counterparty_date_№number.ext`, skipping empty fields.
///
/// When nothing was recognized the original stem is kept so the copy is not
/// named just `.pdf`.
pub fn build_file_name(metadata: &ContractMetadata, extension: &str, fallback_stem: &str) -> String {
    let number = (!metadata.number().is_empty()).then(|| format!("№{}", metadata.number()));

    let parts: Vec<&str> = [
        metadata.contract_type(),
        metadata.counterparty(),
        metadata.date(),
        number.as_deref().unwrap_or(""),
    ]
    .into_iter()
    .filter(|part| !part.is_empty())
    .collect();

    let stem = if metadata.is_empty() {
        fallback_stem.to_string()
    } else {
        parts.join("_")
    };

    let stem = UNDERSCORES_RE.replace_all(&stem, "_");
    let stem = ILLEGAL_FILENAME_CHARS_RE.replace_all(&stem, "");

    if extension.is_empty() {
        stem.into_owned()
    } else {
        format!("{}.{}", stem, extension)
    }
}

/// First free path in `dir` for `file_name`: the name itself, then
/// `stem_1.ext`, `stem_2.ext`, ... The extension is split off at the last dot
/// only, so dots inside the stem survive.
pub fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, extension) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (file_name, None),
    };

    let mut counter: u32 = 1;
    loop {
        let name = match extension {
            Some(ext) => format!("{}_{}.{}", stem, counter, ext),
            None => format!("{}_{}", stem, counter),
        };
        let candidate = dir.join(&name);
        if !candidate.exists() {
            tracing::debug!("Name {} taken, using {}", file_name, name);
            return candidate;
        }
        counter += 1;
    }
}
