// src/pipeline.rs
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::documents::{list_documents, TextSource};
use crate::extractors::category::{self, Category, Classification};
use crate::extractors::metadata::{self, ContractMetadata};
use crate::storage::{build_file_name, StorageManager};
use crate::utils::error::{AppError, SourceError, StorageError};
use crate::utils::debug_dump;

/// What happened to a single input document.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Renamed and filed by category.
    Filed {
        metadata: ContractMetadata,
        classification: Classification,
    },
    /// No text could be recovered; copied untouched into the catch-all.
    Unreadable,
    /// Something failed while filing; a copy into the catch-all was attempted.
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentOutcome {
    pub source: PathBuf,
    /// Where the copy ended up, if any copy succeeded.
    pub destination: Option<PathBuf>,
    pub category: Category,
    pub status: DocumentStatus,
}

impl DocumentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, DocumentStatus::Filed { .. })
    }
}

/// Tally of a whole run.
#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub errors: usize,
    pub outcomes: Vec<DocumentOutcome>,
}

impl BatchSummary {
    fn record(&mut self, outcome: DocumentOutcome) {
        if outcome.is_success() {
            self.processed += 1;
        } else {
            self.errors += 1;
        }
        self.outcomes.push(outcome);
    }
}

/// Runs every readable document of an input folder through extraction,
/// categorization and placement. Documents are handled one at a time in name
/// order; one document failing never stops the batch.
pub struct BatchProcessor {
    source: Arc<dyn TextSource>,
    storage: StorageManager,
    debug_dir: Option<PathBuf>,
}

impl BatchProcessor {
    pub fn new(source: Arc<dyn TextSource>, storage: StorageManager) -> Self {
        Self {
            source,
            storage,
            debug_dir: None,
        }
    }

    /// Also write a text dump per document into `dir`.
    pub fn with_debug_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_dir = Some(dir.into());
        self
    }

    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    pub async fn run(&self, input_dir: &Path) -> Result<BatchSummary, AppError> {
        let documents = list_documents(input_dir, self.source.as_ref())
            .await
            .map_err(|e| AppError::Processing(format!("Failed to list {}: {}", input_dir.display(), e)))?;

        tracing::info!("Found {} documents in {}", documents.len(), input_dir.display());

        let mut summary = BatchSummary::default();
        for path in documents {
            let outcome = self.process_document(&path).await;
            summary.record(outcome);
        }

        tracing::info!(
            "Processing finished. Success: {}, Errors: {}",
            summary.processed,
            summary.errors
        );
        Ok(summary)
    }

    async fn process_document(&self, path: &Path) -> DocumentOutcome {
        tracing::info!("Processing: {}", display_name(path));

        let text = self.recover_text(path).await;
        if text.trim().is_empty() {
            tracing::warn!("Could not extract text from {}", display_name(path));
            return self.file_as_other(path, DocumentStatus::Unreadable);
        }

        match self.file_document(path, &text) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Failed to process {}: {}", display_name(path), e);
                self.file_as_other(path, DocumentStatus::Failed { error: e.to_string() })
            }
        }
    }

    /// PDF decoding is CPU-bound and may panic, so it runs on the blocking pool.
    async fn recover_text(&self, path: &Path) -> String {
        let source = Arc::clone(&self.source);
        let owned = path.to_path_buf();

        match tokio::task::spawn_blocking(move || source.extract_text(&owned)).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("{}", SourceError::Join(e.to_string()));
                String::new()
            }
        }
    }

    fn file_document(&self, path: &Path, text: &str) -> Result<DocumentOutcome, StorageError> {
        let metadata = metadata::extract(text);
        tracing::info!("  Extracted data: {:?}", metadata);

        let classification = category::classify(text, metadata.contract_type());
        tracing::info!(
            "  Category: {} ({:?})",
            classification.category,
            classification.reason
        );

        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let fallback_stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .ok_or_else(|| StorageError::MissingFileName(path.to_path_buf()))?;
        let file_name = build_file_name(&metadata, &extension, &fallback_stem);

        let destination = self.storage.place(path, classification.category, &file_name)?;

        if let Some(debug_dir) = &self.debug_dir {
            if let Err(e) = debug_dump::save_debug_dump(debug_dir, path, text, &metadata, &classification) {
                tracing::warn!("Failed to write debug dump for {}: {}", display_name(path), e);
            }
        }

        tracing::info!(
            "  Filed: {} -> {} in {}",
            display_name(path),
            display_name(&destination),
            classification.category
        );

        Ok(DocumentOutcome {
            source: path.to_path_buf(),
            destination: Some(destination),
            category: classification.category,
            status: DocumentStatus::Filed {
                metadata,
                classification,
            },
        })
    }

    fn file_as_other(&self, path: &Path, status: DocumentStatus) -> DocumentOutcome {
        let destination = match self.storage.place_untouched(path) {
            Ok(destination) => Some(destination),
            Err(e) => {
                tracing::error!("Could not copy {} to {}: {}", display_name(path), Category::Other, e);
                None
            }
        };

        DocumentOutcome {
            source: path.to_path_buf(),
            destination,
            category: Category::Other,
            status,
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
