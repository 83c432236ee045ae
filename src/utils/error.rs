// src/utils/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Failures while recovering text from a document. These never leave the
/// text source: they are logged and the document is treated as unreadable.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("PDF backend panicked: {0}")]
    Panicked(String),

    #[error("Extraction task failed: {0}")]
    Join(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Path has no file name: {0}")]
    MissingFileName(PathBuf),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Data processing failed: {0}")]
    Processing(String),
}
