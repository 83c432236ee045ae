// src/documents/mod.rs
pub mod reader;

pub use reader::{list_documents, PdfTextSource, TextSource};
