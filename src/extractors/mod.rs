// src/extractors/mod.rs
pub mod category;
pub mod metadata;
