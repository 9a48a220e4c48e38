//! pdfchat-core
//!
//! Document ingestion, chunking, context selection and prompt building for the
//! PDF chat service, plus the shared configuration, error and trait surface the
//! other crates plug into.

pub mod chunker;
pub mod config;
pub mod context;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod prompt;
pub mod traits;
pub mod types;
