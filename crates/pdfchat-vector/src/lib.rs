//! pdfchat-vector
//!
//! LanceDB-backed implementation of [`pdfchat_core::traits::VectorStore`].
//! Distances are LanceDB's default L2 metric, which reports the squared
//! Euclidean distance; on unit vectors that is `2 - 2·cos`.

pub mod manifest;
pub mod schema;
pub mod store;

pub use manifest::Manifest;
pub use store::LanceVectorStore;
