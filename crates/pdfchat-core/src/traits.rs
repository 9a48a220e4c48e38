use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::types::{Chunk, ScoredChunk};

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    /// Returns one L2-normalized vector of length `dim()` per input text.
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Turns a document file into the raw text of each of its pages.
pub trait PageExtractor: Send + Sync {
    fn extract_pages(&self, path: &Path) -> anyhow::Result<Vec<String>>;
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Replace the whole index with `chunks` and persist it. Returns the chunk count.
    async fn build(&mut self, chunks: &[Chunk], cancel: &CancellationToken) -> Result<usize>;

    /// The `k` nearest chunks to `question`, closest first.
    async fn query(&self, question: &str, k: usize) -> Result<Vec<ScoredChunk>>;

    fn is_ready(&self) -> bool;
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn try_generate(
        &self,
        model: &str,
        prompt: &str,
        temperature: f32,
        cancel: &CancellationToken,
    ) -> Result<String>;

    /// Same call with failures collapsed to `None`. Errors are logged, never raised.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        temperature: f32,
        cancel: &CancellationToken,
    ) -> Option<String> {
        match self.try_generate(model, prompt, temperature, cancel).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::error!(model, error = %e, "generation failed");
                None
            }
        }
    }
}
