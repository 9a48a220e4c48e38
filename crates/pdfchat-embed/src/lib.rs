//! pdfchat-embed
//!
//! Text embedding backends implementing [`pdfchat_core::traits::Embedder`]:
//! a local BERT model run through candle, and a hash-based fake used in tests
//! and when `APP_USE_FAKE_EMBEDDINGS=1`.

mod bert;
mod pool;

use std::hash::{Hash, Hasher};

use anyhow::Result;
use tracing::info;
use twox_hash::XxHash64;

use pdfchat_core::config::{expand_path, EmbeddingSettings};
pub use pdfchat_core::traits::Embedder;

pub use bert::BertEmbedder;
pub use pool::masked_mean_l2;

/// Deterministic bag-of-words vectors: every whitespace token is hashed into
/// one bucket. Identical texts map to identical unit vectors and texts sharing
/// words land close together, which is all the index tests need.
pub struct FakeEmbedder {
    dim: usize,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in text.split_whitespace() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = usize::try_from(h % self.dim as u64).unwrap_or(0);
            v[idx] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        } else {
            v[0] = 1.0;
        }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    if settings.fake_requested() {
        info!(dim = settings.fake_dim, "using fake embedder");
        return Ok(Box::new(FakeEmbedder::new(settings.fake_dim)));
    }
    let model_dir = expand_path(&settings.model_dir);
    Ok(Box::new(BertEmbedder::load(&model_dir, settings.max_len)?))
}
