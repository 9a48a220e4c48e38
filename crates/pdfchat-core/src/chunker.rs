//! Token-window chunking of normalized page text.
//!
//! Windows hold at most `budget` tokens and start `budget - overlap` tokens
//! apart. A chunk's text is the slice of the page spanning its first to last
//! token, so no detokenization is needed and the text stays byte-identical to
//! the source.

use std::path::Path;
use std::sync::Arc;

use anyhow::anyhow;
use tokenizers::Tokenizer;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingSettings;
use crate::error::{Error, Result};
use crate::types::{Chunk, DocumentRecord};

/// Byte ranges of the tokens of `text`, in order.
pub trait TokenSpans: Send + Sync {
    fn token_spans(&self, text: &str) -> anyhow::Result<Vec<(usize, usize)>>;
}

/// A HuggingFace `tokenizer.json`, with truncation and padding switched off so
/// long pages are measured in full.
pub struct HfTokenizer {
    inner: Tokenizer,
}

impl HfTokenizer {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let mut inner = Tokenizer::from_file(path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", path.display(), e))?;
        inner
            .with_truncation(None)
            .map_err(|e| anyhow!("Failed to disable truncation: {}", e))?;
        inner.with_padding(None);
        Ok(Self { inner })
    }
}

impl TokenSpans for HfTokenizer {
    fn token_spans(&self, text: &str) -> anyhow::Result<Vec<(usize, usize)>> {
        let enc = self.inner.encode(text, false).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        Ok(enc.get_offsets().iter().copied().filter(|(s, e)| e > s).collect())
    }
}

/// Unicode word-boundary tokens; every non-whitespace segment counts, so
/// punctuation is a token of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordTokenizer;

impl TokenSpans for WordTokenizer {
    fn token_spans(&self, text: &str) -> anyhow::Result<Vec<(usize, usize)>> {
        Ok(text
            .split_word_bound_indices()
            .filter(|(_, w)| !w.trim().is_empty())
            .map(|(i, w)| (i, i + w.len()))
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub budget: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { budget: 500, overlap: 50 }
    }
}

impl From<&ChunkingSettings> for ChunkingConfig {
    fn from(s: &ChunkingSettings) -> Self {
        Self { budget: s.budget, overlap: s.overlap }
    }
}

impl ChunkingConfig {
    fn stride(self) -> usize {
        self.budget - self.overlap
    }
}

#[derive(Clone)]
pub struct TokenChunker {
    config: ChunkingConfig,
    tokenizer: Arc<dyn TokenSpans>,
}

impl TokenChunker {
    pub fn new(config: ChunkingConfig, tokenizer: Arc<dyn TokenSpans>) -> Result<Self> {
        if config.budget == 0 || config.overlap >= config.budget {
            return Err(Error::InvalidConfig(format!(
                "chunk overlap ({}) must be smaller than the budget ({})",
                config.overlap, config.budget
            )));
        }
        Ok(Self { config, tokenizer })
    }

    pub fn split(&self, records: &[DocumentRecord]) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        for record in records {
            chunks.extend(self.split_record(record)?);
        }
        Ok(chunks)
    }

    pub fn split_record(&self, record: &DocumentRecord) -> Result<Vec<Chunk>> {
        let spans = self.tokenizer.token_spans(&record.text).map_err(Error::operation)?;
        let mut chunks = Vec::new();
        for (chunk_index, (start, end)) in windows(spans.len(), self.config).into_iter().enumerate() {
            let from = spans[start].0;
            let to = spans[end - 1].1;
            let Some(text) = record.text.get(from..to) else {
                return Err(Error::Operation(format!(
                    "token offsets {from}..{to} fall outside page {} of {}",
                    record.page, record.source
                )));
            };
            chunks.push(Chunk {
                id: format!("{}:{}:{}", record.source, record.page, chunk_index),
                source: record.source.clone(),
                page: record.page,
                chunk_index,
                text: text.to_string(),
                token_start: start,
                token_end: end,
            });
        }
        Ok(chunks)
    }
}

/// Token index windows `[start, end)` covering `n` tokens.
fn windows(n: usize, config: ChunkingConfig) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = 0;
    while start < n {
        let end = (start + config.budget).min(n);
        out.push((start, end));
        if end == n {
            break;
        }
        start += config.stride();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(budget: usize, overlap: usize) -> ChunkingConfig {
        ChunkingConfig { budget, overlap }
    }

    #[test]
    fn windows_advance_by_budget_minus_overlap() {
        assert_eq!(windows(1200, cfg(500, 50)), vec![(0, 500), (450, 950), (900, 1200)]);
    }

    #[test]
    fn exact_fit_yields_one_window() {
        assert_eq!(windows(500, cfg(500, 50)), vec![(0, 500)]);
        assert_eq!(windows(3, cfg(500, 50)), vec![(0, 3)]);
        assert!(windows(0, cfg(500, 50)).is_empty());
    }

    #[test]
    fn word_tokenizer_counts_punctuation() {
        let spans = WordTokenizer.token_spans("Olá, mundo!").expect("spans");
        assert_eq!(spans.len(), 4);
        assert_eq!(spans[0], (0, "Olá".len()));
    }
}
